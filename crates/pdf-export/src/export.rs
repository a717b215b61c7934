//! Output planning and export entry points
//!
//! The configuration decides which spreads are exported and in what order,
//! then how the resulting pages are split between files: all in one file,
//! in batches of spreads, or one file per spread and paper. Planning
//! happens before anything is written, so configuration errors never
//! leave partial files behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use scene::{Document, PaperGroup, SceneIndex, SceneNode};
use tracing::info;

use crate::assembler::{Assembler, SceneSources};
use crate::config::{ExportConfig, ExportTarget};
use crate::log::{ErrorLog, ExportReport};
use crate::{ExportError, Result};

/// What to export: a document, loose objects, or both
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportJob<'a> {
    pub document: Option<&'a Document>,
    /// Objects outside any page, drawn on every page
    pub limbo: Option<&'a SceneNode>,
    /// Papers to print on instead of the document's own paper group
    pub papers: Option<&'a PaperGroup>,
}

impl<'a> ExportJob<'a> {
    pub fn document(document: &'a Document) -> Self {
        Self {
            document: Some(document),
            ..Self::default()
        }
    }

    /// Loose objects only, printed on one page
    pub fn limbo(limbo: &'a SceneNode) -> Self {
        Self {
            limbo: Some(limbo),
            ..Self::default()
        }
    }

    pub fn with_limbo(mut self, limbo: &'a SceneNode) -> Self {
        self.limbo = Some(limbo);
        self
    }

    pub fn with_papers(mut self, papers: &'a PaperGroup) -> Self {
        self.papers = Some(papers);
        self
    }

    fn paper_group<'b>(&self, fallback: &'b PaperGroup) -> &'b PaperGroup
    where
        'a: 'b,
    {
        self.papers
            .or(self.document.map(|doc| &doc.paper_group))
            .unwrap_or(fallback)
    }
}

/// One spread printed on one paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sheet {
    /// `None` when there is no document and only loose objects are drawn
    pub spread: Option<usize>,
    pub paper: usize,
}

/// A planned output file and the pages it will hold
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

/// Runs exports with one configuration
#[derive(Debug, Clone)]
pub struct Exporter {
    config: ExportConfig,
    single_page_only: bool,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            single_page_only: false,
        }
    }

    /// Refuse files with more than one page
    pub fn single_page_only(mut self) -> Self {
        self.single_page_only = true;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Every sheet the job produces, in output order
    pub fn sheets(&self, job: &ExportJob<'_>) -> Result<Vec<Sheet>> {
        if job.document.is_none() && job.limbo.is_none() {
            return Err(ExportError::NothingToExport);
        }
        let fallback = PaperGroup::default();
        let papers = job.paper_group(&fallback).papers.len();
        if papers == 0 {
            return Err(ExportError::InvalidConfig(
                "paper group has no papers".to_string(),
            ));
        }
        let spreads = self.spreads(job)?;
        Ok(spreads
            .iter()
            .flat_map(|&spread| (0..papers).map(move |paper| Sheet { spread, paper }))
            .collect())
    }

    /// Spread indices in output order. A document without pages still
    /// prints its loose objects on one virtual spread.
    fn spreads(&self, job: &ExportJob<'_>) -> Result<Vec<Option<usize>>> {
        let total = job.document.map_or(0, Document::num_spreads);
        if total == 0 {
            return Ok(vec![None]);
        }
        let order = self.config.spread_order(total);
        if order.is_empty() {
            return Err(ExportError::InvalidConfig(
                "no spreads selected for export".to_string(),
            ));
        }
        Ok(order.into_iter().map(Some).collect())
    }

    /// Split the job's sheets between output files
    pub fn plan(&self, job: &ExportJob<'_>) -> Result<Vec<OutputFile>> {
        self.config.validate()?;
        let sheets = self.sheets(job)?;
        let fallback = PaperGroup::default();
        let papers = job.paper_group(&fallback).papers.len();
        let spreads = sheets.len() / papers;

        let batches = self.config.batches;
        let files = if batches > 0 && batches < spreads {
            let base = self.single_destination()?;
            sheets
                .chunks(batches * papers)
                .map(|chunk| {
                    let first = chunk.first().and_then(|s| s.spread).unwrap_or(0);
                    let last = chunk.last().and_then(|s| s.spread).unwrap_or(0);
                    OutputFile {
                        path: batch_path(&base, first, last),
                        sheets: chunk.to_vec(),
                    }
                })
                .collect()
        } else if self.config.target == ExportTarget::Multi {
            let template = self
                .config
                .tofiles
                .as_ref()
                .map(PathBuf::from)
                .or_else(|| self.config.filename.clone())
                .ok_or(ExportError::MissingDestination)?;
            sheets
                .iter()
                .map(|sheet| OutputFile {
                    path: numbered_path(
                        &template,
                        sheet.spread.unwrap_or(0),
                        (papers > 1).then_some(sheet.paper),
                    ),
                    sheets: vec![*sheet],
                })
                .collect()
        } else {
            vec![OutputFile {
                path: self.single_destination()?,
                sheets,
            }]
        };

        if self.single_page_only {
            if let Some(file) = files.iter().find(|f| f.sheets.len() > 1) {
                return Err(ExportError::MultiPageUnsupported {
                    pages: file.sheets.len(),
                });
            }
        }
        Ok(files)
    }

    fn single_destination(&self) -> Result<PathBuf> {
        match (&self.config.filename, &self.config.tofiles) {
            (Some(filename), _) => Ok(filename.clone()),
            (None, Some(template)) => Ok(PathBuf::from(template.replace('#', ""))),
            (None, None) => Err(ExportError::MissingDestination),
        }
    }

    /// Plan the job and write every file. A fatal error is returned as
    /// `Err`; use [`Exporter::export`] to keep the warnings and the files
    /// written before it.
    pub fn run(&self, job: &ExportJob<'_>) -> Result<ExportReport> {
        let mut report = self.export(job);
        match report.error.take() {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Plan the job and write every file, folding a fatal error into the
    /// report
    pub fn export(&self, job: &ExportJob<'_>) -> ExportReport {
        let mut log = ErrorLog::new();
        let files = match self.plan(job) {
            Ok(files) => files,
            Err(e) => return ExportReport::failed(log, Vec::new(), e),
        };
        let mut written = Vec::with_capacity(files.len());
        for file in &files {
            info!(file = %file.path.display(), pages = file.sheets.len(), "exporting");
            let result = File::create(&file.path)
                .map_err(ExportError::from)
                .and_then(|f| self.write_sheets(job, &file.sheets, BufWriter::new(f), &mut log));
            if let Err(e) = result {
                let error = if files.len() > 1 {
                    ExportError::FileFailed {
                        file: file.path.clone(),
                        total: written.len(),
                        source: Box::new(e),
                    }
                } else {
                    e
                };
                return ExportReport::failed(log, written, error);
            }
            info!(file = %file.path.display(), "finished");
            written.push(file.path.clone());
        }
        ExportReport::completed(log, written)
    }

    /// Write `sheets` of `job` as one PDF file to `out`
    pub fn write_sheets<W: Write>(
        &self,
        job: &ExportJob<'_>,
        sheets: &[Sheet],
        out: W,
        log: &mut ErrorLog,
    ) -> Result<W> {
        let fallback = PaperGroup::default();
        let papers = job.paper_group(&fallback);
        let mut index = SceneIndex::new();
        if let Some(document) = job.document {
            document.index_into(&mut index);
        }
        if let Some(limbo) = job.limbo {
            index.add(limbo);
        }
        index.add_all(&papers.objects);

        let sources = SceneSources {
            document: job.document,
            limbo: job.limbo,
            papers,
        };
        let mut assembler = Assembler::new(out, &self.config, sources, &index, log)?;
        for sheet in sheets {
            let spread = match (job.document, sheet.spread) {
                (Some(document), Some(i)) => document.layout(i),
                _ => None,
            };
            let rotation = self.config.rotation_for(sheet.spread.unwrap_or(0));
            assembler.add_page(spread.as_ref(), sheet.paper, rotation)?;
        }
        let pages = assembler.page_count();
        let title = match job.document {
            Some(document) if !document.name.is_empty() => document.name.as_str(),
            _ => papers.name.as_str(),
        };
        let out = assembler.finish(title)?;
        info!(pages, "file complete");
        Ok(out)
    }
}

/// `<stem><first>-<last><ext>` next to `base`
fn batch_path(base: &Path, first: usize, last: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}{}-{}.{}", stem, first, last, ext.to_string_lossy()),
        None => format!("{}{}-{}", stem, first, last),
    };
    base.with_file_name(name)
}

/// Fill the first run of `#` in `template` with `index`, zero padded to the
/// run's length, followed by `-<paper>` when given. Without any `#` the
/// number goes just before the extension.
pub(crate) fn numbered_path(template: &Path, index: usize, paper: Option<usize>) -> PathBuf {
    let file_name = template
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let suffix = paper.map(|p| format!("-{}", p)).unwrap_or_default();

    let name = match file_name.find('#') {
        Some(start) => {
            let run = file_name[start..].chars().take_while(|&c| c == '#').count();
            format!(
                "{}{:0width$}{}{}",
                &file_name[..start],
                index,
                suffix,
                &file_name[start + run..],
                width = run
            )
        }
        None => match file_name.rfind('.') {
            Some(dot) if dot > 0 => format!(
                "{}{}{}{}",
                &file_name[..dot],
                index,
                suffix,
                &file_name[dot..]
            ),
            _ => format!("{}{}{}", file_name, index, suffix),
        },
    };
    template.with_file_name(name)
}

/// Run `job` with `config`, folding any fatal error into the report
pub fn export_document(config: ExportConfig, job: &ExportJob<'_>) -> ExportReport {
    Exporter::new(config).export(job)
}

/// Write every sheet of `job` as one PDF to `out`, whatever the target
pub fn export_to_writer<W: Write>(
    config: &ExportConfig,
    job: &ExportJob<'_>,
    out: W,
) -> Result<(W, ErrorLog)> {
    config.validate()?;
    let exporter = Exporter::new(config.clone());
    let sheets = exporter.sheets(job)?;
    let mut log = ErrorLog::new();
    let out = exporter.write_sheets(job, &sheets, out, &mut log)?;
    Ok((out, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvenOdd, IndexRange};
    use crate::log::ExportStatus;
    use pretty_assertions::assert_eq;
    use scene::{Page, PaperBox, PaperStyle, SceneKind};

    fn document(pages: usize) -> Document {
        let mut doc = Document::new("booklet", 4.0, 6.0);
        doc.pages = vec![Page::default(); pages];
        doc
    }

    fn spread_list(files: &[OutputFile]) -> Vec<Vec<Option<usize>>> {
        files
            .iter()
            .map(|f| f.sheets.iter().map(|s| s.spread).collect())
            .collect()
    }

    #[test]
    fn test_numbered_path() {
        let t = Path::new("/out/page###.pdf");
        assert_eq!(numbered_path(t, 7, None), PathBuf::from("/out/page007.pdf"));
        assert_eq!(numbered_path(t, 12, Some(1)), PathBuf::from("/out/page012-1.pdf"));
        assert_eq!(numbered_path(t, 1234, None), PathBuf::from("/out/page1234.pdf"));
        let plain = Path::new("book.pdf");
        assert_eq!(numbered_path(plain, 3, None), PathBuf::from("book3.pdf"));
        assert_eq!(numbered_path(Path::new("book"), 3, Some(0)), PathBuf::from("book3-0"));
    }

    #[test]
    fn test_batch_path() {
        assert_eq!(
            batch_path(Path::new("/tmp/book.pdf"), 4, 7),
            PathBuf::from("/tmp/book4-7.pdf")
        );
    }

    #[test]
    fn test_single_file_plan() {
        let doc = document(3);
        let plan = Exporter::new(ExportConfig::to_file("a.pdf"))
            .plan(&ExportJob::document(&doc))
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].path, PathBuf::from("a.pdf"));
        assert_eq!(spread_list(&plan), vec![vec![Some(0), Some(1), Some(2)]]);
    }

    #[test]
    fn test_batches_take_priority() {
        let doc = document(10);
        let mut config = ExportConfig::to_file("book.pdf");
        config.target = ExportTarget::Multi;
        config.batches = 4;
        let plan = Exporter::new(config).plan(&ExportJob::document(&doc)).unwrap();
        let names: Vec<_> = plan.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("book0-3.pdf"),
                PathBuf::from("book4-7.pdf"),
                PathBuf::from("book8-9.pdf")
            ]
        );
        assert_eq!(plan[2].sheets.len(), 2);
    }

    #[test]
    fn test_many_files_per_paper() {
        let mut doc = document(2);
        doc.paper_group.papers.push(PaperBox::new(PaperStyle::letter()));
        let config = ExportConfig {
            target: ExportTarget::Multi,
            tofiles: Some("sheet##.pdf".into()),
            ..ExportConfig::default()
        };
        let plan = Exporter::new(config).plan(&ExportJob::document(&doc)).unwrap();
        let names: Vec<_> = plan.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("sheet00-0.pdf"),
                PathBuf::from("sheet00-1.pdf"),
                PathBuf::from("sheet01-0.pdf"),
                PathBuf::from("sheet01-1.pdf")
            ]
        );
    }

    #[test]
    fn test_many_files_keeps_index_for_one_spread() {
        let doc = document(5);
        let config = ExportConfig {
            target: ExportTarget::Multi,
            tofiles: Some("page##.pdf".into()),
            range: Some(IndexRange::span(2, 2)),
            ..ExportConfig::default()
        };
        let plan = Exporter::new(config).plan(&ExportJob::document(&doc)).unwrap();
        assert_eq!(
            plan,
            vec![OutputFile {
                path: PathBuf::from("page02.pdf"),
                sheets: vec![Sheet {
                    spread: Some(2),
                    paper: 0
                }],
            }]
        );
    }

    #[test]
    fn test_reverse_even_order() {
        let doc = document(10);
        let config = ExportConfig {
            filename: Some("x.pdf".into()),
            evenodd: EvenOdd::Even,
            reverse_order: true,
            ..ExportConfig::default()
        };
        let plan = Exporter::new(config).plan(&ExportJob::document(&doc)).unwrap();
        assert_eq!(
            spread_list(&plan),
            vec![vec![Some(8), Some(6), Some(4), Some(2), Some(0)]]
        );
    }

    #[test]
    fn test_plan_errors() {
        let doc = document(2);
        let exporter = Exporter::new(ExportConfig::to_file("x.pdf"));
        assert!(matches!(
            exporter.plan(&ExportJob::default()),
            Err(ExportError::NothingToExport)
        ));
        assert!(matches!(
            Exporter::new(ExportConfig::default()).plan(&ExportJob::document(&doc)),
            Err(ExportError::MissingDestination)
        ));
        assert!(matches!(
            exporter.clone().single_page_only().plan(&ExportJob::document(&doc)),
            Err(ExportError::MultiPageUnsupported { pages: 2 })
        ));
        let config = ExportConfig {
            filename: Some("x.pdf".into()),
            range: Some(IndexRange::span(5, 9)),
            ..ExportConfig::default()
        };
        assert!(matches!(
            Exporter::new(config).plan(&ExportJob::document(&doc)),
            Err(ExportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_limbo_only_job_is_one_sheet() {
        let limbo = SceneNode::new(1, SceneKind::Paths(Default::default()));
        let exporter = Exporter::new(ExportConfig::to_file("x.pdf")).single_page_only();
        let plan = exporter.plan(&ExportJob::limbo(&limbo)).unwrap();
        assert_eq!(plan[0].sheets, vec![Sheet { spread: None, paper: 0 }]);
    }

    #[test]
    fn test_export_to_writer() {
        let doc = document(2);
        let (bytes, log) =
            export_to_writer(&ExportConfig::default(), &ExportJob::document(&doc), Vec::new())
                .unwrap();
        let out = String::from_utf8_lossy(&bytes);
        assert!(out.contains("/Count 2"));
        assert!(out.contains("/Title (booklet)"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_export_document_reports_failure() {
        let report = export_document(ExportConfig::default(), &ExportJob::default());
        assert_eq!(report.status, ExportStatus::Failure);
        assert!(matches!(report.error, Some(ExportError::NothingToExport)));
    }
}
