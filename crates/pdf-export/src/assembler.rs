//! Page assembly and file finalization
//!
//! An `Assembler` owns one output file. Each `add_page` call draws one
//! spread on one paper into a fresh content stream and writes it out
//! straight away; only the small `PageRecord` stays behind. `finish`
//! then writes the page dictionaries, the page tree, catalog, info and
//! the cross-reference table.

use std::io::Write;

use scene::{
    Affine, Document, PaperBox, PaperGroup, SceneIndex, SceneNode, Spread, POINTS_PER_UNIT,
};
use tracing::debug;

use crate::config::{ExportConfig, PdfVersion};
use crate::encode::{append_path, color_operator, EncodeOptions, Encoder, FontRegistry};
use crate::ledger::{ObjectLedger, ObjectNumber};
use crate::log::ErrorLog;
use crate::resources::ResourceDictionary;
use crate::writer::{fmt, pdf_date, pdf_string, PdfWriter};
use crate::Result;

const PRODUCER: &str = "spreadpdf";

/// Everything drawn on a page, besides the page contents themselves
#[derive(Debug, Clone, Copy)]
pub(crate) struct SceneSources<'a> {
    pub document: Option<&'a Document>,
    /// Loose objects drawn on every page
    pub limbo: Option<&'a SceneNode>,
    pub papers: &'a PaperGroup,
}

/// A finished page waiting for its dictionary
#[derive(Debug)]
pub(crate) struct PageRecord {
    pub contents: ObjectNumber,
    /// Media box width and height in points
    pub size: (f64, f64),
    pub rotation: u16,
    pub resources: ResourceDictionary,
}

pub(crate) struct Assembler<'a, W: Write> {
    writer: PdfWriter<W>,
    ledger: ObjectLedger,
    fonts: FontRegistry,
    log: &'a mut ErrorLog,
    index: &'a SceneIndex<'a>,
    sources: SceneSources<'a>,
    options: EncodeOptions,
    version: PdfVersion,
    pages: Vec<PageRecord>,
}

impl<'a, W: Write> Assembler<'a, W> {
    /// Start a file on `out`, writing the header
    pub fn new(
        out: W,
        config: &ExportConfig,
        sources: SceneSources<'a>,
        index: &'a SceneIndex<'a>,
        log: &'a mut ErrorLog,
    ) -> Result<Self> {
        let mut writer = PdfWriter::new(out, config.compress);
        writer.write_header(config.version)?;
        Ok(Self {
            writer,
            ledger: ObjectLedger::new(),
            fonts: FontRegistry::new(),
            log,
            index,
            sources,
            options: EncodeOptions {
                text_as_paths: config.text_as_paths,
                dpi: 300.0,
            },
            version: config.version,
            pages: Vec::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Draw `spread` (none when there is no document) on paper
    /// `paper_index` of the paper group as the next page
    pub fn add_page(
        &mut self,
        spread: Option<&Spread>,
        paper_index: usize,
        rotation: u16,
    ) -> Result<()> {
        let sources = self.sources;
        let Some(paper) = sources.papers.papers.get(paper_index) else {
            return Ok(());
        };
        let options = EncodeOptions {
            dpi: paper.paper.dpi,
            ..self.options
        };
        let inverse = match paper.transform.invert() {
            Some(inverse) => inverse,
            None => {
                self.log.warning(
                    0,
                    format!("Paper {} has a singular transform, placed untransformed.", paper_index),
                );
                Affine::identity()
            }
        };

        let mut enc = Encoder::new(
            &mut self.writer,
            &mut self.ledger,
            &mut self.fonts,
            &mut *self.log,
            self.index,
            options,
        );
        let to_points = paper
            .paper
            .media_transform()
            .concat(&Affine::scale(POINTS_PER_UNIT, POINTS_PER_UNIT));
        enc.with_object(&to_points, |enc| {
            paper_background(enc, paper);
            enc.with_object(&inverse, |enc| draw_spread(enc, &sources, spread))
        })?;
        let (stream, resources) = enc.finish();

        let contents = self.ledger.allocate();
        self.writer
            .write_stream(&mut self.ledger, contents, "", &stream.into_bytes(), false)?;
        let (width, height) = paper.paper.media_size();
        let rotation = if paper.paper.landscape {
            (rotation + 90) % 360
        } else {
            rotation
        };
        self.pages.push(PageRecord {
            contents,
            size: (width * POINTS_PER_UNIT, height * POINTS_PER_UNIT),
            rotation,
            resources,
        });
        Ok(())
    }

    /// Write the page tree, catalog, info and xref. Returns the output.
    pub fn finish(mut self, title: &str) -> Result<W> {
        // The page tree number must be known before any page dictionary
        let tree = self.ledger.allocate();
        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let number = self.ledger.allocate();
            self.writer.write_dict(
                &mut self.ledger,
                number,
                &format!(
                    "/Type /Page /Parent {} /Resources {} /Contents {} \
                     /MediaBox [0 0 {} {}] /Rotate {}",
                    tree,
                    page.resources.to_pdf(),
                    page.contents,
                    fmt(page.size.0),
                    fmt(page.size.1),
                    page.rotation
                ),
            )?;
            kids.push(number.to_string());
        }
        self.writer.write_dict(
            &mut self.ledger,
            tree,
            &format!(
                "/Type /Pages /Kids [{}] /Count {}",
                kids.join(" "),
                kids.len()
            ),
        )?;

        let catalog = self.ledger.allocate();
        self.writer.write_dict(
            &mut self.ledger,
            catalog,
            &format!(
                "/Type /Catalog /Pages {} /Version /{}",
                tree,
                self.version.as_str()
            ),
        )?;

        let info = self.ledger.allocate();
        self.writer.write_dict(
            &mut self.ledger,
            info,
            &format!(
                "/Title {} /ModDate {} /Producer {}",
                pdf_string(title.as_bytes()),
                pdf_string(pdf_date().as_bytes()),
                pdf_string(PRODUCER.as_bytes())
            ),
        )?;

        debug!(
            objects = self.ledger.size(),
            fonts = self.fonts.len(),
            "writing cross-reference table"
        );
        self.writer
            .write_xref_and_trailer(&self.ledger, catalog, info)?;
        self.writer.finish()
    }
}

/// Paper rectangle filled with the paper color, unless it is white
fn paper_background<W: Write>(enc: &mut Encoder<'_, W>, paper: &PaperBox) {
    if paper.color.is_white() {
        return;
    }
    let mut ops = color_operator(&paper.color, "rg");
    ops.push_str(&format!(
        "0 0 {} {} re\nf\n",
        fmt(paper.paper.width),
        fmt(paper.paper.height)
    ));
    enc.stream.append(&ops);
}

/// Limbo, paper group objects, printer marks, then each page of the spread
fn draw_spread<W: Write>(
    enc: &mut Encoder<'_, W>,
    sources: &SceneSources<'_>,
    spread: Option<&Spread>,
) -> Result<()> {
    if let Some(limbo) = sources.limbo {
        enc.encode(limbo)?;
    }
    for object in &sources.papers.objects {
        enc.encode(object)?;
    }
    let (Some(spread), Some(document)) = (spread, sources.document) else {
        return Ok(());
    };
    if let Some(marks) = &spread.marks {
        enc.encode(marks)?;
    }
    for location in &spread.pages {
        let Some(page) = document.page(location.index) else {
            continue;
        };
        enc.with_object(&location.transform, |enc| {
            if page.clips {
                let mut clip = String::new();
                append_path(&mut clip, &location.outline);
                clip.push_str("W n\n");
                enc.stream.append(&clip);
            }
            for layer in &page.layers {
                enc.encode(layer)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}
