//! Export configuration
//!
//! Settings arrive already validated by whatever front end built them.
//! They can also be read from JSON:
//!
//! ```json
//! { "filename": "out.pdf", "range": "0-3,8", "evenodd": "even", "batches": 2 }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ExportError, Result};

/// Which spread indices to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvenOdd {
    #[default]
    All,
    /// Indices 0, 2, 4, ...
    Even,
    /// Indices 1, 3, 5, ...
    Odd,
}

impl EvenOdd {
    /// Read a loose setting string. Anything unrecognized means all spreads.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "odd" => EvenOdd::Odd,
            "even" => EvenOdd::Even,
            _ => EvenOdd::All,
        }
    }

    pub fn keeps(&self, index: usize) -> bool {
        match self {
            EvenOdd::All => true,
            EvenOdd::Even => index % 2 == 0,
            EvenOdd::Odd => index % 2 == 1,
        }
    }
}

/// Whether output goes to one file or one file per spread and paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    #[default]
    Single,
    Multi,
}

/// Header version written to each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfVersion {
    #[serde(rename = "1.3")]
    V1_3,
    #[default]
    #[serde(rename = "1.4")]
    V1_4,
}

impl PdfVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 => "1.4",
        }
    }
}

/// Set of spread indices written as `"0-3,5,8-9"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexRange {
    spans: Vec<(usize, usize)>,
}

impl IndexRange {
    /// Inclusive span `start..=end`
    pub fn span(start: usize, end: usize) -> Self {
        Self {
            spans: vec![(start.min(end), start.max(end))],
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.spans.iter().any(|&(a, b)| a <= index && index <= b)
    }

    /// Indices below `limit`, ascending, without repeats
    pub fn indices(&self, limit: usize) -> Vec<usize> {
        (0..limit).filter(|&i| self.contains(i)).collect()
    }
}

impl FromStr for IndexRange {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || ExportError::InvalidConfig(format!("bad range \"{}\"", s));
        let mut spans = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let span = match part.split_once('-') {
                Some((a, b)) => {
                    let a: usize = a.trim().parse().map_err(|_| bad())?;
                    let b: usize = b.trim().parse().map_err(|_| bad())?;
                    (a.min(b), a.max(b))
                }
                None => {
                    let a: usize = part.parse().map_err(|_| bad())?;
                    (a, a)
                }
            };
            spans.push(span);
        }
        if spans.is_empty() {
            return Err(bad());
        }
        Ok(Self { spans })
    }
}

impl TryFrom<String> for IndexRange {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IndexRange> for String {
    fn from(range: IndexRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .spans
            .iter()
            .map(|&(a, b)| {
                if a == b {
                    a.to_string()
                } else {
                    format!("{}-{}", a, b)
                }
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

fn default_compress() -> bool {
    true
}

/// Everything an export needs to know besides the scene itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination for single-file and batched output
    pub filename: Option<PathBuf>,
    /// Name template for one-file-per-spread output. A run of `#` becomes
    /// the zero padded spread index.
    pub tofiles: Option<String>,
    pub target: ExportTarget,
    /// Spreads to export. All spreads when unset.
    pub range: Option<IndexRange>,
    pub evenodd: EvenOdd,
    pub reverse_order: bool,
    /// Page rotation in degrees: 0, 90, 180 or 270
    pub paper_rotation: u16,
    /// Turn every odd spread upside down
    pub rotate180: bool,
    /// Spreads per output file. 0 disables batching.
    pub batches: usize,
    /// Draw text as glyph outlines instead of embedding fonts
    pub text_as_paths: bool,
    /// Deflate image, mesh and font streams
    #[serde(default = "default_compress")]
    pub compress: bool,
    pub version: PdfVersion,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename: None,
            tofiles: None,
            target: ExportTarget::Single,
            range: None,
            evenodd: EvenOdd::All,
            reverse_order: false,
            paper_rotation: 0,
            rotate180: false,
            batches: 0,
            text_as_paths: false,
            compress: default_compress(),
            version: PdfVersion::V1_4,
        }
    }
}

impl ExportConfig {
    /// Single-file export to `filename`
    pub fn to_file(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ExportConfig =
            serde_json::from_str(json).map_err(|e| ExportError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.paper_rotation, 0 | 90 | 180 | 270) {
            return Err(ExportError::InvalidConfig(format!(
                "paper rotation must be 0, 90, 180 or 270, not {}",
                self.paper_rotation
            )));
        }
        Ok(())
    }

    /// Spread indices to export, in output order
    pub fn spread_order(&self, spreads: usize) -> Vec<usize> {
        let mut order: Vec<usize> = match &self.range {
            Some(range) => range.indices(spreads),
            None => (0..spreads).collect(),
        };
        order.retain(|&i| self.evenodd.keeps(i));
        if self.reverse_order {
            order.reverse();
        }
        order
    }

    /// `/Rotate` for a page printed from spread `index`
    pub fn rotation_for(&self, index: usize) -> u16 {
        let extra = if self.rotate180 && index % 2 == 1 {
            180
        } else {
            0
        };
        (self.paper_rotation + extra) % 360
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evenodd_from_setting() {
        assert_eq!(EvenOdd::from_setting("odd"), EvenOdd::Odd);
        assert_eq!(EvenOdd::from_setting("Even"), EvenOdd::Even);
        assert_eq!(EvenOdd::from_setting("both"), EvenOdd::All);
        assert_eq!(EvenOdd::from_setting(""), EvenOdd::All);
    }

    #[test]
    fn test_index_range_parse() {
        let range: IndexRange = "0-3, 5,9-8".parse().unwrap();
        assert_eq!(range.indices(20), vec![0, 1, 2, 3, 5, 8, 9]);
        assert_eq!(range.to_string(), "0-3,5,8-9");
        assert!("1-x".parse::<IndexRange>().is_err());
        assert!("".parse::<IndexRange>().is_err());
    }

    #[test]
    fn test_spread_order() {
        let config = ExportConfig {
            evenodd: EvenOdd::Even,
            reverse_order: true,
            ..ExportConfig::default()
        };
        assert_eq!(config.spread_order(10), vec![8, 6, 4, 2, 0]);

        let config = ExportConfig {
            range: Some(IndexRange::span(2, 6)),
            evenodd: EvenOdd::Odd,
            ..ExportConfig::default()
        };
        assert_eq!(config.spread_order(10), vec![3, 5]);
    }

    #[test]
    fn test_rotation() {
        let config = ExportConfig {
            paper_rotation: 270,
            rotate180: true,
            ..ExportConfig::default()
        };
        assert_eq!(config.rotation_for(0), 270);
        assert_eq!(config.rotation_for(1), 90);
    }

    #[test]
    fn test_from_json() {
        let config = ExportConfig::from_json(
            r#"{"filename": "out.pdf", "range": "1-2", "evenodd": "odd",
                "target": "multi", "version": "1.3"}"#,
        )
        .unwrap();
        assert_eq!(config.filename, Some(PathBuf::from("out.pdf")));
        assert_eq!(config.range, Some(IndexRange::span(1, 2)));
        assert_eq!(config.evenodd, EvenOdd::Odd);
        assert_eq!(config.target, ExportTarget::Multi);
        assert_eq!(config.version, PdfVersion::V1_3);
        assert!(config.compress);

        assert!(ExportConfig::from_json(r#"{"paper_rotation": 45}"#).is_err());
        assert!(ExportConfig::from_json(r#"{"range": "a-b"}"#).is_err());
    }
}
