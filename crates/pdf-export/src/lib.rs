//! PDF Export - single-pass PDF writer for scenes
//!
//! This crate provides functionality for:
//! - Numbering and locating indirect objects
//! - Building page content streams with balanced `q`/`Q` brackets
//! - Encoding paths, gradients, patch meshes, images and text
//! - Laying spreads out on papers, one page per paper
//! - Splitting output into batches or one file per spread
//!
//! # Example
//!
//! ```ignore
//! use pdf_export::{ExportConfig, ExportJob, Exporter};
//!
//! let doc = scene::load_document("brochure.json")?;
//! let job = ExportJob::document(&doc);
//! let report = Exporter::new(ExportConfig::to_file("brochure.pdf")).run(&job)?;
//! for message in report.log.messages() {
//!     eprintln!("{}: {}", message.object_id, message.message);
//! }
//! ```

mod assembler;
pub mod config;
mod content;
mod encode;
mod export;
mod ledger;
mod log;
mod resources;
mod writer;

pub use config::{EvenOdd, ExportConfig, ExportTarget, IndexRange, PdfVersion};
pub use content::ContentStream;
pub use export::{export_document, export_to_writer, ExportJob, Exporter, OutputFile, Sheet};
pub use ledger::{IndirectObject, ObjectLedger, ObjectNumber, SourceKey};
pub use log::{ErrorLog, ExportReport, ExportStatus, LogMessage, Severity};
pub use resources::{ResourceCategory, ResourceDictionary};
pub use writer::PdfWriter;

use std::path::PathBuf;

use scene::SceneError;
use thiserror::Error;

/// Errors that abort an export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export: no document and no loose objects")]
    NothingToExport,

    #[error("Missing export destination")]
    MissingDestination,

    #[error("Export would produce {pages} pages but the filter writes single-page files")]
    MultiPageUnsupported { pages: usize },

    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Export of {} failed after {total} files: {source}", file.display())]
    FileFailed {
        file: PathBuf,
        total: usize,
        source: Box<ExportError>,
    },
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
