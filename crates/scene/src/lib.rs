//! Scene - the drawable model handed to exporters
//!
//! This crate provides:
//! - Affine geometry and bounding boxes
//! - Colors, line and fill styles
//! - The scene graph (groups, paths, gradients, mesh patches, images, text)
//! - Documents, pages, spreads and paper groups
//! - JSON parsing for all of the above
//!
//! # Example
//!
//! ```ignore
//! use scene::parse_document;
//!
//! let doc = parse_document(&std::fs::read_to_string("brochure.json")?)?;
//! for index in 0..doc.num_spreads() {
//!     let spread = doc.layout(index);
//! }
//! ```

mod geometry;
mod layout;
mod node;
pub mod parser;
mod path;
mod style;

pub use geometry::{Affine, BBox, Point};
pub use layout::{
    crop_marks, Document, Imposition, Page, PageLocation, PaperBox, PaperGroup, PaperStyle, Spread,
};
pub use node::{
    Align, CaptionData, ColorPatchData, FontSpec, ForeignData, GradientData, GradientStop,
    GroupData, ImageData, ImagePatchData, ObjectId, PathsData, ReferenceData, SceneIndex,
    SceneKind, SceneNode, TextOnPathData,
};
pub use parser::{load_document, parse_document, parse_node, parse_paper_group};
pub use path::{FlatPoint, Path, PathPoint, PathWeight, PointRole, Segment};
pub use style::{CapStyle, Color, FillRule, FillStyle, JoinStyle, LineStyle};

use thiserror::Error;

/// Errors that can occur while building or reading a scene
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to parse scene: {0}")]
    ParseError(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;

/// Points per scene unit. Scene coordinates are inches.
pub const POINTS_PER_UNIT: f64 = 72.0;
