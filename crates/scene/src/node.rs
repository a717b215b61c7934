//! Scene graph nodes
//!
//! Nodes are a closed sum type. JSON uses a `type` tag next to the common
//! `id` and `transform` fields:
//!
//! ```json
//! { "id": 7, "type": "reference", "target": 3, "transform": [1,0,0,1,2,0] }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::geometry::{Affine, BBox, Point};
use crate::path::Path;
use crate::style::{Color, FillStyle, LineStyle};
use crate::{Result, SceneError};

/// Stable identity of a scene node. Id 0 marks generated nodes.
pub type ObjectId = u64;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// A node of the scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default)]
    pub id: ObjectId,
    #[serde(default)]
    pub transform: Affine,
    #[serde(flatten)]
    pub kind: SceneKind,
}

/// Every kind of drawable the scene can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SceneKind {
    Group(GroupData),
    Paths(PathsData),
    Gradient(GradientData),
    ColorPatch(ColorPatchData),
    Image(ImageData),
    ImagePatch(ImagePatchData),
    Caption(CaptionData),
    TextOnPath(TextOnPathData),
    Reference(ReferenceData),
    Foreign(ForeignData),
}

impl SceneNode {
    pub fn new(id: ObjectId, kind: SceneKind) -> Self {
        Self {
            id,
            transform: Affine::identity(),
            kind,
        }
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn group(id: ObjectId, children: Vec<SceneNode>) -> Self {
        Self::new(id, SceneKind::Group(GroupData { children }))
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            SceneKind::Group(_) => "Group",
            SceneKind::Paths(_) => "PathsData",
            SceneKind::Gradient(_) => "GradientData",
            SceneKind::ColorPatch(_) => "ColorPatchData",
            SceneKind::Image(_) => "ImageData",
            SceneKind::ImagePatch(_) => "ImagePatchData",
            SceneKind::Caption(_) => "CaptionData",
            SceneKind::TextOnPath(_) => "TextOnPath",
            SceneKind::Reference(_) => "SomeDataRef",
            SceneKind::Foreign(f) => &f.type_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

/// A set of subpaths sharing one line and fill style
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsData {
    pub paths: Vec<Path>,
    #[serde(default)]
    pub line: Option<LineStyle>,
    #[serde(default)]
    pub fill: Option<FillStyle>,
}

impl PathsData {
    pub fn is_weighted(&self) -> bool {
        self.paths.iter().any(Path::is_weighted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f64,
    pub color: Color,
}

/// Linear or radial gradient laid out along the x axis of its own space.
///
/// Linear gradients run from `(p1, 0)` to `(p2, 0)`. Radial gradients
/// interpolate between circles centered there with radii `r1` and `r2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientData {
    pub p1: f64,
    pub p2: f64,
    #[serde(default)]
    pub r1: f64,
    #[serde(default)]
    pub r2: f64,
    #[serde(default)]
    pub radial: bool,
    pub stops: Vec<GradientStop>,
    /// Area painted by the gradient. Derived from the geometry when absent.
    #[serde(default)]
    pub bounds: Option<BBox>,
}

impl GradientData {
    pub fn bbox(&self) -> BBox {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        if self.radial {
            let r1 = self.r1.abs();
            let r2 = self.r2.abs();
            BBox::new(
                (self.p1 - r1).min(self.p2 - r2),
                -r1.max(r2),
                (self.p1 + r1).max(self.p2 + r2),
                r1.max(r2),
            )
        } else {
            let r = self.r1.abs().max(self.r2.abs()).max(1.0);
            BBox::new(self.p1.min(self.p2), -r, self.p1.max(self.p2), r)
        }
    }
}

/// Grid of tensor-product patches with per-corner colors.
///
/// `points` is row major with `xsize` points per row, so a mesh of
/// `c` columns and `r` rows has `xsize = 3c + 1` and `ysize = 3r + 1`.
/// `colors` holds `(c + 1) * (r + 1)` corner colors, also row major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPatchData {
    pub xsize: usize,
    pub ysize: usize,
    pub points: Vec<Point>,
    pub colors: Vec<Color>,
}

impl ColorPatchData {
    pub fn columns(&self) -> usize {
        self.xsize.saturating_sub(1) / 3
    }

    pub fn rows(&self) -> usize {
        self.ysize.saturating_sub(1) / 3
    }

    /// Check that the grid sizes and buffers agree
    pub fn validate(&self) -> Result<()> {
        validate_grid(self.xsize, self.ysize, self.points.len())?;
        let expected = (self.columns() + 1) * (self.rows() + 1);
        if self.colors.len() != expected {
            return Err(SceneError::InvalidMesh(format!(
                "expected {} corner colors, found {}",
                expected,
                self.colors.len()
            )));
        }
        Ok(())
    }

    pub fn point(&self, row: usize, col: usize) -> Point {
        self.points[row * self.xsize + col]
    }
}

fn validate_grid(xsize: usize, ysize: usize, points: usize) -> Result<()> {
    if xsize < 4 || ysize < 4 || (xsize - 1) % 3 != 0 || (ysize - 1) % 3 != 0 {
        return Err(SceneError::InvalidMesh(format!(
            "grid size {}x{} is not 3n+1 by 3m+1",
            xsize, ysize
        )));
    }
    if points != xsize * ysize {
        return Err(SceneError::InvalidMesh(format!(
            "expected {} control points, found {}",
            xsize * ysize,
            points
        )));
    }
    Ok(())
}

/// Raster image drawn into the unit rectangle scaled to `width` x `height`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: f64,
    pub height: f64,
    /// File the pixels are loaded from when `pixels` is not set
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(skip)]
    pub pixels: Option<Arc<RgbaImage>>,
}

impl PartialEq for ImageData {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.source == other.source
            && match (&self.pixels, &other.pixels) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl ImageData {
    pub fn from_pixels(width: f64, height: f64, pixels: RgbaImage) -> Self {
        Self {
            width,
            height,
            source: None,
            pixels: Some(Arc::new(pixels)),
        }
    }

    /// Pixel buffer, decoding `source` if nothing is loaded yet
    pub fn load(&self) -> Result<Arc<RgbaImage>> {
        if let Some(pixels) = &self.pixels {
            return Ok(pixels.clone());
        }
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| SceneError::Image("image has no pixels and no source".into()))?;
        let decoded = image::open(source)
            .map_err(|e| SceneError::Image(format!("{}: {}", source.display(), e)))?;
        Ok(Arc::new(decoded.to_rgba8()))
    }
}

/// Patch grid whose colors are sampled from an image.
/// The image is stretched so its corners sit on the grid corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePatchData {
    pub xsize: usize,
    pub ysize: usize,
    pub points: Vec<Point>,
    pub image: ImageData,
}

impl ImagePatchData {
    pub fn columns(&self) -> usize {
        self.xsize.saturating_sub(1) / 3
    }

    pub fn rows(&self) -> usize {
        self.ysize.saturating_sub(1) / 3
    }

    pub fn validate(&self) -> Result<()> {
        validate_grid(self.xsize, self.ysize, self.points.len())
    }

    pub fn point(&self, row: usize, col: usize) -> Point {
        self.points[row * self.xsize + col]
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points.iter().copied())
    }
}

/// Font request. `file` is the program to embed; family and style name it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(skip)]
    pub data: Option<Arc<Vec<u8>>>,
}

impl PartialEq for FontSpec {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family && self.style == other.style && self.file == other.file
    }
}

impl FontSpec {
    /// Name used to share one embedded font between text objects
    pub fn key(&self) -> String {
        match &self.file {
            Some(file) => file.display().to_string(),
            None => format!("{}-{}", self.family, self.style),
        }
    }

    pub fn is_italic(&self) -> bool {
        let style = self.style.to_lowercase();
        style.contains("italic") || style.contains("oblique")
    }

    /// Bytes of the font program, reading `file` if needed
    pub fn load(&self) -> std::io::Result<Arc<Vec<u8>>> {
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        match &self.file {
            Some(file) => Ok(Arc::new(std::fs::read(file)?)),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no font file for {} {}", self.family, self.style),
            )),
        }
    }
}

fn default_font_size() -> f64 {
    12.0
}

fn default_line_spacing() -> f64 {
    1.2
}

/// Multi-line text block. Sizes are in points; the baseline of the first
/// line sits at the node origin and later lines move down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionData {
    pub lines: Vec<String>,
    #[serde(default)]
    pub font: FontSpec,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f64,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub color: Color,
}

/// Text laid along a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOnPathData {
    pub text: String,
    #[serde(default)]
    pub font: FontSpec,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    pub path: Path,
    #[serde(default)]
    pub start_offset: f64,
    #[serde(default)]
    pub color: Color,
}

/// Draws another node by id. This node's transform replaces the target's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub target: ObjectId,
}

/// A kind of object this model cannot describe directly, optionally
/// carrying a drawable stand-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignData {
    pub type_name: String,
    #[serde(default)]
    pub equivalent: Option<Box<SceneNode>>,
}

/// Identity lookup over one or more node trees
#[derive(Debug, Default)]
pub struct SceneIndex<'a> {
    nodes: HashMap<ObjectId, &'a SceneNode>,
}

impl<'a> SceneIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `root` and all its descendants. Earlier entries win on id clashes.
    pub fn add(&mut self, root: &'a SceneNode) {
        if root.id != 0 {
            self.nodes.entry(root.id).or_insert(root);
        }
        match &root.kind {
            SceneKind::Group(group) => {
                for child in &group.children {
                    self.add(child);
                }
            }
            SceneKind::Foreign(ForeignData {
                equivalent: Some(eq),
                ..
            }) => self.add(eq),
            _ => {}
        }
    }

    pub fn add_all<I: IntoIterator<Item = &'a SceneNode>>(&mut self, roots: I) {
        for root in roots {
            self.add(root);
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&'a SceneNode> {
        self.nodes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(columns: usize, rows: usize) -> ColorPatchData {
        let xsize = columns * 3 + 1;
        let ysize = rows * 3 + 1;
        let points = (0..ysize)
            .flat_map(|r| (0..xsize).map(move |c| Point::new(c as f64, r as f64)))
            .collect();
        ColorPatchData {
            xsize,
            ysize,
            points,
            colors: vec![Color::black(); (columns + 1) * (rows + 1)],
        }
    }

    #[test]
    fn test_mesh_validation() {
        let good = mesh(2, 3);
        assert_eq!(good.columns(), 2);
        assert_eq!(good.rows(), 3);
        assert!(good.validate().is_ok());

        let mut bad = mesh(2, 2);
        bad.colors.pop();
        assert!(matches!(bad.validate(), Err(SceneError::InvalidMesh(_))));

        let mut bad = mesh(1, 1);
        bad.xsize = 5;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_index_resolves_nested_nodes() {
        let leaf = SceneNode::new(
            3,
            SceneKind::Reference(ReferenceData { target: 1 }),
        );
        let root = SceneNode::group(1, vec![SceneNode::group(2, vec![leaf])]);
        let mut index = SceneIndex::new();
        index.add(&root);
        assert_eq!(index.len(), 3);
        assert!(index.get(3).is_some());
        assert!(index.get(4).is_none());
    }

    #[test]
    fn test_generated_nodes_are_not_indexed() {
        let root = SceneNode::group(0, Vec::new());
        let mut index = SceneIndex::new();
        index.add(&root);
        assert!(index.is_empty());
    }

    #[test]
    fn test_radial_gradient_bbox() {
        let g = GradientData {
            p1: 0.0,
            p2: 2.0,
            r1: 1.0,
            r2: -3.0,
            radial: true,
            stops: Vec::new(),
            bounds: None,
        };
        assert_eq!(g.bbox(), BBox::new(-1.0, -3.0, 5.0, 3.0));
    }

    #[test]
    fn test_font_key_and_style() {
        let font = FontSpec {
            family: "Serif".into(),
            style: "Bold Italic".into(),
            file: None,
            data: None,
        };
        assert_eq!(font.key(), "Serif-Bold Italic");
        assert!(font.is_italic());
        assert!(font.load().is_err());
    }
}
