//! Documents, spreads and paper groups
//!
//! A document lays its pages out into spreads according to its imposition.
//! Each spread is printed onto every paper of a paper group.

use serde::{Deserialize, Serialize};

use crate::geometry::{Affine, BBox, Point};
use crate::node::{PathsData, SceneIndex, SceneKind, SceneNode};
use crate::path::Path;
use crate::style::{Color, LineStyle};

/// Distance between a page corner and the start of its crop mark
const MARK_GAP: f64 = 0.0625;
const MARK_LENGTH: f64 = 0.25;
/// Half a point, in inches
const MARK_WIDTH: f64 = 0.5 / 72.0;

fn default_dpi() -> f64 {
    300.0
}

/// Physical sheet size in inches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperStyle {
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_dpi")]
    pub dpi: f64,
    /// Stored as a portrait sheet and turned a quarter turn for viewing.
    /// `width` and `height` are the sheet as seen.
    #[serde(default)]
    pub landscape: bool,
}

impl PaperStyle {
    pub fn new(name: &str, width: f64, height: f64) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            dpi: default_dpi(),
            landscape: false,
        }
    }

    /// Same sheet, marked landscape
    pub fn landscape(mut self) -> Self {
        self.landscape = true;
        self
    }

    /// Width and height of the stored sheet, before any page rotation
    pub fn media_size(&self) -> (f64, f64) {
        if self.landscape {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Maps the sheet as seen onto the stored sheet
    pub fn media_transform(&self) -> Affine {
        if self.landscape {
            Affine([0.0, 1.0, -1.0, 0.0, self.height, 0.0])
        } else {
            Affine::identity()
        }
    }

    pub fn letter() -> Self {
        Self::new("Letter", 8.5, 11.0)
    }
}

impl Default for PaperStyle {
    fn default() -> Self {
        Self::letter()
    }
}

fn white() -> Color {
    Color::white()
}

/// One paper of a group. `transform` maps paper space into spread space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperBox {
    pub paper: PaperStyle,
    #[serde(default)]
    pub transform: Affine,
    #[serde(default = "white")]
    pub color: Color,
}

impl PaperBox {
    pub fn new(paper: PaperStyle) -> Self {
        Self {
            paper,
            transform: Affine::identity(),
            color: Color::white(),
        }
    }
}

/// Papers a spread is printed on, plus objects drawn on every paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperGroup {
    #[serde(default)]
    pub name: String,
    pub papers: Vec<PaperBox>,
    #[serde(default)]
    pub objects: Vec<SceneNode>,
}

impl PaperGroup {
    pub fn single(paper: PaperStyle) -> Self {
        Self {
            name: paper.name.clone(),
            papers: vec![PaperBox::new(paper)],
            objects: Vec::new(),
        }
    }
}

impl Default for PaperGroup {
    fn default() -> Self {
        Self::single(PaperStyle::letter())
    }
}

/// A document page: its layers in drawing order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub layers: Vec<SceneNode>,
    /// Clip the layers to the page outline
    #[serde(default)]
    pub clips: bool,
}

/// How pages are arranged into spreads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Imposition {
    /// One page per spread
    #[default]
    Singles,
    /// Consecutive pages placed left to right
    SideBySide { pages_per_spread: usize },
}

/// Where a page sits in a spread
#[derive(Debug, Clone, PartialEq)]
pub struct PageLocation {
    pub index: usize,
    /// Page space to spread space
    pub transform: Affine,
    /// Page boundary in page space
    pub outline: Path,
}

/// One layout unit as handed to an exporter
#[derive(Debug, Clone, PartialEq)]
pub struct Spread {
    pub index: usize,
    pub pages: Vec<PageLocation>,
    /// Printer marks, drawn after paper group objects
    pub marks: Option<SceneNode>,
}

impl Spread {
    /// Bounds of all page outlines in spread space
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.pages.iter().flat_map(|loc| {
            loc.outline
                .points
                .iter()
                .map(move |p| loc.transform.transform_point(p.point()))
        }))
    }
}

/// The document collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub name: String,
    pub page_width: f64,
    pub page_height: f64,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub imposition: Imposition,
    #[serde(default)]
    pub paper_group: PaperGroup,
    #[serde(default)]
    pub printer_marks: bool,
    /// Nodes only drawn through references
    #[serde(default)]
    pub library: Vec<SceneNode>,
}

impl Document {
    pub fn new(name: &str, page_width: f64, page_height: f64) -> Self {
        Self {
            name: name.to_string(),
            page_width,
            page_height,
            pages: Vec::new(),
            imposition: Imposition::Singles,
            paper_group: PaperGroup::single(PaperStyle::new(name, page_width, page_height)),
            printer_marks: false,
            library: Vec::new(),
        }
    }

    fn pages_per_spread(&self) -> usize {
        match self.imposition {
            Imposition::Singles => 1,
            Imposition::SideBySide { pages_per_spread } => pages_per_spread.max(1),
        }
    }

    pub fn num_spreads(&self) -> usize {
        self.pages.len().div_ceil(self.pages_per_spread())
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_outline(&self) -> Path {
        Path::rectangle(0.0, 0.0, self.page_width, self.page_height)
    }

    /// Arrange spread `index`, or `None` past the last spread
    pub fn layout(&self, index: usize) -> Option<Spread> {
        let per = self.pages_per_spread();
        let first = index * per;
        if first >= self.pages.len() {
            return None;
        }
        let last = (first + per).min(self.pages.len());
        let pages: Vec<PageLocation> = (first..last)
            .map(|page| PageLocation {
                index: page,
                transform: Affine::translate((page - first) as f64 * self.page_width, 0.0),
                outline: self.page_outline(),
            })
            .collect();
        let mut spread = Spread {
            index,
            pages,
            marks: None,
        };
        if self.printer_marks {
            spread.marks = spread.bbox().map(crop_marks);
        }
        Some(spread)
    }

    /// Add every node reachable from the document to `index`
    pub fn index_into<'a>(&'a self, index: &mut SceneIndex<'a>) {
        for page in &self.pages {
            index.add_all(&page.layers);
        }
        index.add_all(&self.paper_group.objects);
        index.add_all(&self.library);
    }
}

/// Corner crop marks just outside `bbox`
pub fn crop_marks(bbox: BBox) -> SceneNode {
    let mut paths = Vec::with_capacity(8);
    for (x, dx) in [(bbox.min_x, -1.0), (bbox.max_x, 1.0)] {
        for (y, dy) in [(bbox.min_y, -1.0), (bbox.max_y, 1.0)] {
            let start = MARK_GAP;
            let end = MARK_GAP + MARK_LENGTH;
            paths.push(Path::polyline(
                &[
                    Point::new(x + dx * start, y),
                    Point::new(x + dx * end, y),
                ],
                false,
            ));
            paths.push(Path::polyline(
                &[
                    Point::new(x, y + dy * start),
                    Point::new(x, y + dy * end),
                ],
                false,
            ));
        }
    }
    SceneNode::new(
        0,
        SceneKind::Paths(PathsData {
            paths,
            line: Some(LineStyle {
                color: Color::black(),
                width: MARK_WIDTH,
                cap: Default::default(),
                join: Default::default(),
                dashed: false,
            }),
            fill: None,
        }),
    )
}
