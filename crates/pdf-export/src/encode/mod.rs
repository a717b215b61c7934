//! Scene node encoders
//!
//! One dispatcher walks the scene graph and hands each node to the encoder
//! for its kind. Encoders append operators to the page's content stream,
//! write any resources they need straight to the file, and register those
//! resources for the page.

mod font;
mod gradient;
mod image;
mod image_patch;
mod mesh;
mod path;
mod text;

pub(crate) use font::FontRegistry;
pub(crate) use path::{append_path, color_operator};

use std::io::Write;

use scene::{Affine, ForeignData, ObjectId, ReferenceData, SceneIndex, SceneKind, SceneNode};

use crate::content::ContentStream;
use crate::ledger::{ObjectLedger, ObjectNumber, SourceKey};
use crate::log::ErrorLog;
use crate::resources::{ResourceCategory, ResourceDictionary};
use crate::writer::PdfWriter;
use crate::Result;

/// Settings that change how nodes are encoded
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodeOptions {
    pub text_as_paths: bool,
    /// Resolution used when a node has to be rasterized
    pub dpi: f64,
}

/// Per-page encoding state, borrowing the per-file state it writes into
pub(crate) struct Encoder<'a, W: Write> {
    pub writer: &'a mut PdfWriter<W>,
    pub ledger: &'a mut ObjectLedger,
    pub fonts: &'a mut FontRegistry,
    pub log: &'a mut ErrorLog,
    pub options: EncodeOptions,
    pub stream: ContentStream,
    pub resources: ResourceDictionary,
    index: &'a SceneIndex<'a>,
    active_refs: Vec<ObjectId>,
}

impl<'a, W: Write> Encoder<'a, W> {
    pub fn new(
        writer: &'a mut PdfWriter<W>,
        ledger: &'a mut ObjectLedger,
        fonts: &'a mut FontRegistry,
        log: &'a mut ErrorLog,
        index: &'a SceneIndex<'a>,
        options: EncodeOptions,
    ) -> Self {
        Self {
            writer,
            ledger,
            fonts,
            log,
            options,
            stream: ContentStream::new(),
            resources: ResourceDictionary::new(),
            index,
            active_refs: Vec::new(),
        }
    }

    /// Run `f` inside a `q m cm` ... `Q` bracket. The bracket is closed
    /// whether or not `f` succeeds.
    pub fn with_object<T>(
        &mut self,
        m: &Affine,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.stream.begin_object(m);
        let result = f(self);
        self.stream.end_object();
        result
    }

    /// Encode `node` with its own transform
    pub fn encode(&mut self, node: &SceneNode) -> Result<()> {
        self.encode_as(node, &node.transform)
    }

    /// Encode `node` placed with `transform` instead of its own
    fn encode_as(&mut self, node: &SceneNode, transform: &Affine) -> Result<()> {
        match &node.kind {
            SceneKind::Reference(reference) => self.encode_reference(node.id, reference, transform),
            SceneKind::Foreign(foreign) => self.encode_foreign(node.id, foreign, transform),
            _ => self.with_object(transform, |enc| enc.encode_primitive(node)),
        }
    }

    fn encode_primitive(&mut self, node: &SceneNode) -> Result<()> {
        match &node.kind {
            SceneKind::Group(group) => {
                for child in &group.children {
                    self.encode(child)?;
                }
                Ok(())
            }
            SceneKind::Paths(paths) => path::encode_paths(self, paths),
            SceneKind::Gradient(gradient) => gradient::encode_gradient(self, node.id, gradient),
            SceneKind::ColorPatch(mesh) => mesh::encode_color_patch(self, node.id, mesh),
            SceneKind::Image(image) => image::encode_image(self, node.id, image),
            SceneKind::ImagePatch(patch) => image_patch::encode_image_patch(self, node.id, patch),
            SceneKind::Caption(caption) => text::encode_caption(self, node.id, caption),
            SceneKind::TextOnPath(text) => text::encode_text_on_path(self, node.id, text),
            // Placed by encode_as before any bracket is opened
            SceneKind::Reference(_) | SceneKind::Foreign(_) => Ok(()),
        }
    }

    fn encode_reference(
        &mut self,
        id: ObjectId,
        reference: &ReferenceData,
        transform: &Affine,
    ) -> Result<()> {
        if self.active_refs.contains(&reference.target) {
            self.log.warning(
                id,
                format!("Reference cycle through object {}, skipped.", reference.target),
            );
            return Ok(());
        }
        let Some(target) = self.index.get(reference.target) else {
            self.log.warning(
                id,
                format!("Reference to missing object {}, skipped.", reference.target),
            );
            return Ok(());
        };
        self.active_refs.push(reference.target);
        let result = self.encode_as(target, transform);
        self.active_refs.pop();
        result
    }

    /// Draw the stand-in of an object kind with no PDF encoding, if it has one
    fn encode_foreign(
        &mut self,
        id: ObjectId,
        foreign: &ForeignData,
        transform: &Affine,
    ) -> Result<()> {
        match &foreign.equivalent {
            Some(equivalent) => self.with_object(transform, |enc| enc.encode(equivalent)),
            None => {
                self.log.warning(
                    id,
                    format!("Cannot export {} objects to PDF.", foreign.type_name),
                );
                Ok(())
            }
        }
    }

    /// Cached object for `id` under `key`. Generated nodes (id 0) never share.
    pub fn cached(&self, id: ObjectId, key: &SourceKey) -> Option<ObjectNumber> {
        if id == 0 {
            None
        } else {
            self.ledger.find_by_source(key)
        }
    }

    pub fn remember(&mut self, id: ObjectId, key: SourceKey, number: ObjectNumber) {
        if id != 0 {
            self.ledger.remember(key, number);
        }
    }

    /// Register a page resource and return its local name
    pub fn use_resource(
        &mut self,
        category: ResourceCategory,
        prefix: &str,
        id: ObjectId,
        number: ObjectNumber,
    ) -> String {
        let name = if id == 0 {
            format!("{}o{}", prefix, number.0)
        } else {
            format!("{}{}", prefix, id)
        };
        self.resources.add(category, &name, number);
        name
    }

    pub fn finish(self) -> (ContentStream, ResourceDictionary) {
        (self.stream, self.resources)
    }
}
