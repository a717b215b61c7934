//! Scene JSON parsing

use std::path::{Path as FsPath, PathBuf};

use crate::layout::{Document, PaperGroup};
use crate::node::{SceneKind, SceneNode};
use crate::{Result, SceneError};

/// Parse a document from JSON string
pub fn parse_document(json: &str) -> Result<Document> {
    let doc: Document =
        serde_json::from_str(json).map_err(|e| SceneError::ParseError(e.to_string()))?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Parse a single scene node from JSON string
pub fn parse_node(json: &str) -> Result<SceneNode> {
    let node: SceneNode =
        serde_json::from_str(json).map_err(|e| SceneError::ParseError(e.to_string()))?;
    validate_node(&node)?;
    Ok(node)
}

/// Parse a paper group from JSON string
pub fn parse_paper_group(json: &str) -> Result<PaperGroup> {
    let group: PaperGroup =
        serde_json::from_str(json).map_err(|e| SceneError::ParseError(e.to_string()))?;
    if group.papers.is_empty() {
        return Err(SceneError::ParseError("paper group has no papers".into()));
    }
    group.objects.iter().try_for_each(validate_node)?;
    Ok(group)
}

/// Read a document file. Relative image and font paths are resolved
/// against the file's directory.
pub fn load_document(path: impl AsRef<FsPath>) -> Result<Document> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| SceneError::ParseError(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let mut doc: Document = serde_json::from_value(value)?;
    if let Some(base) = path.parent() {
        for page in &mut doc.pages {
            page.layers.iter_mut().for_each(|n| rebase_node(n, base));
        }
        doc.paper_group
            .objects
            .iter_mut()
            .for_each(|n| rebase_node(n, base));
        doc.library.iter_mut().for_each(|n| rebase_node(n, base));
    }
    validate_document(&doc)?;
    Ok(doc)
}

fn validate_document(doc: &Document) -> Result<()> {
    for page in &doc.pages {
        page.layers.iter().try_for_each(validate_node)?;
    }
    doc.paper_group.objects.iter().try_for_each(validate_node)?;
    doc.library.iter().try_for_each(validate_node)
}

fn rebase(file: &mut Option<PathBuf>, base: &FsPath) {
    if let Some(f) = file {
        if f.is_relative() {
            *f = base.join(&*f);
        }
    }
}

fn rebase_node(node: &mut SceneNode, base: &FsPath) {
    match &mut node.kind {
        SceneKind::Group(group) => group
            .children
            .iter_mut()
            .for_each(|child| rebase_node(child, base)),
        SceneKind::Image(image) => rebase(&mut image.source, base),
        SceneKind::ImagePatch(patch) => rebase(&mut patch.image.source, base),
        SceneKind::Caption(caption) => rebase(&mut caption.font.file, base),
        SceneKind::TextOnPath(text) => rebase(&mut text.font.file, base),
        SceneKind::Foreign(foreign) => {
            if let Some(eq) = foreign.equivalent.as_deref_mut() {
                rebase_node(eq, base);
            }
        }
        SceneKind::Paths(_)
        | SceneKind::Gradient(_)
        | SceneKind::ColorPatch(_)
        | SceneKind::Reference(_) => {}
    }
}

/// Reject mesh grids whose buffers do not match their sizes
fn validate_node(node: &SceneNode) -> Result<()> {
    match &node.kind {
        SceneKind::Group(group) => group.children.iter().try_for_each(validate_node),
        SceneKind::ColorPatch(mesh) => mesh.validate(),
        SceneKind::ImagePatch(patch) => patch.validate(),
        SceneKind::Foreign(foreign) => match &foreign.equivalent {
            Some(eq) => validate_node(eq),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}
