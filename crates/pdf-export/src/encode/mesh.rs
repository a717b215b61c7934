//! Tensor-product patch meshes (ShadingType 7)
//!
//! Patches are emitted in a serpentine walk so that every patch after the
//! first shares an edge with the one before it. A shared edge is written
//! with edge flag 1, 2 or 3 and only the twelve new control points and two
//! new corner colors follow. The walk picks, for every patch, one of eight
//! orientations so that the shared edge lands where the flag expects it.

use std::io::Write;

use scene::{BBox, Color, ColorPatchData, ObjectId, Point};

use super::Encoder;
use crate::ledger::{ObjectNumber, SourceKey};
use crate::resources::ResourceCategory;
use crate::writer::fmt;
use crate::Result;

// Orientation names give the grid corners visited by the first and the
// fourth point of the patch edge walk (L/R column side, B/T row side).
const LBLT: usize = 0;
const LTRT: usize = 1;
const RTRB: usize = 2;
const RBLB: usize = 3;
const LTLB: usize = 4;
const LBRB: usize = 5;
const RBRT: usize = 6;
const RTLT: usize = 7;

/// Row within the 4x4 patch grid of control point k, per orientation
const ROW_OFFSET: [[usize; 16]; 8] = [
    [3, 2, 1, 0, 0, 0, 0, 1, 2, 3, 3, 3, 2, 1, 1, 2],
    [0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 2],
    [0, 1, 2, 3, 3, 3, 3, 2, 1, 0, 0, 0, 1, 2, 2, 1],
    [3, 3, 3, 3, 2, 1, 0, 0, 0, 0, 1, 2, 2, 2, 1, 1],
    [0, 1, 2, 3, 3, 3, 3, 2, 1, 0, 0, 0, 1, 2, 2, 1],
    [3, 3, 3, 3, 2, 1, 0, 0, 0, 0, 1, 2, 2, 2, 1, 1],
    [3, 2, 1, 0, 0, 0, 0, 1, 2, 3, 3, 3, 2, 1, 1, 2],
    [0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 2],
];

/// Column within the 4x4 patch grid of control point k, per orientation
const COL_OFFSET: [[usize; 16]; 8] = [
    [0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 2],
    [0, 1, 2, 3, 3, 3, 3, 2, 1, 0, 0, 0, 1, 2, 2, 1],
    [3, 3, 3, 3, 2, 1, 0, 0, 0, 0, 1, 2, 2, 2, 1, 1],
    [3, 2, 1, 0, 0, 0, 0, 1, 2, 3, 3, 3, 2, 1, 1, 2],
    [0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 2],
    [0, 1, 2, 3, 3, 3, 3, 2, 1, 0, 0, 0, 1, 2, 2, 1],
    [3, 3, 3, 3, 2, 1, 0, 0, 0, 0, 1, 2, 2, 2, 1, 1],
    [3, 2, 1, 0, 0, 0, 0, 1, 2, 3, 3, 3, 2, 1, 1, 2],
];

/// Control points that carry a corner color, in color order
const CORNERS: [usize; 4] = [0, 3, 6, 9];

/// One patch of the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatchStep {
    pub flag: u8,
    pub orientation: usize,
    pub row: usize,
    pub col: usize,
}

/// Serpentine order over a `rows` x `columns` patch grid
pub(crate) fn patch_order(rows: usize, columns: usize) -> Vec<PatchStep> {
    let mut steps = Vec::with_capacity(rows * columns);
    if rows == 0 || columns == 0 {
        return steps;
    }
    let mut emit = |flag: u8, orientation: usize, row: usize, col: usize| {
        steps.push(PatchStep {
            flag,
            orientation,
            row,
            col,
        })
    };

    let mut r: usize = 0;
    let mut c: isize;
    emit(0, LBLT, 0, 0);

    if columns == 1 {
        // Single column: walk straight up
        r = 1;
        if r < rows {
            emit(3, RTLT, r, 0);
            r += 1;
            while r < rows {
                emit(2, if r % 2 == 1 { RTLT } else { LTRT }, r, 0);
                r += 1;
            }
        }
    }

    let cols = columns as isize;
    c = 1;
    while r < rows {
        while c < cols {
            emit(2, if c % 2 == 1 { LTLB } else { LBLT }, r, c as usize);
            c += 1;
        }
        r += 1;
        if r < rows {
            c -= 1;
            if c % 2 == 1 {
                emit(1, LTRT, r, c as usize);
                c -= 1;
                if c >= 0 {
                    emit(3, RBRT, r, c as usize);
                }
                c -= 1;
            } else {
                emit(3, RTLT, r, c as usize);
                c -= 1;
                if c >= 0 {
                    emit(1, RTRB, r, c as usize);
                }
                c -= 1;
            }
            while c >= 0 {
                emit(2, if c % 2 == 1 { RTRB } else { RBRT }, r, c as usize);
                c -= 1;
            }
            r += 1;
            if r < rows {
                c += 1;
                emit(3, LTRT, r, c as usize);
                c += 1;
                if c < cols {
                    emit(1, LTLB, r, c as usize);
                }
                c += 1;
            }
        }
    }
    steps
}

/// Grid position of control point `k` of the patch at `step`
fn grid_point(step: &PatchStep, k: usize) -> (usize, usize) {
    (
        3 * step.row + ROW_OFFSET[step.orientation][k],
        3 * step.col + COL_OFFSET[step.orientation][k],
    )
}

/// Index into the corner color grid of corner point `k` of `step`
fn corner_color(step: &PatchStep, k: usize, columns: usize) -> usize {
    let stride = columns + 1;
    let base = step.row * stride + step.col;
    let down = usize::from(ROW_OFFSET[step.orientation][k] != 0);
    let right = usize::from(COL_OFFSET[step.orientation][k] != 0);
    base + down * stride + right
}

/// Linear map from `[min, max]` to `[0, 65535]`
fn quantize(value: f64, min: f64, max: f64) -> u16 {
    let span = max - min;
    if span <= 0.0 {
        return 0;
    }
    ((value - min) / span * 65535.0).round().clamp(0.0, 65535.0) as u16
}

/// Bounds used for the /Decode array, never of zero extent
pub(crate) fn decode_bounds(points: &[Point]) -> BBox {
    let mut bbox = BBox::from_points(points.iter().copied()).unwrap_or(BBox::new(0.0, 0.0, 1.0, 1.0));
    if bbox.width() <= 0.0 {
        bbox.max_x = bbox.min_x + 1.0;
    }
    if bbox.height() <= 0.0 {
        bbox.max_y = bbox.min_y + 1.0;
    }
    bbox
}

/// Stream bytes of the whole mesh: flag, coordinates, colors per patch
pub(crate) fn mesh_data(mesh: &ColorPatchData, bbox: &BBox) -> Vec<u8> {
    let columns = mesh.columns();
    let steps = patch_order(mesh.rows(), columns);
    let mut out = Vec::with_capacity(steps.len() * (1 + 16 * 4 + 4 * 3));

    let push_point = |out: &mut Vec<u8>, p: Point| {
        out.extend_from_slice(&quantize(p.x, bbox.min_x, bbox.max_x).to_be_bytes());
        out.extend_from_slice(&quantize(p.y, bbox.min_y, bbox.max_y).to_be_bytes());
    };
    let push_color = |out: &mut Vec<u8>, color: &Color| out.extend_from_slice(&color.to_rgb8());

    for step in &steps {
        out.push(step.flag);
        let first = if step.flag == 0 { 0 } else { 4 };
        for k in first..16 {
            let (row, col) = grid_point(step, k);
            push_point(&mut out, mesh.point(row, col));
        }
        let corners: &[usize] = if step.flag == 0 { &CORNERS } else { &CORNERS[2..] };
        for &k in corners {
            push_color(&mut out, &mesh.colors[corner_color(step, k, columns)]);
        }
    }
    out
}

pub(crate) fn encode_color_patch<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    mesh: &ColorPatchData,
) -> Result<()> {
    if let Err(e) = mesh.validate() {
        enc.log.fail(id, e.to_string());
        return Ok(());
    }
    let key = SourceKey::Shading(id);
    let number = match enc.cached(id, &key) {
        Some(number) => number,
        None => {
            let number = write_mesh(enc, mesh)?;
            enc.remember(id, key, number);
            number
        }
    };
    let name = enc.use_resource(ResourceCategory::Shading, "colorpatch", id, number);
    enc.stream.append(&format!("/{} sh\n", name));
    Ok(())
}

fn write_mesh<W: Write>(enc: &mut Encoder<'_, W>, mesh: &ColorPatchData) -> Result<ObjectNumber> {
    let bbox = decode_bounds(&mesh.points);
    let data = mesh_data(mesh, &bbox);
    let number = enc.ledger.allocate();
    let entries = format!(
        "/ShadingType 7 /ColorSpace /DeviceRGB /BitsPerCoordinate 16 /BitsPerComponent 8 \
         /BitsPerFlag 8 /Decode [{} {} {} {} 0 1 0 1 0 1]",
        fmt(bbox.min_x),
        fmt(bbox.max_x),
        fmt(bbox.min_y),
        fmt(bbox.max_y)
    );
    enc.writer
        .write_stream(enc.ledger, number, &entries, &data, true)?;
    Ok(number)
}
