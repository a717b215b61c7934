//! Image patches, rasterized then embedded as images
//!
//! PDF has no shading that samples a raster, so the warped image is drawn
//! offscreen as many small solid quads and the result is placed over the
//! patch bounds like any other image. The offscreen size follows the
//! current transform so the raster keeps up with the output resolution.

use std::io::Write;

use image::{Rgba, RgbaImage};
use scene::{Affine, BBox, ImagePatchData, ObjectId, Point};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use super::image::{place_image, write_image};
use super::Encoder;
use crate::resources::ResourceCategory;
use crate::Result;

const MAX_PIXELS: f64 = 4096.0;

pub(crate) fn encode_image_patch<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    patch: &ImagePatchData,
) -> Result<()> {
    if let Err(e) = patch.validate() {
        enc.log.fail(id, e.to_string());
        return Ok(());
    }
    let source = match patch.image.load() {
        Ok(pixels) => pixels,
        Err(e) => {
            enc.log.warning(id, format!("Image patch skipped: {}", e));
            return Ok(());
        }
    };
    let Some(bbox) = patch.bbox().filter(|b| b.width() > 0.0 && b.height() > 0.0) else {
        enc.log.warning(id, "Image patch has no area, skipped.");
        return Ok(());
    };

    let (width, height) = raster_size(&enc.stream.ctm(), &bbox, enc.options.dpi);
    let Some(raster) = rasterize(patch, &source, &bbox, width, height) else {
        enc.log.fail(id, "Could not allocate image patch raster.");
        return Ok(());
    };

    let number = write_image(enc, &raster)?;
    let name = format!("raster{}", number.0);
    enc.resources.add(ResourceCategory::XObject, &name, number);
    enc.with_object(&Affine::translate(bbox.min_x, bbox.min_y), |enc| {
        place_image(enc, &name, bbox.width(), bbox.height())
    })
}

/// Pixel size of the raster for `bbox` drawn through `ctm`. `ctm` maps
/// into points, so 72 units make one inch.
pub(crate) fn raster_size(ctm: &Affine, bbox: &BBox, dpi: f64) -> (u32, u32) {
    let origin = ctm.transform_point(Point::new(bbox.min_x, bbox.min_y));
    let right = ctm.transform_point(Point::new(bbox.max_x, bbox.min_y));
    let top = ctm.transform_point(Point::new(bbox.min_x, bbox.max_y));
    let pixels = |points: f64| (points / 72.0 * dpi).round().clamp(1.0, MAX_PIXELS) as u32;
    (pixels(origin.distance(right)), pixels(origin.distance(top)))
}

/// Point on the bicubic patch with control points `cp[row][col]`
fn eval_patch(cp: &[[Point; 4]; 4], s: f64, t: f64) -> Point {
    fn basis(u: f64) -> [f64; 4] {
        let v = 1.0 - u;
        [v * v * v, 3.0 * v * v * u, 3.0 * v * u * u, u * u * u]
    }
    let bs = basis(s);
    let bt = basis(t);
    let mut p = Point::new(0.0, 0.0);
    for (i, row) in cp.iter().enumerate() {
        for (j, q) in row.iter().enumerate() {
            let w = bt[i] * bs[j];
            p.x += w * q.x;
            p.y += w * q.y;
        }
    }
    p
}

fn sample(source: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let (w, h) = source.dimensions();
    let x = ((u * w as f64) as u32).min(w - 1);
    // Grid row 0 meets the bottom edge of the image
    let y = (((1.0 - v) * h as f64) as u32).min(h - 1);
    *source.get_pixel(x, y)
}

/// Draw the warped image into a `width` x `height` raster covering `bbox`
pub(crate) fn rasterize(
    patch: &ImagePatchData,
    source: &RgbaImage,
    bbox: &BBox,
    width: u32,
    height: u32,
) -> Option<RgbaImage> {
    if source.width() == 0 || source.height() == 0 {
        return None;
    }
    let mut pixmap = Pixmap::new(width, height)?;
    let (rows, columns) = (patch.rows(), patch.columns());
    // Enough quads per patch that each is about two pixels across
    let steps = ((width.max(height) as usize) / (2 * rows.max(columns))).clamp(4, 128);

    let to_pixel = |p: Point| {
        (
            ((p.x - bbox.min_x) / bbox.width() * width as f64) as f32,
            ((bbox.max_y - p.y) / bbox.height() * height as f64) as f32,
        )
    };

    let mut paint = Paint::default();
    paint.anti_alias = false;

    for r in 0..rows {
        for c in 0..columns {
            let mut cp = [[Point::default(); 4]; 4];
            for (i, row) in cp.iter_mut().enumerate() {
                for (j, q) in row.iter_mut().enumerate() {
                    *q = patch.point(3 * r + i, 3 * c + j);
                }
            }
            for ti in 0..steps {
                for si in 0..steps {
                    let (s0, s1) = (si as f64 / steps as f64, (si + 1) as f64 / steps as f64);
                    let (t0, t1) = (ti as f64 / steps as f64, (ti + 1) as f64 / steps as f64);
                    let u = (c as f64 + (s0 + s1) / 2.0) / columns as f64;
                    let v = (r as f64 + (t0 + t1) / 2.0) / rows as f64;
                    let color = sample(source, u, v);
                    if color.0[3] == 0 {
                        continue;
                    }

                    let mut pb = PathBuilder::new();
                    let (x, y) = to_pixel(eval_patch(&cp, s0, t0));
                    pb.move_to(x, y);
                    for (s, t) in [(s1, t0), (s1, t1), (s0, t1)] {
                        let (x, y) = to_pixel(eval_patch(&cp, s, t));
                        pb.line_to(x, y);
                    }
                    pb.close();
                    let Some(quad) = pb.finish() else {
                        continue;
                    };
                    paint.set_color_rgba8(color.0[0], color.0[1], color.0[2], color.0[3]);
                    pixmap.fill_path(&quad, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }

    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, data)
}
