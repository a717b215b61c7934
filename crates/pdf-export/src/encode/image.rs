//! Raster images as image XObjects
//!
//! Color goes into a /DeviceRGB image. Alpha, when any pixel is not fully
//! opaque, goes into a /DeviceGray soft mask written just before it.

use std::io::Write;

use image::RgbaImage;
use scene::{Affine, ImageData, ObjectId};

use super::Encoder;
use crate::ledger::{ObjectNumber, SourceKey};
use crate::resources::ResourceCategory;
use crate::Result;

pub(crate) fn encode_image<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    data: &ImageData,
) -> Result<()> {
    let key = SourceKey::Image(id);
    let number = match enc.cached(id, &key) {
        Some(number) => number,
        None => {
            let pixels = match data.load() {
                Ok(pixels) => pixels,
                Err(e) => {
                    enc.log.warning(id, format!("Image skipped: {}", e));
                    return Ok(());
                }
            };
            if pixels.width() == 0 || pixels.height() == 0 {
                enc.log.warning(id, "Image has no pixels, skipped.");
                return Ok(());
            }
            let number = write_image(enc, &pixels)?;
            enc.remember(id, key, number);
            number
        }
    };
    let name = enc.use_resource(ResourceCategory::XObject, "image", id, number);
    place_image(enc, &name, data.width, data.height)
}

/// Draw XObject `name` into the `width` x `height` rectangle at the origin
pub(crate) fn place_image<W: Write>(
    enc: &mut Encoder<'_, W>,
    name: &str,
    width: f64,
    height: f64,
) -> Result<()> {
    enc.with_object(&Affine::scale(width, height), |enc| {
        enc.stream.append(&format!("/{} Do\n", name));
        Ok(())
    })
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Write `pixels` as an image XObject, with a soft mask when needed.
/// Returns the number of the color image.
pub(crate) fn write_image<W: Write>(
    enc: &mut Encoder<'_, W>,
    pixels: &RgbaImage,
) -> Result<ObjectNumber> {
    let (width, height) = pixels.dimensions();
    let size = pixel_count(width, height);
    let mut rgb = Vec::with_capacity(size * 3);
    let mut alpha = Vec::with_capacity(size);
    for pixel in pixels.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask = if alpha.iter().any(|&a| a < 255) {
        let number = enc.ledger.allocate();
        let entries = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray \
             /BitsPerComponent 8",
            width, height
        );
        enc.writer
            .write_stream(enc.ledger, number, &entries, &alpha, true)?;
        Some(number)
    } else {
        None
    };

    let number = enc.ledger.allocate();
    let mut entries = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
         /BitsPerComponent 8",
        width, height
    );
    if let Some(mask) = smask {
        entries.push_str(&format!(" /SMask {}", mask));
    }
    enc.writer
        .write_stream(enc.ledger, number, &entries, &rgb, true)?;
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use image::Rgba;
    use scene::{ReferenceData, SceneKind, SceneNode};

    #[test]
    fn test_pixel_count_does_not_wrap() {
        assert_eq!(pixel_count(3, 2), 6);
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
    }

    fn pixels(alpha: u8) -> RgbaImage {
        RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, alpha]))
    }

    fn image_node(id: ObjectId, alpha: u8) -> SceneNode {
        SceneNode::new(
            id,
            SceneKind::Image(ImageData::from_pixels(2.0, 1.5, pixels(alpha))),
        )
    }

    #[test]
    fn test_opaque_image_has_no_mask() {
        let mut h = Harness::new();
        let (ops, resources) = h.encode(&[image_node(4, 255)]);
        assert!(ops.contains("q\n2 0 0 1.5 0 0 cm\n/image4 Do\nQ\n"));
        assert!(resources.to_pdf().contains("/XObject << /image4 1 0 R >>"));
        let out = h.output();
        assert!(out.contains("/Width 3 /Height 2 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length 18"));
        assert!(!out.contains("/SMask"));
    }

    #[test]
    fn test_translucent_image_gets_soft_mask_first() {
        let mut h = Harness::new();
        let (_, resources) = h.encode(&[image_node(4, 128)]);
        let out = h.output();
        let mask = out.find("/ColorSpace /DeviceGray").unwrap();
        let color = out.find("/ColorSpace /DeviceRGB").unwrap();
        assert!(mask < color);
        assert!(out.contains("/SMask 1 0 R"));
        assert_eq!(
            resources.get(ResourceCategory::XObject, "image4"),
            Some(ObjectNumber(2))
        );
    }

    #[test]
    fn test_image_and_reference_share_one_xobject() {
        let mut h = Harness::new();
        let reference = SceneNode::new(9, SceneKind::Reference(ReferenceData { target: 4 }))
            .with_transform(Affine::translate(3.0, 0.0));
        let (ops, _) = h.encode(&[image_node(4, 255), reference]);
        assert_eq!(ops.matches("/image4 Do").count(), 2);
        assert_eq!(h.output().matches("/Subtype /Image").count(), 1);
    }

    #[test]
    fn test_unloadable_image_is_skipped() {
        let mut h = Harness::new();
        let data = ImageData {
            width: 1.0,
            height: 1.0,
            source: Some("/nonexistent/picture.png".into()),
            pixels: None,
        };
        let (ops, _) = h.encode(&[SceneNode::new(7, SceneKind::Image(data))]);
        assert_eq!(ops, "");
        assert_eq!(h.log.len(), 1);
        assert_eq!(h.log.messages()[0].object_id, 7);
    }
}
