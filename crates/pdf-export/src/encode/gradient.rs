//! Axial and radial gradients as shading dictionaries
//!
//! The color ramp is a type 3 stitching function with one type 2
//! interpolation per pair of neighboring stops.

use std::io::Write;

use scene::{BBox, GradientData, GradientStop, ObjectId};

use super::Encoder;
use crate::ledger::{ObjectNumber, SourceKey};
use crate::resources::ResourceCategory;
use crate::writer::fmt;
use crate::Result;

pub(crate) fn encode_gradient<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    data: &GradientData,
) -> Result<()> {
    if data.stops.is_empty() {
        enc.log.warning(id, "Gradient has no color stops, skipped.");
        return Ok(());
    }
    let bbox = data.bbox();
    let key = SourceKey::Shading(id);
    let number = match enc.cached(id, &key) {
        Some(number) => number,
        None => {
            let number = write_shading(enc, data, &bbox)?;
            enc.remember(id, key, number);
            number
        }
    };
    let name = enc.use_resource(ResourceCategory::Shading, "gradient", id, number);
    enc.stream.append(&format!(
        "{} {} {} {} re W n /{} sh\n",
        fmt(bbox.min_x),
        fmt(bbox.min_y),
        fmt(bbox.width()),
        fmt(bbox.height()),
        name
    ));
    Ok(())
}

fn write_shading<W: Write>(
    enc: &mut Encoder<'_, W>,
    data: &GradientData,
    bbox: &BBox,
) -> Result<ObjectNumber> {
    let mut stops = data.stops.clone();
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    if stops.len() == 1 {
        stops.push(stops[0]);
    }

    // Numbers are taken up front so the shading can name its function
    let shading = enc.ledger.allocate();
    let stitch = enc.ledger.allocate();
    let pieces: Vec<ObjectNumber> = (1..stops.len()).map(|_| enc.ledger.allocate()).collect();

    let coords = if data.radial {
        format!(
            "/ShadingType 3 /Coords [{} 0 {} {} 0 {}]",
            fmt(data.p1),
            fmt(data.r1.abs()),
            fmt(data.p2),
            fmt(data.r2.abs())
        )
    } else {
        format!(
            "/ShadingType 2 /Coords [{} 0 {} 0]",
            fmt(data.p1),
            fmt(data.p2)
        )
    };
    enc.writer.write_dict(
        enc.ledger,
        shading,
        &format!(
            "{} /ColorSpace /DeviceRGB /BBox [{} {} {} {}] /Domain [0 1] \
             /Extend [true true] /Function {}",
            coords,
            fmt(bbox.min_x),
            fmt(bbox.min_y),
            fmt(bbox.max_x),
            fmt(bbox.max_y),
            stitch
        ),
    )?;

    enc.writer
        .write_dict(enc.ledger, stitch, &stitching_function(&stops, &pieces))?;

    for (pair, number) in stops.windows(2).zip(&pieces) {
        enc.writer
            .write_dict(enc.ledger, *number, &interpolation_function(&pair[0], &pair[1]))?;
    }
    Ok(shading)
}

/// Bounds of the interior stops, normalized to the first..last stop span
pub(crate) fn stitch_bounds(stops: &[GradientStop]) -> Vec<f64> {
    let n = stops.len();
    if n < 3 {
        return Vec::new();
    }
    let first = stops[0].position;
    let span = stops[n - 1].position - first;
    stops[1..n - 1]
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            if span > 0.0 {
                (stop.position - first) / span
            } else {
                (i + 1) as f64 / (n - 1) as f64
            }
        })
        .collect()
}

fn stitching_function(stops: &[GradientStop], pieces: &[ObjectNumber]) -> String {
    let functions: Vec<String> = pieces.iter().map(|n| n.to_string()).collect();
    let bounds: Vec<String> = stitch_bounds(stops).into_iter().map(fmt).collect();
    let encode: Vec<&str> = pieces.iter().map(|_| "0 1").collect();
    format!(
        "/FunctionType 3 /Domain [0 1] /Functions [{}] /Bounds [{}] /Encode [{}]",
        functions.join(" "),
        bounds.join(" "),
        encode.join(" ")
    )
}

fn interpolation_function(from: &GradientStop, to: &GradientStop) -> String {
    format!(
        "/FunctionType 2 /Domain [0 1] /C0 [{} {} {}] /C1 [{} {} {}] /N 1",
        fmt(from.color.r),
        fmt(from.color.g),
        fmt(from.color.b),
        fmt(to.color.r),
        fmt(to.color.g),
        fmt(to.color.b)
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use scene::{Color, SceneKind, SceneNode};

    fn stop(position: f64, color: Color) -> GradientStop {
        GradientStop { position, color }
    }

    fn gradient(stops: Vec<GradientStop>, radial: bool) -> GradientData {
        GradientData {
            p1: 0.0,
            p2: 4.0,
            r1: 1.0,
            r2: 2.0,
            radial,
            stops,
            bounds: None,
        }
    }

    #[test]
    fn test_three_stop_bounds() {
        let stops = vec![
            stop(0.2, Color::black()),
            stop(0.4, Color::white()),
            stop(1.0, Color::black()),
        ];
        assert_eq!(stitch_bounds(&stops), vec![0.25]);
    }

    #[test]
    fn test_three_stop_gradient_objects() {
        let mut h = Harness::new();
        let node = SceneNode::new(
            6,
            SceneKind::Gradient(gradient(
                vec![
                    stop(0.0, Color::rgb(1.0, 0.0, 0.0)),
                    stop(1.0, Color::rgb(0.0, 0.0, 1.0)),
                    stop(0.5, Color::rgb(0.0, 1.0, 0.0)),
                ],
                false,
            )),
        );
        let (ops, resources) = h.encode(&[node]);
        assert!(ops.contains("0 -2 4 4 re W n /gradient6 sh\n"));
        assert!(resources.to_pdf().contains("/Shading << /gradient6 1 0 R >>"));

        let out = h.output();
        assert!(out.contains("/ShadingType 2 /Coords [0 0 4 0]"));
        assert!(out.contains(
            "/FunctionType 3 /Domain [0 1] /Functions [3 0 R 4 0 R] /Bounds [0.5] /Encode [0 1 0 1]"
        ));
        assert!(out.contains("/C0 [1 0 0] /C1 [0 1 0] /N 1"));
        assert!(out.contains("/C0 [0 1 0] /C1 [0 0 1] /N 1"));
        assert_eq!(out.matches("/FunctionType 2").count(), 2);
        assert!(h.ledger.unrecorded().is_empty());
    }

    #[test]
    fn test_radial_coords() {
        let mut h = Harness::new();
        let mut data = gradient(
            vec![stop(0.0, Color::black()), stop(1.0, Color::white())],
            true,
        );
        data.r2 = -2.0;
        h.encode(&[SceneNode::new(2, SceneKind::Gradient(data))]);
        let out = h.output();
        assert!(out.contains("/ShadingType 3 /Coords [0 0 1 4 0 2]"));
        assert!(out.contains("/Bounds [] /Encode [0 1]"));
    }

    #[test]
    fn test_shading_written_once_per_identity() {
        let mut h = Harness::new();
        let data = gradient(
            vec![stop(0.0, Color::black()), stop(1.0, Color::white())],
            false,
        );
        let node = SceneNode::new(3, SceneKind::Gradient(data));
        let (ops, _) = h.encode(&[node.clone(), node]);
        assert_eq!(ops.matches("/gradient3 sh").count(), 2);
        assert_eq!(h.output().matches("/ShadingType").count(), 1);
    }
}
