//! Captions and text on paths
//!
//! Font sizes are in points while the scene works in inches, so text is
//! drawn inside a 1/72 scale. With `text_as_paths` the glyph outlines are
//! filled through the path encoder instead, which needs a real font
//! program; the Courier fallback is always drawn as text.

use std::io::Write;

use scene::{
    Affine, Align, CaptionData, Color, FillRule, FillStyle, ObjectId, Path, PathsData,
    TextOnPathData,
};

use super::font::{encode_win_ansi, font_for, PdfFont};
use super::path::{color_operator, path_operators};
use super::Encoder;
use crate::resources::ResourceCategory;
use crate::writer::{fmt, fmt_matrix, pdf_string};
use crate::Result;

const POINTS: f64 = 72.0;

pub(crate) fn encode_caption<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    caption: &CaptionData,
) -> Result<()> {
    if caption.lines.iter().all(|line| line.is_empty()) {
        return Ok(());
    }
    let font = font_for(enc, id, &caption.font)?;
    let to_points = Affine::scale(1.0 / POINTS, 1.0 / POINTS);

    if enc.options.text_as_paths && !font.is_fallback() {
        let mut paths = Vec::new();
        for (i, line) in caption.lines.iter().enumerate() {
            let (x, y) = line_origin(&font, caption, i, line);
            let mut pen = x;
            for c in line.chars() {
                let place = Affine::translate(pen, y);
                if let Some(outline) = font.glyph_outline(c, caption.font_size) {
                    paths.extend(outline.iter().map(|p| p.transformed(&place)));
                }
                pen += font.text_width(&c.to_string(), caption.font_size);
            }
        }
        let ops = filled(paths, caption.color);
        return enc.with_object(&to_points, |enc| {
            enc.stream.append(&ops);
            Ok(())
        });
    }

    let name = font.resource_name();
    enc.resources.add(ResourceCategory::Font, &name, font.number);

    let mut ops = color_operator(&caption.color, "rg");
    ops.push_str(&format!("BT\n/{} {} Tf\n", name, fmt(caption.font_size)));
    let mut last = (0.0, 0.0);
    for (i, line) in caption.lines.iter().enumerate() {
        let (x, y) = line_origin(&font, caption, i, line);
        ops.push_str(&format!("{} {} Td\n", fmt(x - last.0), fmt(y - last.1)));
        ops.push_str(&pdf_string(&encode_win_ansi(line)));
        ops.push_str(" Tj\n");
        last = (x, y);
    }
    ops.push_str("ET\n");
    enc.with_object(&to_points, |enc| {
        enc.stream.append(&ops);
        Ok(())
    })
}

/// Start of line `i` in points, relative to the caption origin
fn line_origin(font: &PdfFont, caption: &CaptionData, i: usize, line: &str) -> (f64, f64) {
    let width = font.text_width(line, caption.font_size);
    let x = match caption.align {
        Align::Left => 0.0,
        Align::Center => -width / 2.0,
        Align::Right => -width,
    };
    let y = -(i as f64) * caption.font_size * caption.line_spacing;
    (x, y)
}

pub(crate) fn encode_text_on_path<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    data: &TextOnPathData,
) -> Result<()> {
    if data.text.is_empty() {
        return Ok(());
    }
    let font = font_for(enc, id, &data.font)?;
    let placements = place_glyphs(&font, data);
    if placements.is_empty() {
        enc.log.warning(id, "Text does not fit on its path, skipped.");
        return Ok(());
    }

    if enc.options.text_as_paths && !font.is_fallback() {
        let mut paths = Vec::new();
        for (c, m) in &placements {
            if let Some(outline) = font.glyph_outline(*c, data.font_size) {
                paths.extend(outline.iter().map(|p| p.transformed(m)));
            }
        }
        enc.stream.append(&filled(paths, data.color));
        return Ok(());
    }

    let name = font.resource_name();
    enc.resources.add(ResourceCategory::Font, &name, font.number);

    let mut ops = color_operator(&data.color, "rg");
    ops.push_str(&format!("BT\n/{} {} Tf\n", name, fmt(data.font_size)));
    for (c, m) in &placements {
        ops.push_str(&format!(
            "{} Tm\n{} Tj\n",
            fmt_matrix(&m.0),
            pdf_string(&encode_win_ansi(&c.to_string()))
        ));
    }
    ops.push_str("ET\n");
    enc.stream.append(&ops);
    Ok(())
}

/// Each glyph with the matrix taking point-sized glyph space onto the
/// path. Stops at the first glyph that would run past the end.
fn place_glyphs(font: &PdfFont, data: &TextOnPathData) -> Vec<(char, Affine)> {
    let mut placements = Vec::new();
    let mut distance = data.start_offset;
    for c in data.text.chars() {
        let advance = font.text_width(&c.to_string(), data.font_size) / POINTS;
        if data.path.point_at_length(distance + advance).is_none() {
            break;
        }
        let Some((at, angle)) = data.path.point_at_length(distance) else {
            break;
        };
        let m = Affine::scale(1.0 / POINTS, 1.0 / POINTS)
            .concat(&Affine::rotate(angle))
            .concat(&Affine::translate(at.x, at.y));
        placements.push((c, m));
        distance += advance;
    }
    placements
}

fn filled(paths: Vec<Path>, color: Color) -> String {
    path_operators(&PathsData {
        paths,
        line: None,
        fill: Some(FillStyle {
            color,
            fill_rule: FillRule::NonZero,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::super::font::tests::{fixture_font, missing_font};
    use super::super::test_support::Harness;
    use super::*;
    use scene::{Point, SceneIndex, SceneKind, SceneNode};

    fn caption(lines: &[&str], align: Align) -> CaptionData {
        CaptionData {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            font: missing_font(),
            font_size: 10.0,
            line_spacing: 1.5,
            align,
            color: Color::rgb(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn test_caption_lines_and_escapes() {
        let mut h = Harness::new();
        let node = SceneNode::new(2, SceneKind::Caption(caption(&["a(b)", "cd"], Align::Left)));
        let (ops, resources) = h.encode(&[node]);
        assert_eq!(
            ops,
            "q\n1 0 0 1 0 0 cm\nq\n0.013889 0 0 0.013889 0 0 cm\n0 0 1 rg\nBT\n/font1 10 Tf\n\
             0 0 Td\n(a\\(b\\)) Tj\n0 -15 Td\n(cd) Tj\nET\nQ\nQ\n"
        );
        assert!(resources.to_pdf().contains("/Font << /font1 1 0 R >>"));
        // Courier fallback warning
        assert_eq!(h.log.len(), 1);
    }

    #[test]
    fn test_caption_alignment() {
        let mut h = Harness::new();
        let index = SceneIndex::new();
        let mut enc = h.encoder(&index);
        let font = font_for(&mut enc, 1, &missing_font()).unwrap();
        let right = caption(&["abcd"], Align::Right);
        assert_eq!(line_origin(&font, &right, 0, "abcd"), (-24.0, 0.0));
        let center = caption(&["ab", "abcd"], Align::Center);
        assert_eq!(line_origin(&font, &center, 1, "abcd"), (-12.0, -15.0));
    }

    #[test]
    fn test_empty_caption_draws_nothing() {
        let mut h = Harness::new();
        let node = SceneNode::new(2, SceneKind::Caption(caption(&[""], Align::Left)));
        let (ops, resources) = h.encode(&[node]);
        assert_eq!(ops, "");
        assert!(resources.is_empty());
        assert!(h.log.is_empty());
    }

    fn along_x(text: &str, length: f64) -> TextOnPathData {
        TextOnPathData {
            text: text.into(),
            font: missing_font(),
            font_size: 12.0,
            path: Path::polyline(&[Point::new(0.0, 0.0), Point::new(length, 0.0)], false),
            start_offset: 0.0,
            color: Color::black(),
        }
    }

    #[test]
    fn test_text_on_path_places_each_glyph() {
        let mut h = Harness::new();
        let index = SceneIndex::new();
        let mut enc = h.encoder(&index);
        let font = font_for(&mut enc, 1, &missing_font()).unwrap();
        // Courier at 12pt advances 7.2pt, one tenth of an inch
        let placed = place_glyphs(&font, &along_x("abcdef", 0.35));
        assert_eq!(placed.len(), 3);
        assert!((placed[2].1 .0[4] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_text_on_path_operators() {
        let mut h = Harness::new();
        let mut data = along_x("ab", 1.0);
        data.path = Path::polyline(&[Point::new(0.0, 0.0), Point::new(0.0, 1.0)], false);
        let (ops, _) = h.encode(&[SceneNode::new(3, SceneKind::TextOnPath(data))]);
        assert!(ops.contains("BT\n/font1 12 Tf\n0 0.013889 -0.013889 0 0 0 Tm\n(a) Tj\n"));
        assert!(ops.contains("0 0.013889 -0.013889 0 0 0.1 Tm\n(b) Tj\nET\n"));
    }

    #[test]
    fn test_text_past_path_end_warns() {
        let mut h = Harness::new();
        let data = along_x("abc", 0.05);
        let (ops, _) = h.encode(&[SceneNode::new(3, SceneKind::TextOnPath(data))]);
        assert_eq!(ops, "");
        assert_eq!(h.log.len(), 2);
    }

    #[test]
    fn test_text_as_paths_fills_outlines() {
        let font = fixture_font();
        let mut h = Harness::new();
        let mut data = caption(&["Hi"], Align::Left);
        data.font = font;
        let index = SceneIndex::new();
        let mut enc = h.encoder(&index);
        enc.options.text_as_paths = true;
        enc.encode(&SceneNode::new(4, SceneKind::Caption(data))).unwrap();
        let (stream, resources) = enc.finish();
        let ops = stream.as_str();
        assert!(ops.contains("0 0 1 rg\n"));
        assert!(ops.ends_with("f\nQ\nQ\n"));
        assert!(!ops.contains("BT"));
        assert!(resources.is_empty());
    }
}
