//! Path encoding
//!
//! Plain paths map straight onto `m`/`l`/`c`/`h` and one painting operator.
//! Variable-width strokes have no PDF operator, so weighted path sets are
//! drawn as two fills: the center line interior in the fill color, then the
//! stroke outline in the stroke color with the even-odd rule.

use std::io::Write;

use scene::{CapStyle, Color, FillRule, JoinStyle, LineStyle, Path, PathsData, Point, Segment};

use super::Encoder;
use crate::writer::fmt;
use crate::Result;

pub(crate) fn encode_paths<W: Write>(enc: &mut Encoder<'_, W>, data: &PathsData) -> Result<()> {
    enc.stream.append(&path_operators(data));
    Ok(())
}

/// Operators drawing `data`, empty when nothing would be painted
pub(crate) fn path_operators(data: &PathsData) -> String {
    let fill = data.fill.as_ref().filter(|f| f.has_fill());
    let line = data.line.as_ref().filter(|l| l.has_stroke());
    if fill.is_none() && line.is_none() {
        return String::new();
    }
    if data.is_weighted() {
        weighted_operators(data, fill.map(|f| (f.color, f.fill_rule)), line)
    } else {
        plain_operators(data, fill.map(|f| (f.color, f.fill_rule)), line)
    }
}

fn plain_operators(
    data: &PathsData,
    fill: Option<(Color, FillRule)>,
    line: Option<&LineStyle>,
) -> String {
    let mut geometry = String::new();
    for path in &data.paths {
        append_path(&mut geometry, path);
    }
    if geometry.is_empty() {
        return geometry;
    }

    let mut ops = String::new();
    if let Some(line) = line {
        ops.push_str(&line_style_operators(line));
    }
    if let Some((color, _)) = fill {
        ops.push_str(&color_operator(&color, "rg"));
    }
    ops.push_str(&geometry);

    let even_odd = matches!(fill, Some((_, FillRule::EvenOdd)));
    let paint = match (fill.is_some(), line.is_some(), even_odd) {
        (true, true, false) => "B",
        (true, true, true) => "B*",
        (true, false, false) => "f",
        (true, false, true) => "f*",
        _ => "S",
    };
    ops.push_str(paint);
    ops.push('\n');
    ops
}

fn weighted_operators(
    data: &PathsData,
    fill: Option<(Color, FillRule)>,
    line: Option<&LineStyle>,
) -> String {
    let line_width = line.map_or(0.0, |l| l.width);
    let mut ops = String::new();

    if let Some((color, rule)) = fill {
        let mut geometry = String::new();
        for path in &data.paths {
            if path.is_weighted() {
                append_polygon(&mut geometry, &path.center_polygon(line_width));
            } else {
                append_path(&mut geometry, path);
            }
        }
        if !geometry.is_empty() {
            ops.push_str(&color_operator(&color, "rg"));
            ops.push_str(&geometry);
            ops.push_str(match rule {
                FillRule::NonZero => "f\n",
                FillRule::EvenOdd => "f*\n",
            });
        }
    }

    if let Some(line) = line {
        let mut geometry = String::new();
        for path in &data.paths {
            for ring in path.outline_polygons(line.width) {
                append_polygon(&mut geometry, &ring);
            }
        }
        if !geometry.is_empty() {
            ops.push_str(&color_operator(&line.color, "rg"));
            ops.push_str(&geometry);
            ops.push_str("f*\n");
        }
    }
    ops
}

/// `rg` (fill) or `RG` (stroke) for `color`
pub(crate) fn color_operator(color: &Color, op: &str) -> String {
    format!("{} {} {} {}\n", fmt(color.r), fmt(color.g), fmt(color.b), op)
}

fn line_style_operators(line: &LineStyle) -> String {
    let cap = match line.cap {
        CapStyle::Butt => 0,
        CapStyle::Round => 1,
        CapStyle::Projecting => 2,
    };
    let join = match line.join {
        JoinStyle::Miter => 0,
        JoinStyle::Round => 1,
        JoinStyle::Bevel => 2,
    };
    let dash = if line.dashed {
        format!("[{} {}] 0 d", fmt(line.width), fmt(2.0 * line.width))
    } else {
        "[] 0 d".to_string()
    };
    format!(
        "{} J\n{} j\n{} w\n{}\n{}",
        cap,
        join,
        fmt(line.width),
        dash,
        color_operator(&line.color, "RG")
    )
}

/// Construction operators for one subpath
pub(crate) fn append_path(out: &mut String, path: &Path) {
    let segments = path.segments();
    let Some(first) = segments.first() else {
        return;
    };
    let start = first.start();
    out.push_str(&format!("{} {} m\n", fmt(start.x), fmt(start.y)));
    for segment in &segments {
        match segment {
            Segment::Line { to, .. } => {
                out.push_str(&format!("{} {} l\n", fmt(to.x), fmt(to.y)));
            }
            Segment::Cubic { c1, c2, to, .. } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt(c1.x),
                    fmt(c1.y),
                    fmt(c2.x),
                    fmt(c2.y),
                    fmt(to.x),
                    fmt(to.y)
                ));
            }
        }
    }
    if path.closed {
        out.push_str("h\n");
    }
}

fn append_polygon(out: &mut String, points: &[Point]) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    if rest.is_empty() {
        return;
    }
    out.push_str(&format!("{} {} m\n", fmt(first.x), fmt(first.y)));
    for p in rest {
        out.push_str(&format!("{} {} l\n", fmt(p.x), fmt(p.y)));
    }
    out.push_str("h\n");
}
