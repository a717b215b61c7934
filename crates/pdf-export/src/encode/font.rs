//! Fonts for captions and text on paths
//!
//! Each font program is embedded whole as a simple TrueType font with
//! WinAnsi encoding, once per output file. When the program cannot be
//! read, text falls back to the standard Courier font.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use scene::{FontSpec, ObjectId, Path, PathPoint};
use ttf_parser::{Face, OutlineBuilder};

use super::Encoder;
use crate::ledger::ObjectNumber;
use crate::writer::{fmt, pdf_name};
use crate::Result;

/// Advance of every Courier glyph in text space units
const COURIER_WIDTH: u16 = 600;

const FLAG_FIXED_PITCH: u32 = 1;
const FLAG_NONSYMBOLIC: u32 = 32;
const FLAG_ITALIC: u32 = 64;

/// Characters for WinAnsi codes 0x80..=0x9F. Unassigned codes are `None`.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Character shown for WinAnsi `code`
pub(crate) fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => None,
    }
}

/// WinAnsi code for `c`, if the encoding has one
pub(crate) fn win_ansi_code(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&h| h == Some(c))
            .map(|i| 0x80 + i as u8),
    }
}

/// Text in WinAnsi bytes. Characters outside the encoding become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_code(c).unwrap_or(b'?'))
        .collect()
}

/// An embedded font and the metrics text layout needs
#[derive(Debug)]
pub(crate) struct PdfFont {
    pub number: ObjectNumber,
    first_char: u8,
    /// Advances for `first_char..`, in 1000-unit text space
    widths: Vec<u16>,
    program: Option<Arc<Vec<u8>>>,
}

impl PdfFont {
    /// Resource name, shared by every page that uses the font
    pub fn resource_name(&self) -> String {
        format!("font{}", self.number.0)
    }

    pub fn is_fallback(&self) -> bool {
        self.program.is_none()
    }

    /// Advance of WinAnsi `code` in 1000-unit text space
    pub fn width(&self, code: u8) -> u16 {
        if code < self.first_char {
            return 0;
        }
        self.widths
            .get((code - self.first_char) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Advance of `text` at `size` points
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| self.width(code) as u32)
            .sum();
        units as f64 / 1000.0 * size
    }

    /// Outline of `c` scaled to `size` points, baseline at the origin.
    /// `None` for the fallback font and for characters without a glyph.
    pub fn glyph_outline(&self, c: char, size: f64) -> Option<Vec<Path>> {
        let data = self.program.as_ref()?;
        let face = Face::parse(data, 0).ok()?;
        let glyph = face.glyph_index(c)?;
        let mut builder = GlyphPaths {
            scale: size / face.units_per_em() as f64,
            paths: Vec::new(),
            current: (0.0, 0.0),
        };
        face.outline_glyph(glyph, &mut builder)?;
        Some(builder.paths)
    }
}

/// Collects glyph contours as scene paths, quadratics raised to cubics
struct GlyphPaths {
    scale: f64,
    paths: Vec<Path>,
    current: (f64, f64),
}

impl GlyphPaths {
    fn points(&mut self) -> &mut Vec<PathPoint> {
        if self.paths.is_empty() {
            self.paths.push(Path::default());
        }
        let last = self.paths.len() - 1;
        &mut self.paths[last].points
    }

    fn scaled(&self, x: f32, y: f32) -> (f64, f64) {
        (x as f64 * self.scale, y as f64 * self.scale)
    }
}

impl OutlineBuilder for GlyphPaths {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.scaled(x, y);
        self.paths.push(Path {
            points: vec![PathPoint::vertex(x, y)],
            closed: false,
            weights: Vec::new(),
        });
        self.current = (x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.scaled(x, y);
        self.points().push(PathPoint::vertex(x, y));
        self.current = (x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (qx, qy) = self.scaled(x1, y1);
        let (x, y) = self.scaled(x, y);
        let (x0, y0) = self.current;
        let c1 = (x0 + 2.0 / 3.0 * (qx - x0), y0 + 2.0 / 3.0 * (qy - y0));
        let c2 = (x + 2.0 / 3.0 * (qx - x), y + 2.0 / 3.0 * (qy - y));
        let points = self.points();
        points.push(PathPoint::handle_out(c1.0, c1.1));
        points.push(PathPoint::handle_in(c2.0, c2.1));
        points.push(PathPoint::vertex(x, y));
        self.current = (x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c1 = self.scaled(x1, y1);
        let c2 = self.scaled(x2, y2);
        let (x, y) = self.scaled(x, y);
        let points = self.points();
        points.push(PathPoint::handle_out(c1.0, c1.1));
        points.push(PathPoint::handle_in(c2.0, c2.1));
        points.push(PathPoint::vertex(x, y));
        self.current = (x, y);
    }

    fn close(&mut self) {
        if let Some(path) = self.paths.last_mut() {
            path.closed = true;
        }
    }
}

/// Fonts embedded in the current file, by font key
#[derive(Debug, Default)]
pub(crate) struct FontRegistry {
    fonts: HashMap<String, Rc<PdfFont>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }
}

/// The font for `spec`, embedding it on first use in this file
pub(crate) fn font_for<W: Write>(
    enc: &mut Encoder<'_, W>,
    id: ObjectId,
    spec: &FontSpec,
) -> Result<Rc<PdfFont>> {
    let key = spec.key();
    if let Some(font) = enc.fonts.fonts.get(&key) {
        return Ok(font.clone());
    }

    let embedded = match spec.load() {
        Ok(data) => match embed_truetype(enc, spec, data)? {
            Embedding::Embedded(font) => Some(font),
            Embedding::Unusable(reason) => {
                enc.log
                    .warning(id, format!("Font {} {}, using Courier.", key, reason));
                None
            }
        },
        Err(e) => {
            enc.log
                .warning(id, format!("Font {} not found ({}), using Courier.", key, e));
            None
        }
    };
    let font = match embedded {
        Some(font) => Rc::new(font),
        None => courier(enc)?,
    };
    enc.fonts.fonts.insert(key, font.clone());
    Ok(font)
}

/// The shared Courier fallback, written on first use
fn courier<W: Write>(enc: &mut Encoder<'_, W>) -> Result<Rc<PdfFont>> {
    const KEY: &str = "Courier";
    if let Some(font) = enc.fonts.fonts.get(KEY) {
        return Ok(font.clone());
    }
    let number = enc.ledger.allocate();
    enc.writer.write_dict(
        enc.ledger,
        number,
        "/Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding",
    )?;
    let font = Rc::new(PdfFont {
        number,
        first_char: 32,
        widths: vec![COURIER_WIDTH; 224],
        program: None,
    });
    enc.fonts.fonts.insert(KEY.to_string(), font.clone());
    Ok(font)
}

enum Embedding {
    Embedded(PdfFont),
    /// Nothing was written; the reason completes "Font <key> ..."
    Unusable(&'static str),
}

/// Write the font program, its descriptor and the font dictionary
fn embed_truetype<W: Write>(
    enc: &mut Encoder<'_, W>,
    spec: &FontSpec,
    data: Arc<Vec<u8>>,
) -> Result<Embedding> {
    let Ok(face) = Face::parse(&data, 0) else {
        return Ok(Embedding::Unusable("is not a TrueType font"));
    };
    let upem = face.units_per_em().max(1) as f64;
    let to_text = |v: f64| (v * 1000.0 / upem).round();

    let mut widths: Vec<(u8, u16)> = Vec::new();
    for code in 32..=255u8 {
        let Some(glyph) = win_ansi_char(code).and_then(|c| face.glyph_index(c)) else {
            continue;
        };
        let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f64;
        widths.push((code, to_text(advance) as u16));
    }
    let (Some(&(first, _)), Some(&(last, _))) = (widths.first(), widths.last()) else {
        return Ok(Embedding::Unusable("has no glyphs for WinAnsi characters"));
    };
    let mut table = vec![0u16; (last - first) as usize + 1];
    for (code, width) in &widths {
        table[(code - first) as usize] = *width;
    }

    let italic = spec.is_italic() || face.is_italic();
    let mut flags = FLAG_NONSYMBOLIC;
    if face.is_monospaced() {
        flags |= FLAG_FIXED_PITCH;
    }
    if italic {
        flags |= FLAG_ITALIC;
    }
    let bbox = face.global_bounding_box();
    let ascent = to_text(face.ascender() as f64);
    let descent = to_text(face.descender() as f64);
    let cap_height = face
        .capital_height()
        .map(|h| to_text(h as f64))
        .unwrap_or(ascent);
    let base_font = pdf_name(&format!("{}-{}", spec.family, spec.style).replace(' ', ""));

    let file = enc.ledger.allocate();
    let descriptor = enc.ledger.allocate();
    let number = enc.ledger.allocate();

    enc.writer.write_stream(
        enc.ledger,
        file,
        &format!("/Length1 {}", data.len()),
        &data,
        true,
    )?;
    enc.writer.write_dict(
        enc.ledger,
        descriptor,
        &format!(
            "/Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] \
             /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 {}",
            base_font,
            flags,
            fmt(to_text(bbox.x_min as f64)),
            fmt(to_text(bbox.y_min as f64)),
            fmt(to_text(bbox.x_max as f64)),
            fmt(to_text(bbox.y_max as f64)),
            if italic { -12 } else { 0 },
            fmt(ascent),
            fmt(descent),
            fmt(cap_height),
            file
        ),
    )?;
    let width_list: Vec<String> = table.iter().map(|w| w.to_string()).collect();
    enc.writer.write_dict(
        enc.ledger,
        number,
        &format!(
            "/Type /Font /Subtype /TrueType /BaseFont /{} /FirstChar {} /LastChar {} \
             /Widths [{}] /FontDescriptor {} /Encoding /WinAnsiEncoding",
            base_font,
            first,
            last,
            width_list.join(" "),
            descriptor
        ),
    )?;

    Ok(Embedding::Embedded(PdfFont {
        number,
        first_char: first,
        widths: table,
        program: Some(data),
    }))
}
