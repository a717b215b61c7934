//! Sequential PDF file writer
//!
//! Bytes go out strictly in order. The writer tracks its own position so
//! every object's offset can be recorded in the ledger as it starts.

use std::io::Write;

use tracing::debug;

use crate::config::PdfVersion;
use crate::ledger::{ObjectLedger, ObjectNumber};
use crate::Result;

/// Format a number for PDF output: fixed precision, no trailing zeros
pub fn fmt(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.6}", value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Six matrix entries separated by spaces
pub fn fmt_matrix(m: &[f64; 6]) -> String {
    m.iter().map(|v| fmt(*v)).collect::<Vec<_>>().join(" ")
}

/// Literal string with `(`, `)` and `\` escaped. Bytes outside printable
/// ASCII are written as octal escapes.
pub fn pdf_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push(')');
    out
}

/// Name object text with delimiters and spaces removed
pub fn pdf_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "Unnamed".to_string()
    } else {
        cleaned
    }
}

/// Current time in PDF date syntax
pub fn pdf_date() -> String {
    chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string()
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Writes PDF syntax to `W` while counting bytes
pub struct PdfWriter<W: Write> {
    out: W,
    offset: u64,
    compress: bool,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(out: W, compress: bool) -> Self {
        Self {
            out,
            offset: 0,
            compress,
        }
    }

    /// Bytes written so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Version line followed by a comment of high bytes marking the file binary
    pub fn write_header(&mut self, version: PdfVersion) -> Result<()> {
        self.write_raw(format!("%PDF-{}\n", version.as_str()).as_bytes())?;
        self.write_raw(b"%\xE2\xE3\xCF\xD3\n")
    }

    fn begin_object(&mut self, ledger: &mut ObjectLedger, number: ObjectNumber) -> Result<()> {
        debug!(object = number.0, offset = self.offset, "writing object");
        ledger.record_offset(number, self.offset);
        self.write_raw(format!("{} 0 obj\n", number.0).as_bytes())
    }

    /// Write `number` as a dictionary holding `entries`
    pub fn write_dict(
        &mut self,
        ledger: &mut ObjectLedger,
        number: ObjectNumber,
        entries: &str,
    ) -> Result<()> {
        self.begin_object(ledger, number)?;
        self.write_raw(format!("<< {} >>\nendobj\n", entries).as_bytes())
    }

    /// Write `number` as a stream. `/Length` is appended to `entries`, and
    /// `/Filter /FlateDecode` too when `compressible` and compression is on.
    pub fn write_stream(
        &mut self,
        ledger: &mut ObjectLedger,
        number: ObjectNumber,
        entries: &str,
        data: &[u8],
        compressible: bool,
    ) -> Result<()> {
        let deflated;
        let (payload, filter) = if compressible && self.compress && !data.is_empty() {
            deflated = deflate(data)?;
            (deflated.as_slice(), " /Filter /FlateDecode")
        } else {
            (data, "")
        };

        self.begin_object(ledger, number)?;
        let mut dict = String::from("<< ");
        if !entries.is_empty() {
            dict.push_str(entries);
            dict.push(' ');
        }
        dict.push_str(&format!("/Length {}{} >>\nstream\n", payload.len(), filter));
        self.write_raw(dict.as_bytes())?;
        self.write_raw(payload)?;
        self.write_raw(b"\nendstream\nendobj\n")
    }

    /// Cross-reference table, trailer and end-of-file marker
    pub fn write_xref_and_trailer(
        &mut self,
        ledger: &ObjectLedger,
        root: ObjectNumber,
        info: ObjectNumber,
    ) -> Result<()> {
        let xref_offset = self.offset;
        let mut table = format!("xref\n0 {}\n", ledger.size());
        for obj in ledger.objects() {
            table.push_str(&format!(
                "{:010} {:05} {} \n",
                obj.byte_offset,
                obj.generation,
                if obj.in_use { 'n' } else { 'f' }
            ));
        }
        self.write_raw(table.as_bytes())?;
        self.write_raw(
            format!(
                "trailer\n<< /Size {} /Root {} /Info {} >>\nstartxref\n{}\n%%EOF\n",
                ledger.size(),
                root,
                info,
                xref_offset
            )
            .as_bytes(),
        )
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_numbers() {
        assert_eq!(fmt(1.0), "1");
        assert_eq!(fmt(0.5), "0.5");
        assert_eq!(fmt(72.0 / 7.0), "10.285714");
        assert_eq!(fmt(-0.0000001), "0");
        assert_eq!(fmt(f64::NAN), "0");
    }

    #[test]
    fn test_pdf_string_escapes() {
        assert_eq!(pdf_string(b"a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(pdf_string(&[0xe9]), "(\\351)");
    }

    #[test]
    fn test_pdf_name() {
        assert_eq!(pdf_name("DejaVu Sans/Bold"), "DejaVuSansBold");
        assert_eq!(pdf_name("  "), "Unnamed");
    }

    #[test]
    fn test_offsets_follow_bytes() {
        let mut ledger = ObjectLedger::new();
        let mut writer = PdfWriter::new(Vec::new(), false);
        writer.write_header(PdfVersion::V1_4).unwrap();
        let a = ledger.allocate();
        let start = writer.offset();
        writer.write_dict(&mut ledger, a, "/Type /Catalog").unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(ledger.objects()[1].byte_offset, start);
        assert!(bytes[start as usize..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn test_xref_lines_are_twenty_bytes() {
        let mut ledger = ObjectLedger::new();
        let mut writer = PdfWriter::new(Vec::new(), false);
        writer.write_header(PdfVersion::V1_4).unwrap();
        let root = ledger.allocate();
        let info = ledger.allocate();
        writer.write_dict(&mut ledger, root, "/Type /Catalog").unwrap();
        writer.write_dict(&mut ledger, info, "/Title (x)").unwrap();
        writer.write_xref_and_trailer(&ledger, root, info).unwrap();
        let bytes = writer.finish().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let xref = text.find("xref\n0 3\n").unwrap() + "xref\n0 3\n".len();
        let table = &text[xref..];
        for line in table.split_inclusive('\n').take(3) {
            assert_eq!(line.len(), 20, "bad xref line {line:?}");
        }
        assert!(table.starts_with("0000000000 65535 f \n"));
        assert!(text.contains("trailer\n<< /Size 3 /Root 1 0 R /Info 2 0 R >>"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_stream_length_and_compression() {
        let mut ledger = ObjectLedger::new();
        let n = ledger.allocate();
        let mut writer = PdfWriter::new(Vec::new(), true);
        writer
            .write_stream(&mut ledger, n, "", b"0 0 m 1 1 l S", false)
            .unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(text.contains("<< /Length 13 >>\nstream\n0 0 m 1 1 l S\nendstream"));

        let mut writer = PdfWriter::new(Vec::new(), true);
        writer
            .write_stream(&mut ledger, n, "/Subtype /Image", &[7u8; 400], true)
            .unwrap();
        let bytes = writer.finish().unwrap();
        let head = String::from_utf8_lossy(&bytes[..80]).to_string();
        assert!(head.contains("/Filter /FlateDecode"));
    }
}
