//! Page content stream builder
//!
//! Operators accumulate in memory until the page is done. Every descent
//! into a child object is bracketed with `q <matrix> cm` ... `Q`, and the
//! builder keeps the matching transform stack. A bracket that received no
//! operators is removed instead of being closed.

use scene::Affine;

use crate::writer::fmt_matrix;

#[derive(Debug, Clone, Copy)]
struct Bracket {
    start: usize,
    body: usize,
}

/// Append-only operator buffer for one page
#[derive(Debug)]
pub struct ContentStream {
    buf: String,
    ctm: Vec<Affine>,
    brackets: Vec<Bracket>,
}

impl Default for ContentStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStream {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            ctm: vec![Affine::identity()],
            brackets: Vec::new(),
        }
    }

    /// Save state and concatenate `m` onto the current transform
    pub fn begin_object(&mut self, m: &Affine) {
        let start = self.buf.len();
        self.buf.push_str("q\n");
        self.buf.push_str(&fmt_matrix(&m.0));
        self.buf.push_str(" cm\n");
        self.brackets.push(Bracket {
            start,
            body: self.buf.len(),
        });
        let current = self.ctm();
        self.ctm.push(m.concat(&current));
    }

    /// Close the innermost bracket
    pub fn end_object(&mut self) {
        let Some(bracket) = self.brackets.pop() else {
            return;
        };
        if self.buf.len() == bracket.body {
            self.buf.truncate(bracket.start);
        } else {
            self.buf.push_str("Q\n");
        }
        if self.ctm.len() > 1 {
            self.ctm.pop();
        }
    }

    pub fn append(&mut self, ops: &str) {
        self.buf.push_str(ops);
    }

    /// Transform from the current object space to the page's base space
    pub fn ctm(&self) -> Affine {
        self.ctm.last().copied().unwrap_or_default()
    }

    /// Number of open brackets
    pub fn depth(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bracket_is_removed() {
        let mut cs = ContentStream::new();
        cs.begin_object(&Affine::scale(72.0, 72.0));
        cs.begin_object(&Affine::translate(1.0, 2.0));
        cs.end_object();
        cs.end_object();
        assert!(cs.is_empty());
        assert_eq!(cs.depth(), 0);
    }

    #[test]
    fn test_bracket_with_content() {
        let mut cs = ContentStream::new();
        cs.begin_object(&Affine::translate(1.0, 2.0));
        cs.append("0 0 m\n1 1 l\nS\n");
        cs.begin_object(&Affine::identity());
        cs.end_object();
        cs.end_object();
        assert_eq!(cs.as_str(), "q\n1 0 0 1 1 2 cm\n0 0 m\n1 1 l\nS\nQ\n");
    }

    #[test]
    fn test_ctm_tracks_brackets() {
        let mut cs = ContentStream::new();
        cs.begin_object(&Affine::scale(72.0, 72.0));
        cs.begin_object(&Affine::translate(1.0, 0.0));
        assert_eq!(cs.ctm(), Affine([72.0, 0.0, 0.0, 72.0, 72.0, 0.0]));
        cs.end_object();
        assert_eq!(cs.ctm(), Affine::scale(72.0, 72.0));
        cs.end_object();
        assert!(cs.ctm().is_identity());
    }

    #[test]
    fn test_unbalanced_end_is_ignored() {
        let mut cs = ContentStream::new();
        cs.end_object();
        assert!(cs.is_empty());
    }
}
