//! Colors and drawing styles

use serde::{Deserialize, Serialize};

fn opaque() -> f64 {
    1.0
}

/// RGBA color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

impl Color {
    /// Create an opaque RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn is_white(&self) -> bool {
        self.r >= 1.0 && self.g >= 1.0 && self.b >= 1.0
    }

    /// Channels quantized to 8 bits
    pub fn to_rgb8(&self) -> [u8; 3] {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Line cap style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapStyle {
    #[default]
    Butt,
    Round,
    Projecting,
}

/// Line join style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Winding rule used to fill a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Stroke style of a path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineStyle {
    #[serde(default)]
    pub color: Color,
    pub width: f64,
    #[serde(default)]
    pub cap: CapStyle,
    #[serde(default)]
    pub join: JoinStyle,
    #[serde(default)]
    pub dashed: bool,
}

impl LineStyle {
    pub fn has_stroke(&self) -> bool {
        self.width > 0.0 && self.color.a > 0.0
    }
}

/// Fill style of a path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FillStyle {
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub fill_rule: FillRule,
}

impl FillStyle {
    pub fn has_fill(&self) -> bool {
        self.color.a > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_quantization() {
        assert_eq!(Color::rgb(1.0, 0.5, 0.0).to_rgb8(), [255, 128, 0]);
        assert_eq!(Color::rgb(2.0, -1.0, 0.2).to_rgb8(), [255, 0, 51]);
    }

    #[test]
    fn test_styles_without_paint() {
        let line = LineStyle {
            color: Color::black(),
            width: 0.0,
            cap: CapStyle::Butt,
            join: JoinStyle::Miter,
            dashed: false,
        };
        assert!(!line.has_stroke());

        let fill = FillStyle {
            color: Color {
                a: 0.0,
                ..Color::white()
            },
            fill_rule: FillRule::NonZero,
        };
        assert!(!fill.has_fill());
    }

    #[test]
    fn test_color_alpha_defaults_to_opaque() {
        let color: Color = serde_json::from_str(r#"{"r":1,"g":0,"b":0}"#).unwrap();
        assert_eq!(color.a, 1.0);
    }
}
