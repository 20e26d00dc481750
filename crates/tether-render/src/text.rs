use serde::{Deserialize, Serialize};

/// Font parameters of a badge label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f64,
}

impl TextStyle {
    pub fn sized(font_size: f64) -> Self {
        Self { font_size }
    }
}

/// Size of a rendered single-line label, before badge padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// Measures badge text. Hosts with real font metrics plug in their own implementation.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Font-free estimate: every visible character is `char_width_factor * font_size` wide.
///
/// Whitespace runs count as one space, the way an SVG `<text>` element lays them out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl Default for DeterministicTextMeasurer {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
            line_height_factor: 1.2,
        }
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let font_size = style.font_size.max(1.0);
        let words = text.split_whitespace();
        let (chars, gaps) = words.fold((0usize, 0usize), |(chars, gaps), word| {
            (chars + word.chars().count(), gaps + usize::from(chars > 0))
        });

        TextMetrics {
            width: (chars + gaps) as f64 * font_size * self.char_width_factor,
            height: font_size * self.line_height_factor,
        }
    }
}
