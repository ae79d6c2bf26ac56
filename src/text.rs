use std::collections::HashMap;

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::StrataError;
use crate::project::BasicText;

/// Text alignment options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl TextAlignment {
    pub fn label(&self) -> &'static str {
        match self {
            TextAlignment::Left => "Left",
            TextAlignment::Center => "Center",
            TextAlignment::Right => "Right",
        }
    }
}

/// Caller-supplied fonts keyed by family name. The engine never enumerates
/// system fonts; hosts register the font bytes they ship.
#[derive(Default)]
pub struct FontStore {
    fonts: HashMap<String, FontArc>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: impl Into<String>, bytes: Vec<u8>) -> Result<(), StrataError> {
        let family = family.into();
        let font =
            FontArc::try_from_vec(bytes).map_err(|_| StrataError::InvalidFont(family.clone()))?;
        self.fonts.insert(family, font);
        Ok(())
    }

    pub fn get(&self, family: &str) -> Result<&FontArc, StrataError> {
        self.fonts
            .get(family)
            .ok_or_else(|| StrataError::UnknownFont(family.to_string()))
    }
}

/// Greedy word wrap against a caller-supplied measure function.
///
/// Words are packed onto a line until the next word would exceed `max_width`;
/// a word is broken mid-word only when it exceeds the width on a line of its
/// own. Explicit newlines always break.
///
/// Split out from the glyph code so wrapping is testable without font data.
pub fn wrap_lines_with(measure: &dyn Fn(&str) -> f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split(' ').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width || current.is_empty() && measure(word) <= max_width
            {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // Word alone fits on the fresh line?
            if measure(word) <= max_width {
                current = word.to_string();
                continue;
            }
            // Single word wider than the layer: break mid-word.
            let mut piece = String::new();
            for ch in word.chars() {
                piece.push(ch);
                if measure(&piece) > max_width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(ch);
                }
            }
            current = piece;
        }
        lines.push(current);
    }

    lines
}

/// Advance width of a line of text including kerning and letter spacing.
fn measure_line(font: &FontArc, line: &str, font_size: f32, letter_spacing: f32) -> f32 {
    let scaled = font.as_scaled(font_size);
    let mut cursor = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            cursor += scaled.kern(p, id);
        }
        cursor += scaled.h_advance(id) + letter_spacing;
        prev = Some(id);
    }
    cursor
}

/// Rasterize a text layer's content into an RGBA buffer of the layer size.
///
/// Lines are wrapped greedily at `width`; each wrapped line advances the
/// baseline by `line_height × font_size`; alignment positions each line
/// inside the layer box. Output pixels outside the box are clipped.
pub fn rasterize(font: &FontArc, text: &BasicText, width: u32, height: u32) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 || text.content.is_empty() {
        return out;
    }

    let scaled = font.as_scaled(text.font_size);
    let ascent = scaled.ascent();
    let line_advance = text.line_height * text.font_size;

    let measure =
        |line: &str| -> f32 { measure_line(font, line, text.font_size, text.letter_spacing) };
    let lines = wrap_lines_with(&measure, &text.content, width as f32);

    let mut coverage = vec![0.0f32; width as usize * height as usize];

    for (line_idx, line) in lines.iter().enumerate() {
        let line_w = measure(line);
        let baseline_y = ascent + line_idx as f32 * line_advance;
        let start_x = match text.alignment {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => (width as f32 - line_w) * 0.5,
            TextAlignment::Right => width as f32 - line_w,
        };

        let mut cursor = start_x;
        let mut prev: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                cursor += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(text.font_size, point(cursor, baseline_y));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, cov| {
                    let mut cx = bounds.min.x + px as f32;
                    let cy = bounds.min.y + py as f32;
                    if text.italic {
                        cx += (baseline_y - cy) * 0.2;
                    }
                    stamp(&mut coverage, width, height, cx, cy, cov);
                    if text.bold {
                        stamp(&mut coverage, width, height, cx + 1.0, cy, cov);
                    }
                });
            }
            cursor += scaled.h_advance(id) + text.letter_spacing;
            prev = Some(id);
        }
    }

    let [r, g, b, a] = text.color;
    for (i, cov) in coverage.iter().enumerate() {
        if *cov > 0.001 {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            let alpha = (a as f32 * cov).round().min(255.0) as u8;
            out.put_pixel(x, y, Rgba([r, g, b, alpha]));
        }
    }
    out
}

#[inline]
fn stamp(coverage: &mut [f32], width: u32, height: u32, cx: f32, cy: f32, cov: f32) {
    let ix = cx.round() as i32;
    let iy = cy.round() as i32;
    if ix >= 0 && iy >= 0 && (ix as u32) < width && (iy as u32) < height {
        let idx = iy as usize * width as usize + ix as usize;
        coverage[idx] = coverage[idx].max(cov);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 px per character, like a monospace terminal.
    fn mono(line: &str) -> f32 {
        line.chars().count() as f32 * 10.0
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = wrap_lines_with(&mono, "hello", 100.0);
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn words_wrap_greedily() {
        // "aaa bbb" is 70 px; limit 60 forces the second word down.
        let lines = wrap_lines_with(&mono, "aaa bbb ccc", 70.0);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn explicit_newlines_always_break() {
        let lines = wrap_lines_with(&mono, "one\n\ntwo", 1000.0);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn oversized_word_breaks_mid_word() {
        let lines = wrap_lines_with(&mono, "abcdefgh", 30.0);
        assert_eq!(lines, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn oversized_word_after_other_words() {
        let lines = wrap_lines_with(&mono, "ab cdefgh", 40.0);
        assert_eq!(lines, vec!["ab", "cdef", "gh"]);
    }

    #[test]
    fn words_never_broken_when_they_fit() {
        let lines = wrap_lines_with(&mono, "aa bb cc dd", 50.0);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }
}
