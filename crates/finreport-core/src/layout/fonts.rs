use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::types::Points;
use crate::ReportResult;

/// The standard-14 fonts used by the report. Neither is embedded; widths
/// come from the Adobe AFM metrics so line breaking matches any viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    pub const ALL: [Font; 2] = [Font::Helvetica, Font::HelveticaBold];

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name inside page dictionaries.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    /// Advance width in 1/1000 em of a WinAnsi code.
    fn glyph_width(self, code: u8) -> u16 {
        let table = match self {
            Font::Helvetica => &HELVETICA_WIDTHS,
            Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match code {
            32..=126 => table[(code - 32) as usize],
            0x92 => match self {
                Font::Helvetica => 222,
                Font::HelveticaBold => 278,
            },
            0x95 => 350,
            0x96 => 556,
            0x97 => 1000,
            _ => 556,
        }
    }
}

/// Helvetica widths for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Helvetica-Bold widths for codes 32..=126.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// Encode text for a simple font with `/WinAnsiEncoding`.
pub fn encode_win_ansi(text: &str) -> ReportResult<Vec<u8>> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => Ok(ch as u8),
            '\u{2019}' => Ok(0x92),
            '\u{2022}' => Ok(0x95),
            '\u{2013}' => Ok(0x96),
            '\u{2014}' => Ok(0x97),
            _ => Err(ReportError::UnsupportedGlyph {
                ch,
                context: format!("\"{text}\""),
            }),
        })
        .collect()
}

/// Inverse of [`encode_win_ansi`] for the code points it produces.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x92 => '\u{2019}',
            0x95 => '\u{2022}',
            0x96 => '\u{2013}',
            0x97 => '\u{2014}',
            _ => b as char,
        })
        .collect()
}

/// Width of `text` set in `font` at `size` points.
pub fn text_width(font: Font, size: Points, text: &str) -> ReportResult<Points> {
    let units: u32 = encode_win_ansi(text)?
        .into_iter()
        .map(|code| u32::from(font.glyph_width(code)))
        .sum();
    Ok(units as Points * size / 1000.0)
}

/// Greedy word wrap into lines no wider than `max_width`.
///
/// A single word wider than the line is placed on its own line; the caller
/// decides whether that is an overflow.
pub fn wrap_text(font: Font, size: Points, text: &str, max_width: Points) -> ReportResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if current.is_empty() || text_width(font, size, &candidate)? <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_widths_are_uniform() {
        let a = text_width(Font::Helvetica, 10.0, "2,847").unwrap();
        let b = text_width(Font::Helvetica, 10.0, "3,105").unwrap();
        assert_eq!(a, b);
        // 4 digits * 556 + comma 278 = 2502 units
        assert!((a - 25.02).abs() < 1e-3);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = text_width(Font::Helvetica, 11.0, "Net Income ($M)").unwrap();
        let bold = text_width(Font::HelveticaBold, 11.0, "Net Income ($M)").unwrap();
        assert!(bold > regular);
    }

    #[test]
    fn test_en_dash_round_trip() {
        let bytes = encode_win_ansi("3,300–3,500").unwrap();
        assert_eq!(bytes[5], 0x96);
        assert_eq!(decode_win_ansi(&bytes), "3,300–3,500");
    }

    #[test]
    fn test_unsupported_character() {
        let err = encode_win_ansi("profit ✅").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedGlyph { ch: '✅', .. }));
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "Third-quarter performance was particularly notable with revenue of $2,847 million";
        let lines = wrap_text(Font::Helvetica, 11.0, text, 150.0).unwrap();
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(Font::Helvetica, 11.0, line).unwrap() <= 150.0);
        }
        assert_eq!(lines.join(" "), text);
    }
}
