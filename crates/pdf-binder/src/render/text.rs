//! Text drawing with the standard Helvetica fonts
//!
//! Generated text uses the non-embedded Type1 Helvetica faces with
//! WinAnsiEncoding, so widths come from the Adobe font metrics below and
//! strings are encoded to single bytes before they go into a content stream.

use super::matrix::Matrix;
use crate::constants::{FONT_BOLD, FONT_REGULAR};
use lopdf::content::Operation;
use lopdf::{Dictionary, Object, StringFormat};

/// Ellipsis appended to truncated text
const ELLIPSIS: char = '…';

/// Width used for characters outside the metrics tables
const FALLBACK_WIDTH: u16 = 556;

/// Font face used for generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Name under which the font is registered in page resources
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => FONT_REGULAR,
            Font::Bold => FONT_BOLD,
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    /// Font dictionary for the output document
    pub fn dictionary(self) -> Dictionary {
        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        font_dict.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font_dict
    }

    fn ascii_widths(self) -> &'static [u16; 95] {
        match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

// Advance widths for 0x20..=0x7E, in 1/1000 em
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width of a single character in 1/1000 em
fn char_width(c: char, font: Font) -> u16 {
    let bold = font == Font::Bold;
    match c {
        ' '..='~' => font.ascii_widths()[c as usize - 0x20],
        'Æ' => 1000,
        'æ' => 889,
        'Ø' | 'Ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' => 778,
        'ø' => 611,
        'Å' | 'Ä' | 'Á' | 'À' | 'Â' | 'Ã' => {
            if bold {
                722
            } else {
                667
            }
        }
        'É' | 'È' | 'Ê' | 'Ë' => 667,
        'Ü' | 'Ú' | 'Ù' | 'Û' => 722,
        'ö' | 'ó' | 'ò' | 'ô' | 'õ' | 'ü' | 'ú' | 'ù' | 'û' => {
            if bold {
                611
            } else {
                556
            }
        }
        'ß' => 611,
        '…' | '—' | '‰' => 1000,
        '–' | '•' => 556,
        '‘' | '’' => {
            if bold {
                278
            } else {
                222
            }
        }
        '°' => 400,
        '\u{a0}' => 278,
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` in points at `size`
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c, font) as u32).sum();
    units as f32 * size / 1000.0
}

/// Cut `text` so that it fits within `max_width`, ending it with an ellipsis.
/// Text that already fits is returned unchanged.
pub fn truncate_to_width(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }

    let budget = max_width - text_width(&ELLIPSIS.to_string(), font, size);
    let mut used = 0.0;
    let mut truncated = String::new();
    for c in text.chars() {
        let w = char_width(c, font) as f32 * size / 1000.0;
        if used + w > budget {
            break;
        }
        used += w;
        truncated.push(c);
    }
    let kept = truncated.trim_end().len();
    truncated.truncate(kept);
    truncated.push(ELLIPSIS);
    truncated
}

/// Encode text as WinAnsiEncoding bytes; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// A PDF text string (document info, form values): plain ASCII stays
/// literal, anything else is written as UTF-16BE with a byte order mark.
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Operations drawing `text` with its baseline origin mapped through `matrix`
pub fn show_text(font: Font, size: f32, matrix: Matrix, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name().as_bytes().to_vec()),
                Object::Real(size),
            ],
        ),
        Operation::new("Tm", matrix.operands()),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_font_metrics() {
        // "Page" in Helvetica: 667 + 556 + 556 + 556
        assert!((text_width("Page", Font::Regular, 10.0) - 23.35).abs() < 1e-3);
        assert!(text_width("Unit", Font::Bold, 12.0) > text_width("Unit", Font::Regular, 12.0));
        assert_eq!(text_width("", Font::Regular, 12.0), 0.0);
    }

    #[test]
    fn danish_letters_have_widths() {
        assert!((text_width("Æ", Font::Regular, 1000.0) - 1000.0).abs() < 1e-3);
        assert!((text_width("æ", Font::Regular, 1000.0) - 889.0).abs() < 1e-3);
        assert!((text_width("å", Font::Bold, 1000.0) - 556.0).abs() < 1e-3);
    }

    #[test]
    fn truncation_fits_and_marks_cut() {
        let title = "A very long section title that cannot possibly fit on the row";
        let cut = truncate_to_width(title, Font::Regular, 12.0, 100.0);
        assert!(cut.ends_with('…'));
        assert!(text_width(&cut, Font::Regular, 12.0) <= 100.0);
        assert_eq!(truncate_to_width("Short", Font::Regular, 12.0, 100.0), "Short");
    }

    #[test]
    fn win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Æøå"), vec![0xC6, 0xF8, 0xE5]);
        assert_eq!(encode_win_ansi("a…b"), vec![b'a', 0x85, b'b']);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn text_strings_use_utf16_for_non_ascii() {
        assert!(matches!(
            text_string("Plan"),
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Plan"
        ));
        match text_string("Ø") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x00, 0xD8]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
