//! Standard Helvetica (base-14, not embedded) with WinAnsi encoding.

use crate::types::Pt;
use lopdf::{Dictionary, dictionary};

pub const BASE_FONT: &str = "Helvetica";

/// Advance widths in 1/1000 em, indexed by WinAnsi code.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// cp1252 code points outside Latin-1.
const WINANSI_EXTENSIONS: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinAnsiEncoded {
    pub bytes: Vec<u8>,
    /// Characters with no WinAnsi code, written as `?`.
    pub replaced: usize,
    /// Characters written as a multi-byte ASCII approximation.
    pub fallbacks: usize,
}

impl WinAnsiEncoded {
    pub fn is_lossy(&self) -> bool {
        self.replaced > 0
    }
}

pub fn encode_winansi(input: &str) -> WinAnsiEncoded {
    let mut bytes = Vec::with_capacity(input.len());
    let mut replaced = 0usize;
    let mut fallbacks = 0usize;
    for ch in input.chars() {
        match ch {
            '\u{2265}' => {
                bytes.extend_from_slice(b">=");
                fallbacks += 1;
                continue;
            }
            '\u{2264}' => {
                bytes.extend_from_slice(b"<=");
                fallbacks += 1;
                continue;
            }
            _ => {}
        }

        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            _ => match WINANSI_EXTENSIONS.iter().find(|(c, _)| *c == ch) {
                Some((_, code)) => *code,
                None => {
                    replaced += 1;
                    b'?'
                }
            },
        };
        bytes.push(byte);
    }
    WinAnsiEncoded {
        bytes,
        replaced,
        fallbacks,
    }
}

/// Inverse of [`encode_winansi`]; undefined codes decode to U+FFFD.
pub fn decode_winansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F | 0xA0..=0xFF => b as char,
            _ => WINANSI_EXTENSIONS
                .iter()
                .find(|(_, code)| *code == b)
                .map(|(c, _)| *c)
                .unwrap_or('\u{FFFD}'),
        })
        .collect()
}

/// Width of `text` set in Helvetica at `font_size`, measured on the same
/// bytes that end up in the content stream.
pub fn measure_text_width(font_size: Pt, text: &str) -> Pt {
    measure_encoded_width(font_size, &encode_winansi(text).bytes)
}

pub fn measure_encoded_width(font_size: Pt, bytes: &[u8]) -> Pt {
    let total_units: i32 = bytes
        .iter()
        .map(|b| HELVETICA_WIDTHS[*b as usize] as i32)
        .fold(0i32, i32::saturating_add);
    if total_units <= 0 {
        return Pt::ZERO;
    }
    font_size.mul_ratio(total_units, 1000)
}

/// Font dictionary for the overlay text.
pub fn font_dictionary() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => BASE_FONT,
        "Encoding" => "WinAnsiEncoding",
    }
}
