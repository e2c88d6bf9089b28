//! Font lookup and string decoding for content-stream text.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::extraction::cmap::CMap;

/// WinAnsiEncoding 0x80..=0x9F; `None` marks unassigned codes.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

pub type FontMap = HashMap<Vec<u8>, FontDecoder>;

/// Turns string operands shown with one font into text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontDecoder {
    /// Type0 (composite) fonts use two-byte codes.
    pub two_byte: bool,
    pub to_unicode: Option<CMap>,
}

impl FontDecoder {
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let two_byte = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|subtype| subtype == b"Type0");
        let to_unicode = font
            .get_deref(b"ToUnicode", doc)
            .and_then(Object::as_stream)
            .ok()
            .map(|stream| {
                stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone())
            })
            .map(|data| CMap::parse(&data))
            .filter(|cmap| !cmap.is_empty());

        Self {
            two_byte,
            to_unicode,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.two_byte {
            return bytes
                .chunks(2)
                .filter_map(|pair| {
                    let code = match pair {
                        [hi, lo] => u32::from(u16::from_be_bytes([*hi, *lo])),
                        [single] => u32::from(*single),
                        _ => return None,
                    };
                    match &self.to_unicode {
                        Some(cmap) => cmap.lookup(code).map(str::to_string),
                        None => char::from_u32(code)
                            .filter(|c| !is_dropped_control(*c))
                            .map(String::from),
                    }
                })
                .collect();
        }

        let mut out = String::with_capacity(bytes.len());
        for &byte in bytes {
            match self.to_unicode.as_ref().and_then(|c| c.lookup(u32::from(byte))) {
                Some(text) => out.push_str(text),
                None => {
                    if let Some(c) = win_ansi(byte) {
                        out.push(c);
                    }
                }
            }
        }
        out
    }
}

fn win_ansi(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[usize::from(byte - 0x80)],
        _ => Some(char::from(byte)).filter(|c| !is_dropped_control(*c)),
    }
}

/// C0 controls other than tab and newline carry no text (ligature slots, subset glyph ids).
fn is_dropped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}') && c != '\t' && c != '\n'
}

/// Decoders for every font the page can use, including fonts inherited
/// through `/Parent`, keyed by resource name.
pub fn page_fonts(doc: &Document, page_id: ObjectId) -> FontMap {
    let fonts: FontMap = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, FontDecoder::from_font(doc, font)))
        .collect();
    if fonts.is_empty() {
        debug!("Page {page_id:?} declares no fonts");
    }
    fonts
}

/// Decoders for the `/Font` entry of a resource dictionary, as carried by a Form XObject.
pub fn resource_fonts(doc: &Document, resources: &Dictionary) -> FontMap {
    let Ok(fonts) = resources.get_deref(b"Font", doc).and_then(Object::as_dict) else {
        return FontMap::new();
    };
    fonts
        .iter()
        .filter_map(|(name, obj)| {
            let font = doc.dereference(obj).ok()?.1.as_dict().ok()?;
            Some((name.clone(), FontDecoder::from_font(doc, font)))
        })
        .collect()
}
