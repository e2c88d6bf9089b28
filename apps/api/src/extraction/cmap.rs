//! ToUnicode CMap parsing: the `bfchar` and `bfrange` sections that map
//! character codes to Unicode text.

use std::collections::HashMap;

/// Ranges wider than this are treated as corrupt and skipped.
const MAX_RANGE_LEN: u32 = 0xFFFF;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    BfChar,
    BfRange,
}

/// Code-to-text table from a ToUnicode stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    map: HashMap<u32, String>,
}

impl CMap {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = CMap::default();
        let mut section = Section::None;
        let mut i = 0;

        while i < tokens.len() {
            if let Token::Word(word) = &tokens[i] {
                section = match word.as_str() {
                    "beginbfchar" => Section::BfChar,
                    "beginbfrange" => Section::BfRange,
                    "endbfchar" | "endbfrange" => Section::None,
                    _ => section,
                };
                i += 1;
                continue;
            }

            match section {
                Section::BfChar => {
                    if let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map.insert(code_of(src), utf16be(dst));
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                Section::BfRange => i += cmap.read_range(&tokens[i..]),
                Section::None => i += 1,
            }
        }

        cmap
    }

    /// Consumes one `<lo> <hi> dst` entry and returns the number of tokens used.
    fn read_range(&mut self, tokens: &[Token]) -> usize {
        let (lo, hi) = match (tokens.first(), tokens.get(1)) {
            (Some(Token::Hex(lo)), Some(Token::Hex(hi))) => (code_of(lo), code_of(hi)),
            _ => return 1,
        };
        if hi < lo || hi - lo > MAX_RANGE_LEN {
            return 2;
        }

        match tokens.get(2) {
            Some(Token::Hex(dst)) => {
                let mut units = to_units(dst);
                let base = units.last().copied().unwrap_or(0);
                for (offset, code) in (lo..=hi).enumerate() {
                    if let Some(last) = units.last_mut() {
                        *last = base.wrapping_add(offset as u16);
                    }
                    self.map.insert(code, String::from_utf16_lossy(&units));
                }
                3
            }
            Some(Token::ArrayStart) => {
                let mut used = 3;
                let mut code = lo;
                for token in &tokens[3..] {
                    used += 1;
                    match token {
                        Token::Hex(dst) => {
                            if code <= hi {
                                self.map.insert(code, utf16be(dst));
                            }
                            code = code.saturating_add(1);
                        }
                        Token::ArrayEnd => break,
                        _ => {}
                    }
                }
                used
            }
            _ => 2,
        }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn to_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&to_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                i += 1;
                let mut digits = Vec::new();
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Hex(decode_hex(&digits)));
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => i = skip_literal(data, i),
            _ if b.is_ascii_whitespace() || b == b'>' || b == b')' => i += 1,
            _ => {
                let start = i;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                } else {
                    tokens.push(Token::Word(
                        String::from_utf8_lossy(&data[start..i]).into_owned(),
                    ));
                }
            }
        }
    }

    tokens
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b"<>[]()/%{}".contains(&b)
}

/// Returns the index just past the literal string opening at `start`.
fn skip_literal(data: &[u8], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    data.len()
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibble = |d: u8| match d {
        b'0'..=b'9' => d - b'0',
        b'a'..=b'f' => d - b'a' + 10,
        b'A'..=b'F' => d - b'A' + 10,
        _ => 0,
    };
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (nibble(*hi) << 4) | nibble(*lo),
            [hi] => nibble(*hi) << 4,
            _ => 0,
        })
        .collect()
}
