/*!
 * Text encodings used when reading and writing PDF strings.
 *
 * - WinAnsi for simple (single byte) fonts
 * - ToUnicode CMaps, parsed for extraction and generated for embedded fonts
 */

use std::collections::HashMap;
use std::fmt::Write;

/// WinAnsi code points in 0x80..=0x9F that differ from Latin-1
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '€'), (0x82, '‚'), (0x83, 'ƒ'), (0x84, '„'), (0x85, '…'), (0x86, '†'),
    (0x87, '‡'), (0x88, 'ˆ'), (0x89, '‰'), (0x8A, 'Š'), (0x8B, '‹'), (0x8C, 'Œ'),
    (0x8E, 'Ž'), (0x91, '‘'), (0x92, '’'), (0x93, '“'), (0x94, '”'), (0x95, '•'),
    (0x96, '–'), (0x97, '—'), (0x98, '˜'), (0x99, '™'), (0x9A, 'š'), (0x9B, '›'),
    (0x9C, 'œ'), (0x9E, 'ž'), (0x9F, 'Ÿ'),
];

/// Decode one WinAnsi byte
pub fn winansi_decode(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(byte)),
        b'\t' | b'\n' | b'\r' => Some(' '),
        0x80..=0x9F => WINANSI_HIGH.iter().find(|(code, _)| *code == byte).map(|(_, ch)| *ch),
        _ => None,
    }
}

/// Encode one character as a WinAnsi byte
pub fn winansi_encode(ch: char) -> Option<u8> {
    match ch as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(ch as u8),
        _ => WINANSI_HIGH.iter().find(|(_, c)| *c == ch).map(|(code, _)| *code),
    }
}

/// Code-to-text mapping read from a `/ToUnicode` stream
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
    code_bytes: Option<usize>,
}

/// Upper bound on a single bfrange expansion
const MAX_RANGE: u32 = 0xFFFF;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicodeMap {
    /// Parse the (decompressed) content of a CMap stream
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(&String::from_utf8_lossy(data));
        let mut cmap = Self::default();
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            let Token::Word(word) = token else { continue };
            match word.as_str() {
                "begincodespacerange" => {
                    if let Some(Token::Hex(lo)) = iter.next() {
                        cmap.code_bytes.get_or_insert(lo.len().max(1));
                    }
                }
                "beginbfchar" => loop {
                    match (iter.next(), iter.next()) {
                        (Some(Token::Hex(src)), Some(Token::Hex(dst))) => {
                            cmap.code_bytes.get_or_insert(src.len().max(1));
                            cmap.map.insert(be_number(&src), utf16_text(&dst));
                        }
                        _ => break,
                    }
                },
                "beginbfrange" => loop {
                    let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (iter.next(), iter.next()) else {
                        break;
                    };
                    cmap.code_bytes.get_or_insert(lo.len().max(1));
                    let (lo_code, hi_code) = (be_number(&lo), be_number(&hi));
                    if hi_code < lo_code || hi_code - lo_code > MAX_RANGE {
                        break;
                    }
                    match iter.next() {
                        Some(Token::Hex(dst)) => {
                            for offset in 0..=(hi_code - lo_code) {
                                cmap.map.insert(lo_code + offset, utf16_offset_text(&dst, offset));
                            }
                        }
                        Some(Token::ArrayStart) => {
                            let mut code = lo_code;
                            while let Some(Token::Hex(dst)) = iter.next_if(|t| matches!(t, Token::Hex(_))) {
                                cmap.map.insert(code, utf16_text(&dst));
                                code += 1;
                            }
                            iter.next_if_eq(&Token::ArrayEnd);
                        }
                        _ => break,
                    }
                },
                _ => {}
            }
        }

        cmap
    }

    /// Text for a character code
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Code width in bytes declared by the CMap, if any
    pub fn code_bytes(&self) -> Option<usize> {
        self.code_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '%' => {
                for c in chars.by_ref() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
            }
            '<' if chars.peek() == Some(&'<') => {
                chars.next();
                tokens.push(Token::Word("<<".to_string()));
            }
            '<' => {
                let mut digits = String::new();
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                    if c.is_ascii_hexdigit() {
                        digits.push(c);
                    }
                }
                tokens.push(Token::Hex(hex_bytes(&digits)));
            }
            '>' if chars.peek() == Some(&'>') => {
                chars.next();
                tokens.push(Token::Word(">>".to_string()));
            }
            '[' => tokens.push(Token::ArrayStart),
            ']' => tokens.push(Token::ArrayEnd),
            '(' => {
                let mut depth = 1;
                let mut literal = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                literal.push(escaped);
                            }
                        }
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => literal.push(c),
                    }
                }
                tokens.push(Token::Word(literal));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "<>[]()%/".contains(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    tokens
}

fn hex_bytes(digits: &str) -> Vec<u8> {
    let mut padded = digits.to_string();
    if padded.len() % 2 == 1 {
        padded.push('0');
    }
    (0..padded.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&padded[i..i + 2], 16).ok())
        .collect()
}

fn be_number(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn utf16_offset_text(bytes: &[u8], offset: u32) -> String {
    let mut units = utf16_units(bytes);
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

/// Build a ToUnicode CMap for two-byte glyph id codes
pub fn build_to_unicode(entries: &[(u16, char)]) -> Vec<u8> {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let encoded: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, encoded);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap.into_bytes()
}
