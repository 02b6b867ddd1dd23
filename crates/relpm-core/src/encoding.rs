//! Text encoding detection and conversion for playlist files.
//!
//! Playlists are read as UTF-8 by default. When a playlist (or the text about
//! to be written) contains anything outside printable 7-bit ASCII, the caller
//! is asked which encoding to use, since legacy M3U files are frequently
//! written in a Windows code page.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::error::{EncodingError, Result};

/// Encoding labels offered to the user when a choice is needed.
///
/// Ordered roughly by how common they are for M3U files in the wild.
pub const CANDIDATE_LABELS: &[&str] = &[
    "UTF-8",
    "windows-1252",
    "ISO-8859-15",
    "ISO-8859-2",
    "windows-1250",
    "windows-1251",
    "KOI8-R",
    "ISO-8859-7",
    "windows-1253",
    "ISO-8859-9",
    "windows-1254",
    "Shift_JIS",
    "EUC-JP",
    "EUC-KR",
    "GBK",
    "gb18030",
    "Big5",
    "UTF-16LE",
    "UTF-16BE",
];

/// Check whether text contains control or extended characters.
///
/// Returns `true` for any code point in 1–9, 11, 12, 14–31 or ≥ 127.
/// Tab, line feed and carriage return are ordinary playlist content and do
/// not count; neither does NUL.
#[must_use]
pub fn contains_non_ascii(text: &str) -> bool {
    text.chars().any(|c| {
        let c = u32::from(c);
        matches!(c, 1..=9 | 11 | 12 | 14..=31) || c >= 127
    })
}

/// A text encoding used to decode or encode playlist bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// UTF-8, the default for reading and writing.
    #[must_use]
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Look an encoding up by its WHATWG label (case-insensitive).
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| {
                EncodingError::UnknownLabel {
                    label: label.to_string(),
                }
                .into()
            })
    }

    /// Canonical name of the encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Whether text can be written in this encoding.
    ///
    /// UTF-16 can only be decoded.
    #[must_use]
    pub fn can_encode(&self) -> bool {
        self.0.output_encoding() == self.0
    }

    /// Decode bytes, replacing malformed sequences with U+FFFD.
    ///
    /// A byte order mark, if present, overrides the encoding.
    #[must_use]
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, actual, had_errors) = self.0.decode(bytes);
        if actual != self.0 {
            debug!("Byte order mark selected {} over {}", actual.name(), self.name());
        }
        if had_errors {
            warn!("Malformed {} sequences replaced while decoding", actual.name());
        }
        text
    }

    /// Encode text, failing if any character cannot be represented.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        if !self.can_encode() {
            return Err(EncodingError::UnsupportedForWriting {
                encoding: self.name().to_string(),
            }
            .into());
        }
        let (bytes, _, had_unmappable) = self.0.encode(text);
        if had_unmappable {
            return Err(EncodingError::Unmappable {
                encoding: self.name().to_string(),
            }
            .into());
        }
        Ok(bytes)
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding").field(&self.name()).finish()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encodings the user may pick from when reading.
#[must_use]
pub fn read_candidates() -> Vec<TextEncoding> {
    CANDIDATE_LABELS
        .iter()
        .filter_map(|label| TextEncoding::for_label(label).ok())
        .collect()
}

/// Encodings the user may pick from when writing.
#[must_use]
pub fn write_candidates() -> Vec<TextEncoding> {
    read_candidates()
        .into_iter()
        .filter(TextEncoding::can_encode)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_ascii_is_not_flagged() {
        assert!(!contains_non_ascii(""));
        assert!(!contains_non_ascii("#EXTINF:180,Artist Name - Song Title"));
        assert!(!contains_non_ascii("music/a b/c.mp3\t\r\n"));
        assert!(!contains_non_ascii("~!@#$%^&*()_+{}|:\"<>?`-=[]\\;',./"));
    }

    #[test]
    fn test_control_characters_are_flagged() {
        for c in (1u8..=9).chain([11, 12]).chain(14..=31) {
            let text = format!("abc{}def", char::from(c));
            assert!(contains_non_ascii(&text), "code point {c} should be flagged");
        }
        assert!(contains_non_ascii("\u{7f}"));
    }

    #[test]
    fn test_extended_characters_are_flagged() {
        assert!(contains_non_ascii("Motörhead - Ace of Spades"));
        assert!(contains_non_ascii("日本語.mp3"));
        assert!(!contains_non_ascii("\0"));
    }

    #[test]
    fn test_for_label() {
        assert_eq!(TextEncoding::for_label("utf-8").expect("known").name(), "UTF-8");
        assert_eq!(
            TextEncoding::for_label(" latin1 ").expect("known").name(),
            "windows-1252"
        );
        assert!(TextEncoding::for_label("klingon").is_err());
    }

    #[test]
    fn test_decode_latin1() {
        let enc = TextEncoding::for_label("windows-1252").expect("known");
        assert_eq!(enc.decode(b"Mot\xf6rhead"), "Motörhead");
    }

    #[test]
    fn test_encode_unmappable_fails() {
        let enc = TextEncoding::for_label("windows-1252").expect("known");
        assert_eq!(&*enc.encode("Motörhead").expect("mappable"), b"Mot\xf6rhead");
        assert!(enc.encode("日本語").is_err());
    }

    #[test]
    fn test_utf16_is_read_only() {
        let enc = TextEncoding::for_label("UTF-16LE").expect("known");
        assert!(!enc.can_encode());
        assert!(enc.encode("abc").is_err());
        assert!(read_candidates().contains(&enc));
        assert!(!write_candidates().contains(&enc));
    }

    #[test]
    fn test_default_is_utf8() {
        assert_eq!(TextEncoding::default(), TextEncoding::utf8());
        assert_eq!(TextEncoding::utf8().to_string(), "UTF-8");
    }
}
