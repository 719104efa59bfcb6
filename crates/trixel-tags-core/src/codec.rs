//! # Key Codec
//!
//! Deterministic, injective encoding of `(id, tag)` pairs into the two
//! index keys, and of a tag into its count table key.
//!
//! ```text
//! Forward:  id ++ quote(tag)      "42" + "\"red\""  => 42"red"
//! Reverse:  quote(tag) ++ id      "\"red\"" + "42"  => "red"42
//! Count:    tag                   red
//! ```
//!
//! `quote` produces a C-style double-quoted literal: the tag is wrapped in
//! `"` and every embedded `"`, `\` and non-printable character is
//! backslash-escaped (`\n`, `\x1b`, `\u200b`, ...). The quoted
//! form therefore starts and ends with the delimiter and never contains an
//! unescaped delimiter in between, which makes it self-delimiting. Ids are
//! required to be non-empty and free of `"`, so the boundary between the
//! id and the quoted tag is always the first `"` of a forward key and the
//! first unescaped closing `"` of a reverse key.

use crate::TagError;
use std::fmt::Write as _;
use unicode_general_category::{GeneralCategory, get_general_category};

/// Delimiter wrapped around every encoded tag.
pub const QUOTE: u8 = b'"';

// =============================================================================
// ID PRECONDITION
// =============================================================================

/// Reject ids that would make key boundaries ambiguous.
pub fn check_id(id: &str) -> Result<(), TagError> {
    if id.is_empty() || id.as_bytes().contains(&QUOTE) {
        return Err(TagError::InvalidId(id.to_string()));
    }
    Ok(())
}

// =============================================================================
// KEY CONSTRUCTION
// =============================================================================

/// Forward index key: raw id bytes followed by the quoted tag.
pub fn encode_forward(id: &str, tag: &str) -> Vec<u8> {
    let quoted = quote(tag);
    let mut key = Vec::with_capacity(id.len() + quoted.len());
    key.extend_from_slice(id.as_bytes());
    key.extend_from_slice(quoted.as_bytes());
    key
}

/// Reverse index key: quoted tag followed by raw id bytes.
pub fn encode_reverse(id: &str, tag: &str) -> Vec<u8> {
    let mut key = quote(tag).into_bytes();
    key.extend_from_slice(id.as_bytes());
    key
}

/// Count table key.
pub fn encode_count(tag: &str) -> &[u8] {
    tag.as_bytes()
}

/// Prefix shared by every forward key of `id`: the id and the opening quote.
pub fn forward_prefix(id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(id.len() + 1);
    prefix.extend_from_slice(id.as_bytes());
    prefix.push(QUOTE);
    prefix
}

/// Prefix shared by every reverse key of `tag`: the complete quoted tag.
pub fn reverse_prefix(tag: &str) -> Vec<u8> {
    quote(tag).into_bytes()
}

// =============================================================================
// KEY DECODING
// =============================================================================

/// Recover the tag from a forward key whose id is `id_len` bytes long.
pub fn decode_forward_suffix(key: &[u8], id_len: usize) -> Result<String, TagError> {
    let quoted = key
        .get(id_len..)
        .ok_or_else(|| TagError::Codec(format!("forward key shorter than id ({id_len} bytes)")))?;
    unquote(quoted)
}

/// Recover the id from a reverse key whose quoted tag is `quoted_len` bytes long.
pub fn decode_reverse_prefix(key: &[u8], quoted_len: usize) -> Result<String, TagError> {
    let id = key.get(quoted_len..).ok_or_else(|| {
        TagError::Codec(format!("reverse key shorter than tag ({quoted_len} bytes)"))
    })?;
    if id.is_empty() {
        return Err(TagError::Codec("reverse key has no id".to_string()));
    }
    String::from_utf8(id.to_vec()).map_err(|e| TagError::Codec(format!("id is not UTF-8: {e}")))
}

/// Split a forward key into `(id, tag)` without knowing the id length.
pub fn split_forward(key: &[u8]) -> Result<(String, String), TagError> {
    let id_len = key
        .iter()
        .position(|&b| b == QUOTE)
        .ok_or_else(|| TagError::Codec("forward key has no quoted tag".to_string()))?;
    if id_len == 0 {
        return Err(TagError::Codec("forward key has no id".to_string()));
    }
    let id = String::from_utf8(key[..id_len].to_vec())
        .map_err(|e| TagError::Codec(format!("id is not UTF-8: {e}")))?;
    let tag = decode_forward_suffix(key, id_len)?;
    Ok((id, tag))
}

/// Split a reverse key into `(id, tag)` by locating the closing quote.
pub fn split_reverse(key: &[u8]) -> Result<(String, String), TagError> {
    let quoted_len = quoted_len(key)?;
    let tag = unquote(&key[..quoted_len])?;
    let id = decode_reverse_prefix(key, quoted_len)?;
    Ok((id, tag))
}

/// Length of the quoted string at the start of `bytes`, delimiters included.
fn quoted_len(bytes: &[u8]) -> Result<usize, TagError> {
    if bytes.first() != Some(&QUOTE) {
        return Err(TagError::Codec("key does not start with a quote".to_string()));
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            QUOTE => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(TagError::Codec("unterminated quoted tag".to_string()))
}

// =============================================================================
// QUOTING
// =============================================================================

/// Quote `s` as a double-quoted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{7F}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x1_0000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Whether `c` is written raw inside a quoted tag.
///
/// Letters, marks, numbers, punctuation and symbols are printable, and so
/// is the ASCII space. Other separators, controls, format characters,
/// private-use and unassigned code points are escaped.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// Parse a double-quoted string literal back into its text.
pub fn unquote(quoted: &[u8]) -> Result<String, TagError> {
    let inner = quoted
        .strip_prefix(b"\"")
        .and_then(|rest| rest.strip_suffix(b"\""))
        .ok_or_else(|| TagError::Codec(format!("not a quoted string: {}", lossy(quoted))))?;

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        match inner[i] {
            QUOTE => return Err(codec_err("unescaped quote", quoted)),
            b'\n' => return Err(codec_err("raw newline", quoted)),
            b'\\' => {
                i = unescape(inner, i + 1, &mut out)
                    .ok_or_else(|| codec_err("bad escape", quoted))?;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| codec_err("not UTF-8 after unescaping", quoted))
}

/// Decode one escape whose letter sits at `at`; returns the index after it.
fn unescape(inner: &[u8], at: usize, out: &mut Vec<u8>) -> Option<usize> {
    let simple = match *inner.get(at)? {
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0C),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(0x0B),
        b'\\' => Some(b'\\'),
        b'"' => Some(b'"'),
        _ => None,
    };
    if let Some(b) = simple {
        out.push(b);
        return Some(at + 1);
    }

    match inner[at] {
        b'x' => {
            let value = radix_value(inner.get(at + 1..at + 3)?, 16)?;
            out.push(value as u8);
            Some(at + 3)
        }
        b'0'..=b'7' => {
            let value = radix_value(inner.get(at..at + 3)?, 8)?;
            out.push(u8::try_from(value).ok()?);
            Some(at + 3)
        }
        b'u' => push_char(inner.get(at + 1..at + 5)?, out).map(|()| at + 5),
        b'U' => push_char(inner.get(at + 1..at + 9)?, out).map(|()| at + 9),
        _ => None,
    }
}

fn push_char(hex: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let c = char::from_u32(radix_value(hex, 16)?)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Some(())
}

fn radix_value(digits: &[u8], radix: u32) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &d| {
        let digit = char::from(d).to_digit(radix)?;
        Some(acc * radix + digit)
    })
}

fn codec_err(reason: &str, quoted: &[u8]) -> TagError {
    TagError::Codec(format!("{reason} in {}", lossy(quoted)))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quote_plain_text() {
        assert_eq!(quote("red"), r#""red""#);
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("two words"), r#""two words""#);
    }

    #[test]
    fn quote_escapes_delimiter_and_backslash() {
        assert_eq!(quote(r#"a"b"#), r#""a\"b""#);
        assert_eq!(quote(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn quote_matches_conventional_escapes() {
        assert_eq!(quote("tab\there"), r#""tab\there""#);
        assert_eq!(quote("line\nbreak\r"), r#""line\nbreak\r""#);
        assert_eq!(quote("\u{07}\u{08}\u{0B}\u{0C}"), r#""\a\b\v\f""#);
        assert_eq!(quote("\0"), r#""\x00""#);
        assert_eq!(quote("\u{1B}[0m"), r#""\x1b[0m""#);
        assert_eq!(quote("\u{7F}"), r#""\x7f""#);
        assert_eq!(quote("\u{85}"), r#""\u0085""#);
        assert_eq!(quote("\u{A0}"), r#""\u00a0""#);
        assert_eq!(quote("zero\u{200B}width"), r#""zero\u200bwidth""#);
        assert_eq!(quote("\u{F0000}"), r#""\U000f0000""#);
    }

    #[test]
    fn quote_escapes_by_general_category() {
        // Cf, Cn and a supplementary-plane Cf.
        assert_eq!(quote("\u{600}"), r#""\u0600""#);
        assert_eq!(quote("\u{378}"), r#""\u0378""#);
        assert_eq!(quote("\u{110BD}"), r#""\U000110bd""#);
        assert_eq!(quote("\u{E0001}"), r#""\U000e0001""#);
        // Zl, Zp and Co.
        assert_eq!(quote("\u{2028}\u{2029}"), r#""\u2028\u2029""#);
        assert_eq!(quote("\u{E000}"), r#""\ue000""#);
        // Mn, Sm and Pd stay raw.
        assert_eq!(quote("e\u{301}"), "\"e\u{301}\"");
        assert_eq!(quote("\u{2211}\u{2014}"), "\"\u{2211}\u{2014}\"");
    }

    #[test]
    fn quote_keeps_printable_unicode_raw() {
        assert_eq!(quote("café"), "\"café\"");
        assert_eq!(quote("星"), "\"星\"");
        assert_eq!(quote("😀"), "\"😀\"");
    }

    #[test]
    fn unquote_reverses_quote() {
        for tag in ["red", "", r#"say "hi""#, "a\\b", "\0\u{7F}\t", "ü\u{200B}", "\u{10FFFF}"] {
            assert_eq!(unquote(quote(tag).as_bytes()).unwrap(), tag);
        }
    }

    #[test]
    fn unquote_accepts_octal_and_unicode_escapes() {
        assert_eq!(unquote(br#""\101\102""#).unwrap(), "AB");
        assert_eq!(unquote(br#""\u00e9""#).unwrap(), "é");
        assert_eq!(unquote(br#""\U0001F600""#).unwrap(), "😀");
        assert_eq!(unquote(br#""\x41""#).unwrap(), "A");
    }

    #[test]
    fn unquote_rejects_malformed_input() {
        let bad: [&[u8]; 10] = [
            b"red",
            b"\"red",
            b"\"",
            br#""a"b""#,
            b"\"a\nb\"",
            br#""\'""#,
            br#""\q""#,
            br#""\x4""#,
            br#""\ud800""#,
            br#""\xff""#,
        ];
        for input in bad {
            assert!(
                matches!(unquote(input), Err(TagError::Codec(_))),
                "accepted {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn octal_escape_above_byte_range_rejected() {
        assert!(unquote(br#""\777""#).is_err());
    }

    #[test]
    fn forward_and_reverse_layout() {
        assert_eq!(encode_forward("42", "red"), br#"42"red""#.to_vec());
        assert_eq!(encode_reverse("42", "red"), br#""red"42"#.to_vec());
        assert_eq!(encode_count("red"), b"red");
        assert_eq!(forward_prefix("42"), b"42\"".to_vec());
        assert_eq!(reverse_prefix("red"), br#""red""#.to_vec());
    }

    #[test]
    fn decode_forward_suffix_recovers_tag() {
        let key = encode_forward("42", "blue \"sky\"");
        assert_eq!(decode_forward_suffix(&key, 2).unwrap(), "blue \"sky\"");
        assert!(decode_forward_suffix(&key, 99).is_err());
        // Wrong id length lands inside the id and fails to parse.
        assert!(decode_forward_suffix(&key, 1).is_err());
    }

    #[test]
    fn decode_reverse_prefix_recovers_id() {
        let tag = "x\"y";
        let key = encode_reverse("1007", tag);
        let quoted_len = quote(tag).len();
        assert_eq!(decode_reverse_prefix(&key, quoted_len).unwrap(), "1007");
        assert!(decode_reverse_prefix(&key, key.len()).is_err());
    }

    #[test]
    fn forward_prefix_does_not_match_longer_ids() {
        let key = encode_forward("42", "red");
        assert!(!key.starts_with(&forward_prefix("4")));
        assert!(key.starts_with(&forward_prefix("42")));
    }

    #[test]
    fn reverse_prefix_does_not_match_tags_with_shared_text() {
        // "a" is a textual prefix of `a"b`, but not of its quoted form.
        let key = encode_reverse("7", "a\"b");
        assert!(!key.starts_with(&reverse_prefix("a")));
        assert!(key.starts_with(&reverse_prefix("a\"b")));
    }

    #[test]
    fn split_keys_without_lengths() {
        let tag = "we\\ird\"tag\n";
        assert_eq!(
            split_forward(&encode_forward("12", tag)).unwrap(),
            ("12".to_string(), tag.to_string())
        );
        assert_eq!(
            split_reverse(&encode_reverse("12", tag)).unwrap(),
            ("12".to_string(), tag.to_string())
        );
        assert!(split_forward(b"\"red\"").is_err());
        assert!(split_reverse(b"\"red").is_err());
        assert!(split_reverse(b"\"red\"").is_err());
    }

    #[test]
    fn check_id_rejects_ambiguous_ids() {
        assert!(check_id("42").is_ok());
        assert!(check_id("abc").is_ok());
        assert!(matches!(check_id(""), Err(TagError::InvalidId(_))));
        assert!(matches!(check_id("4\"2"), Err(TagError::InvalidId(_))));
    }
}
