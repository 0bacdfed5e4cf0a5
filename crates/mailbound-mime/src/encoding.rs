//! MIME transfer-encoding decoders and encoders.
//!
//! Three decoding surfaces: RFC 2047 encoded-word headers, quoted-printable
//! bodies (RFC 2045), and base64 bodies. Quoted-printable comes in a strict
//! mode that rejects malformed escapes and a lossy mode that preserves the
//! raw bytes and keeps going; both are part of the public contract.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::charset::{decode_with_charset, encoding_from_charset};
use crate::error::{Error, Result};

/// Maximum line length for quoted-printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes base64 data, ignoring whitespace and line wraps.
///
/// Missing padding is supplied before decoding; mail agents routinely
/// strip it when wrapping lines.
///
/// # Errors
///
/// Returns an error if the input contains non-base64 characters.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let mut compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    while compact.len() % 4 != 0 {
        compact.push('=');
    }
    STANDARD.decode(&compact).map_err(Into::into)
}

/// Decodes quoted-printable text into raw bytes, strictly.
///
/// Soft line breaks (`=CRLF`, `=LF`) are removed. Any malformed escape
/// (a `=` not followed by two hex digits or a line break) is an error.
///
/// # Errors
///
/// Returns [`Error::MalformedEscape`] with the byte offset of the bad `=`.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    decode_qp(text.as_bytes(), true)
}

/// Decodes quoted-printable text into raw bytes, lossily.
///
/// Malformed escapes are passed through as raw bytes and decoding
/// continues. Never fails.
#[must_use]
pub fn decode_quoted_printable_lossy(text: &str) -> Vec<u8> {
    // Infallible with strict = false.
    decode_qp(text.as_bytes(), false).unwrap_or_default()
}

fn decode_qp(input: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        // Soft line break: =CRLF or =LF
        match input.get(i + 1) {
            Some(b'\r') if input.get(i + 2) == Some(&b'\n') => {
                i += 3;
                continue;
            }
            Some(b'\n') => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let hex = (input.get(i + 1).copied(), input.get(i + 2).copied());
        if let (Some(hi), Some(lo)) = hex
            && let (Some(hi), Some(lo)) = (hex_val(hi), hex_val(lo))
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }

        if strict {
            return Err(Error::MalformedEscape(i));
        }
        out.push(b'=');
        i += 1;
    }

    Ok(out)
}

const fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Decodes a quoted-printable body to text with the given charset label.
///
/// The whole byte run is accumulated first and decoded in one pass, so
/// multi-byte sequences split across escapes survive.
///
/// # Errors
///
/// Returns an error on malformed escapes (strict mode).
pub fn decode_quoted_printable_text(text: &str, charset: &str) -> Result<String> {
    let bytes = decode_quoted_printable(text)?;
    Ok(decode_with_charset(&bytes, charset))
}

/// Encodes text using quoted-printable encoding (RFC 2045).
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();
    let mut line_length = 0;

    for byte in text.as_bytes() {
        if line_length >= MAX_LINE_LENGTH - 3 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        match byte {
            // Printable ASCII except '=' and space
            b'!'..=b'<' | b'>'..=b'~' => {
                result.push(*byte as char);
                line_length += 1;
            }
            b' ' => {
                if line_length >= MAX_LINE_LENGTH - 1 {
                    result.push_str("=20");
                    line_length += 3;
                } else {
                    result.push(' ');
                    line_length += 1;
                }
            }
            _ => {
                result.push('=');
                let _ = write!(result, "{byte:02X}");
                line_length += 3;
            }
        }
    }

    result
}

/// Decodes RFC 2047 encoded words in a header value.
///
/// Every `=?charset?Q|B?text?=` occurrence is decoded in order; adjacent
/// encoded words separated only by whitespace are concatenated with the
/// whitespace dropped, per RFC 2047 §6.2. Unparseable words pass through
/// verbatim.
#[must_use]
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut last_was_word_end: Option<usize> = None;

    while i < bytes.len() {
        if bytes[i] == b'=' && bytes.get(i + 1) == Some(&b'?') {
            if let Some((decoded, consumed)) = parse_encoded_word(&input[i..]) {
                // Drop whitespace between two encoded words.
                if let Some(end) = last_was_word_end
                    && input[end..i].chars().all(char::is_whitespace)
                {
                    out.truncate(out.len() - input[end..i].len());
                }
                out.push_str(&decoded);
                i += consumed;
                last_was_word_end = Some(i);
                continue;
            }
        }

        // Advance one char, not one byte, to keep UTF-8 intact.
        let ch_len = input[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&input[i..i + ch_len]);
        i += ch_len;
    }

    out
}

/// Parses one encoded word at the start of `s`.
///
/// Returns the decoded text and the number of input bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;

    let charset_end = inner.find('?')?;
    let charset = &inner[..charset_end];

    let rest = &inner[charset_end + 1..];
    let mut rest_chars = rest.chars();
    let encoding = rest_chars.next()?;
    if rest_chars.next() != Some('?') {
        return None;
    }

    let payload = &rest[2..];
    let payload_end = payload.find("?=")?;
    let encoded_text = &payload[..payload_end];

    let raw = match encoding {
        'B' | 'b' => decode_base64(encoded_text).ok()?,
        'Q' | 'q' => {
            // Header Q encoding: '_' means space.
            let with_spaces = encoded_text.replace('_', " ");
            decode_quoted_printable_lossy(&with_spaces)
        }
        _ => return None,
    };

    let decoded = match encoding_from_charset(charset) {
        Some(enc) => {
            let (text, _, _) = enc.decode(&raw);
            text.into_owned()
        }
        None => String::from_utf8_lossy(&raw).into_owned(),
    };

    // "=?" + charset + "?" + enc + "?" + text + "?="
    let consumed = 2 + charset_end + 1 + 2 + payload_end + 2;
    Some((decoded, consumed))
}

/// Encodes a header value using RFC 2047 if it contains non-ASCII text.
///
/// Format: `=?charset?B?encoded-text?=`.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '=' && c != '?') {
        return text.to_string();
    }

    let encoded = encode_base64(text.as_bytes());
    format!("=?{charset}?B?{encoded}?=")
}
