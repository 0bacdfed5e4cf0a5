//! Charset label resolution and content-based detection.
//!
//! Mail in the wild carries charset labels in every imaginable spelling:
//! `UTF8`, `"iso-8859-1"`, `ks_c_5601-1987`, `cp932`. Resolution runs in
//! three steps: normalize the label, apply the alias table, then consult
//! the IANA table via `encoding_rs`. Unknown labels fall back to UTF-8;
//! identity transfer labels (`binary`, `7bit`, `8bit`) resolve to none.

use encoding_rs::Encoding;

/// Label aliases that `encoding_rs` does not accept verbatim.
///
/// Keys are normalized (lowercase, `_` collapsed to `-`).
const ALIASES: &[(&str, &str)] = &[
    ("utf8", "utf-8"),
    ("latin1", "iso-8859-1"),
    ("latin-1", "iso-8859-1"),
    ("cp1252", "windows-1252"),
    ("cp-1252", "windows-1252"),
    ("ks-c-5601-1987", "euc-kr"),
    ("ksc5601", "euc-kr"),
    ("cp932", "shift_jis"),
    ("shift-jis", "shift_jis"),
    ("sjis", "shift_jis"),
    ("cp936", "gbk"),
    ("cp949", "euc-kr"),
    ("ansi-x3.4-1968", "us-ascii"),
    ("us", "us-ascii"),
];

/// Normalizes a charset label: trim, strip quotes, lowercase, `_` → `-`.
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_ascii_lowercase()
        .replace('_', "-")
}

/// Resolves a charset label to an encoding.
///
/// Returns `None` for labels that denote "no character decoding"
/// (`binary`, `7bit`, `8bit`). Unknown labels resolve to UTF-8, which
/// matches what mail clients do in practice: a bad label is far more
/// likely to sit on UTF-8 text than on anything exotic.
#[must_use]
pub fn encoding_from_charset(label: &str) -> Option<&'static Encoding> {
    let normalized = normalize_label(label);

    if normalized.is_empty() {
        return Some(encoding_rs::UTF_8);
    }

    // Identity transfer labels carry no charset information.
    if matches!(normalized.as_str(), "binary" | "7bit" | "8bit") {
        return None;
    }

    let resolved = ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map_or(normalized.as_str(), |(_, canonical)| canonical);

    Some(Encoding::for_label(resolved.as_bytes()).unwrap_or(encoding_rs::UTF_8))
}

/// Decodes bytes using the given charset label.
///
/// Decoding is lossy: undecodable sequences become U+FFFD. Labels that
/// resolve to none are interpreted as UTF-8 for display purposes.
#[must_use]
pub fn decode_with_charset(bytes: &[u8], label: &str) -> String {
    let encoding = encoding_from_charset(label).unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Detects the charset of a textual body whose metadata did not declare one.
///
/// Scans the textual prefix for a `Content-Type: … charset=<label>`
/// parameter, then for an HTML `<meta charset=…>`. Returns the raw label
/// as found, or `None` when nothing is declared (callers default to UTF-8).
#[must_use]
pub fn detect_charset(body: &[u8]) -> Option<String> {
    // Only the prefix matters; charset declarations sit in headers or
    // the <head> element.
    let prefix_len = body.len().min(4096);
    let prefix = String::from_utf8_lossy(&body[..prefix_len]).to_ascii_lowercase();

    if let Some(label) = scan_for_parameter(&prefix, "content-type:", "charset=") {
        return Some(label);
    }

    scan_for_parameter(&prefix, "<meta", "charset=")
}

/// Finds `param` after an occurrence of `anchor` and returns its value.
fn scan_for_parameter(text: &str, anchor: &str, param: &str) -> Option<String> {
    let anchor_pos = text.find(anchor)?;
    let after = &text[anchor_pos..];
    let param_pos = after.find(param)?;
    let value = &after[param_pos + param.len()..];

    let label: String = value
        .chars()
        .take_while(|c| !matches!(c, ';' | '"' | '\'' | '>' | '/' | ' ' | '\r' | '\n' | '\t'))
        .collect();

    // charset="utf-8" puts the quote before the label
    let label = if label.is_empty() {
        value
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| !matches!(c, ';' | '"' | '\'' | '>' | '/' | ' ' | '\r' | '\n' | '\t'))
            .collect()
    } else {
        label
    };

    if label.is_empty() { None } else { Some(label) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_utf8_spellings() {
        assert_eq!(encoding_from_charset("UTF8"), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_from_charset("utf-8"), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_from_charset("Utf-8"), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_from_charset("\"utf-8\""), Some(encoding_rs::UTF_8));
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(
            encoding_from_charset("latin1"),
            Some(encoding_rs::WINDOWS_1252)
        );
        assert_eq!(
            encoding_from_charset("cp1252"),
            Some(encoding_rs::WINDOWS_1252)
        );
        assert_eq!(
            encoding_from_charset("ks_c_5601-1987"),
            Some(encoding_rs::EUC_KR)
        );
        assert_eq!(encoding_from_charset("cp932"), Some(encoding_rs::SHIFT_JIS));
    }

    #[test]
    fn test_binary_resolves_to_none() {
        assert_eq!(encoding_from_charset("binary"), None);
        assert_eq!(encoding_from_charset("7bit"), None);
        assert_eq!(encoding_from_charset("8bit"), None);
    }

    #[test]
    fn test_unknown_defaults_to_utf8() {
        assert_eq!(
            encoding_from_charset("x-no-such-charset"),
            Some(encoding_rs::UTF_8)
        );
    }

    #[test]
    fn test_decode_latin1() {
        let bytes = [0x4a, 0xf6, 0x72, 0x67]; // "Jörg" in ISO-8859-1
        assert_eq!(decode_with_charset(&bytes, "iso-8859-1"), "Jörg");
    }

    #[test]
    fn test_detect_from_content_type() {
        let body = b"Content-Type: text/html; charset=iso-8859-1\r\n\r\n<html>";
        assert_eq!(detect_charset(body), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn test_detect_from_meta() {
        let body = b"<html><head><meta charset=\"utf-8\"></head></html>";
        assert_eq!(detect_charset(body), Some("utf-8".to_string()));
    }

    #[test]
    fn test_detect_nothing() {
        let body = b"plain text without any declaration";
        assert_eq!(detect_charset(body), None);
    }
}
