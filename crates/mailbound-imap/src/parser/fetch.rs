//! FETCH response parsing: data items, ENVELOPE, BODYSTRUCTURE.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::{Error, Result};

use super::helpers::parse_flag_list;
use super::types::{Address, BodyStructure, Disposition, Envelope, FetchItem, PartExtension};

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_data(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                let upper = name.to_uppercase();
                match upper.as_str() {
                    "FLAGS" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                    }
                    "UID" => {
                        lexer.expect_space()?;
                        let n = lexer.read_number()?;
                        let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                            position: lexer.position(),
                            message: "UID cannot be 0".to_string(),
                        })?;
                        items.push(FetchItem::Uid(uid));
                    }
                    "RFC822.SIZE" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Rfc822Size(lexer.read_number()?));
                    }
                    "INTERNALDATE" => {
                        lexer.expect_space()?;
                        if let Token::QuotedString(date) = lexer.next_token()? {
                            items.push(FetchItem::InternalDate(date));
                        }
                    }
                    "ENVELOPE" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
                    }
                    "BODYSTRUCTURE" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
                    }
                    "BODY" => {
                        // Either BODY[section]<origin> content or a bare
                        // BODY structure (the non-extensible form).
                        if lexer.peek() == Some(b' ') {
                            lexer.advance();
                            items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
                        } else {
                            let (section, origin) = parse_section_and_origin(lexer)?;
                            lexer.expect_space()?;
                            let data = lexer.read_nstring_bytes()?;
                            items.push(FetchItem::Body {
                                section,
                                origin,
                                data,
                            });
                        }
                    }
                    "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                        lexer.expect_space()?;
                        let data = lexer.read_nstring_bytes()?;
                        let section = match upper.as_str() {
                            "RFC822.HEADER" => Some("HEADER".to_string()),
                            "RFC822.TEXT" => Some("TEXT".to_string()),
                            _ => None,
                        };
                        items.push(FetchItem::Body {
                            section,
                            origin: None,
                            data,
                        });
                    }
                    _ => skip_fetch_item(lexer),
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in FETCH data: {token:?}"),
                });
            }
        }
    }

    Ok(items)
}

/// Parses optional `[section]` and `<origin>` after BODY.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(Option<String>, Option<u32>)> {
    let mut section = None;
    let mut origin = None;

    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let mut buf = String::new();
        while let Some(b) = lexer.peek() {
            lexer.advance();
            if b == b']' {
                break;
            }
            buf.push(b as char);
        }
        if !buf.is_empty() {
            section = Some(buf);
        }
    }

    if lexer.peek() == Some(b'<') {
        lexer.advance();
        let mut buf = String::new();
        while let Some(b) = lexer.peek() {
            lexer.advance();
            if b == b'>' {
                break;
            }
            if b.is_ascii_digit() {
                buf.push(b as char);
            }
        }
        origin = buf.parse().ok();
    }

    Ok((section, origin))
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses an address list (`NIL` or a parenthesized list of addresses).
fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => break,
                }
            }
            Ok(addresses)
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected address list, got {token:?}"),
        }),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;

    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

/// Parses a BODYSTRUCTURE tree.
///
/// Strict on the required fields; extension data is parsed where RFC 3501
/// defines it (MD5, disposition, language, location) and anything beyond
/// is retained raw.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    if lexer.peek() == Some(b'(') {
        // Multipart: one or more nested parts, then the subtype.
        let mut parts = Vec::new();
        while lexer.peek() == Some(b'(') {
            parts.push(parse_body_structure(lexer)?);
            if lexer.peek() == Some(b' ') {
                lexer.advance();
            }
        }

        let subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();

        // body-ext-mpart: params, then the common extension tail.
        let params = if lexer.peek() == Some(b' ') {
            lexer.advance();
            parse_body_params(lexer)?
        } else {
            Vec::new()
        };
        let extension = parse_extension_tail(lexer, None)?;

        lexer.expect(Token::RParen)?;

        return Ok(BodyStructure::Multipart {
            parts,
            subtype,
            params,
            extension,
        });
    }

    // Single part.
    let media_type = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
    lexer.expect_space()?;
    let media_subtype = lexer.read_nstring()?.unwrap_or_default().to_uppercase();
    lexer.expect_space()?;
    let params = parse_body_params(lexer)?;
    lexer.expect_space()?;
    let id = lexer.read_nstring()?;
    lexer.expect_space()?;
    let description = lexer.read_nstring()?;
    lexer.expect_space()?;
    let encoding = lexer.read_nstring()?.unwrap_or_default();
    lexer.expect_space()?;
    let size = lexer.read_number()?;

    let body = if media_type == "MESSAGE" && media_subtype == "RFC822" {
        lexer.expect_space()?;
        let envelope = parse_envelope(lexer)?;
        lexer.expect_space()?;
        let nested = parse_body_structure(lexer)?;
        lexer.expect_space()?;
        let lines = lexer.read_number()?;
        let extension = parse_singlepart_extension(lexer)?;
        BodyStructure::Message {
            params,
            id,
            description,
            encoding,
            size,
            envelope: Box::new(envelope),
            body: Box::new(nested),
            lines,
            extension,
        }
    } else if media_type == "TEXT" {
        lexer.expect_space()?;
        let lines = lexer.read_number()?;
        let extension = parse_singlepart_extension(lexer)?;
        BodyStructure::Text {
            subtype: media_subtype,
            params,
            id,
            description,
            encoding,
            size,
            lines,
            extension,
        }
    } else {
        let extension = parse_singlepart_extension(lexer)?;
        BodyStructure::Basic {
            media_type,
            media_subtype,
            params,
            id,
            description,
            encoding,
            size,
            extension,
        }
    };

    lexer.expect(Token::RParen)?;
    Ok(body)
}

/// Parses the singlepart extension fields (MD5 first).
fn parse_singlepart_extension(lexer: &mut Lexer<'_>) -> Result<Option<PartExtension>> {
    if lexer.peek() != Some(b' ') {
        return Ok(None);
    }
    lexer.advance();
    let md5 = lexer.read_nstring()?;
    parse_extension_tail(lexer, md5)
}

/// Parses the common extension tail: disposition, language, location,
/// then a raw-retained remainder.
fn parse_extension_tail(
    lexer: &mut Lexer<'_>,
    md5: Option<String>,
) -> Result<Option<PartExtension>> {
    let mut ext = PartExtension {
        md5,
        ..PartExtension::default()
    };
    let mut any = ext.md5.is_some();

    if lexer.peek() == Some(b' ') {
        lexer.advance();
        ext.disposition = parse_disposition(lexer)?;
        any = true;
    }

    if lexer.peek() == Some(b' ') {
        lexer.advance();
        ext.language = parse_language(lexer)?;
        any = true;
    }

    if lexer.peek() == Some(b' ') {
        lexer.advance();
        ext.location = lexer.read_nstring()?;
        any = true;
    }

    // Anything further is server-specific; keep it verbatim.
    if lexer.peek() == Some(b' ') {
        let start = lexer.position() + 1;
        skip_to_close_paren(lexer);
        let raw = String::from_utf8_lossy(lexer.slice_from(start)).to_string();
        if !raw.is_empty() {
            ext.raw = Some(raw);
            any = true;
        }
    }

    Ok(any.then_some(ext))
}

/// Parses `body-fld-dsp`: `NIL` or `("name" (params))`.
fn parse_disposition(lexer: &mut Lexer<'_>) -> Result<Option<Disposition>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::LParen => {
            let name = lexer.read_astring()?.to_lowercase();
            let params = if lexer.peek() == Some(b' ') {
                lexer.advance();
                parse_body_params(lexer)?
            } else {
                Vec::new()
            };
            lexer.expect(Token::RParen)?;
            Ok(Some(Disposition { name, params }))
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected disposition, got {token:?}"),
        }),
    }
}

/// Parses `body-fld-lang`: nstring or a parenthesized string list.
fn parse_language(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::QuotedString(s) => Ok(vec![s]),
        Token::Atom(s) => Ok(vec![s.to_string()]),
        Token::LParen => {
            let mut langs = Vec::new();
            loop {
                match lexer.next_token()? {
                    Token::RParen => break,
                    Token::Space => {}
                    Token::QuotedString(s) => langs.push(s),
                    Token::Atom(s) => langs.push(s.to_string()),
                    _ => {}
                }
            }
            Ok(langs)
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected language, got {token:?}"),
        }),
    }
}

/// Parses body parameters: `NIL` or `(key value key value ...)`.
fn parse_body_params(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => {
                        let key = lexer.read_nstring()?.unwrap_or_default();
                        if lexer.peek() == Some(b' ') {
                            lexer.advance();
                        }
                        let value = lexer.read_nstring()?.unwrap_or_default();
                        params.push((key, value));
                    }
                }
            }
            Ok(params)
        }
        _ => Ok(Vec::new()),
    }
}

/// Skips to the closing parenthesis of the current nesting level without
/// consuming it. Literal contents are skipped opaquely.
fn skip_to_close_paren(lexer: &mut Lexer<'_>) {
    let mut depth = 0u32;
    while let Some(b) = lexer.peek() {
        match b {
            b'(' => {
                depth += 1;
                lexer.advance();
            }
            b')' => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                lexer.advance();
            }
            b'{' => {
                // Consume the literal as a token so braces inside its
                // content cannot confuse the depth count.
                if lexer.next_token().is_err() {
                    return;
                }
            }
            _ => {
                lexer.advance();
            }
        }
    }
}

/// Skips one unknown fetch item value.
fn skip_fetch_item(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    let mut depth = 0u32;
    while let Some(b) = lexer.peek() {
        match b {
            b'(' => {
                depth += 1;
                lexer.advance();
            }
            b')' => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                lexer.advance();
            }
            b' ' if depth == 0 => return,
            b'{' => {
                if lexer.next_token().is_err() {
                    return;
                }
            }
            _ => {
                lexer.advance();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fetch_uid_and_flags() {
        let mut lexer = Lexer::new(b"(UID 12345 FLAGS (\\Seen))");
        let items = parse_fetch_data(&mut lexer).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], FetchItem::Uid(u) if u.get() == 12345));
        assert!(matches!(&items[1], FetchItem::Flags(f) if f.is_seen()));
    }

    #[test]
    fn fetch_uid_zero_rejected() {
        let mut lexer = Lexer::new(b"(UID 0)");
        assert!(parse_fetch_data(&mut lexer).is_err());
    }

    #[test]
    fn fetch_body_section_with_literal() {
        let mut lexer = Lexer::new(b"(BODY[1] {5}\r\nhello)");
        let items = parse_fetch_data(&mut lexer).unwrap();
        match &items[0] {
            FetchItem::Body {
                section,
                origin,
                data,
            } => {
                assert_eq!(section.as_deref(), Some("1"));
                assert!(origin.is_none());
                assert_eq!(data.as_deref(), Some(b"hello".as_slice()));
            }
            other => panic!("expected Body, got {other:?}"),
        }
    }

    #[test]
    fn fetch_body_section_with_origin() {
        let mut lexer = Lexer::new(b"(BODY[TEXT]<100> \"abc\")");
        let items = parse_fetch_data(&mut lexer).unwrap();
        match &items[0] {
            FetchItem::Body {
                section, origin, ..
            } => {
                assert_eq!(section.as_deref(), Some("TEXT"));
                assert_eq!(*origin, Some(100));
            }
            other => panic!("expected Body, got {other:?}"),
        }
    }

    #[test]
    fn envelope_basic() {
        let mut lexer = Lexer::new(
            b"(\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hi\" ((\"A\" NIL \"a\" \"x.org\")) NIL NIL ((NIL NIL \"b\" \"y.org\")) NIL NIL NIL \"<id@x>\")",
        );
        let env = parse_envelope(&mut lexer).unwrap();
        assert_eq!(env.subject.as_deref(), Some("Hi"));
        assert_eq!(env.from.len(), 1);
        assert_eq!(env.from[0].email().unwrap(), "a@x.org");
        assert_eq!(env.to[0].email().unwrap(), "b@y.org");
        assert_eq!(env.message_id.as_deref(), Some("<id@x>"));
    }

    #[test]
    fn body_structure_text_plain() {
        let mut lexer =
            Lexer::new(b"(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 1152 23)");
        let bs = parse_body_structure(&mut lexer).unwrap();
        match bs {
            BodyStructure::Text {
                subtype,
                encoding,
                size,
                lines,
                ..
            } => {
                assert_eq!(subtype, "PLAIN");
                assert_eq!(encoding, "7BIT");
                assert_eq!(size, 1152);
                assert_eq!(lines, 23);
            }
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn body_structure_with_disposition() {
        let input = b"(\"APPLICATION\" \"PDF\" (\"NAME\" \"r.pdf\") NIL NIL \"BASE64\" 20480 NIL (\"attachment\" (\"filename\" \"r.pdf\")) NIL NIL)";
        let mut lexer = Lexer::new(input);
        let bs = parse_body_structure(&mut lexer).unwrap();
        let ext = bs.extension().unwrap();
        let dsp = ext.disposition.as_ref().unwrap();
        assert!(dsp.is_attachment());
        assert_eq!(dsp.param("filename"), Some("r.pdf"));
    }

    #[test]
    fn body_structure_multipart() {
        let input = b"((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1)(\"TEXT\" \"HTML\" NIL NIL NIL \"QUOTED-PRINTABLE\" 20 1) \"ALTERNATIVE\")";
        let mut lexer = Lexer::new(input);
        let bs = parse_body_structure(&mut lexer).unwrap();
        match bs {
            BodyStructure::Multipart { parts, subtype, .. } => {
                assert_eq!(parts.len(), 2);
                assert_eq!(subtype, "ALTERNATIVE");
            }
            other => panic!("expected Multipart, got {other:?}"),
        }
    }

    #[test]
    fn body_structure_multipart_with_params() {
        let input = b"((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1) \"MIXED\" (\"BOUNDARY\" \"xyz\") NIL NIL)";
        let mut lexer = Lexer::new(input);
        let bs = parse_body_structure(&mut lexer).unwrap();
        match bs {
            BodyStructure::Multipart { params, .. } => {
                assert_eq!(params, vec![("BOUNDARY".to_string(), "xyz".to_string())]);
            }
            other => panic!("expected Multipart, got {other:?}"),
        }
    }

    #[test]
    fn body_structure_message_rfc822() {
        let input = b"(\"MESSAGE\" \"RFC822\" NIL NIL NIL \"7BIT\" 512 (NIL \"Fwd\" NIL NIL NIL NIL NIL NIL NIL NIL) (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 100 5) 12)";
        let mut lexer = Lexer::new(input);
        let bs = parse_body_structure(&mut lexer).unwrap();
        match bs {
            BodyStructure::Message {
                envelope,
                body,
                lines,
                ..
            } => {
                assert_eq!(envelope.subject.as_deref(), Some("Fwd"));
                assert!(matches!(*body, BodyStructure::Text { .. }));
                assert_eq!(lines, 12);
            }
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_retained_raw() {
        let input = b"(\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1 NIL NIL NIL NIL \"X-EXT\" 42)";
        let mut lexer = Lexer::new(input);
        let bs = parse_body_structure(&mut lexer).unwrap();
        let ext = bs.extension().unwrap();
        assert_eq!(ext.raw.as_deref(), Some("\"X-EXT\" 42"));
    }

    #[test]
    fn unknown_fetch_item_skipped() {
        let mut lexer = Lexer::new(b"(X-GM-MSGID 1278455344230334865 UID 5)");
        let items = parse_fetch_data(&mut lexer).unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], FetchItem::Uid(u) if u.get() == 5));
    }
}
