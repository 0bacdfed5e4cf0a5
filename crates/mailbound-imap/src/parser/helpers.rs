//! Shared parsing helpers for untagged data and response codes.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, Flags, Mailbox, MailboxAttribute, MailboxInfo, ResponseCode, SeqNum, Uid,
    UidValidity,
};
use crate::{Error, Result};

use super::types::StatusItem;

/// Parses a bracketed response code. The opening `[` has not been consumed.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_str()?;
    let upper = atom.to_uppercase();

    let code = match upper.as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let uid = read_uid(lexer)?;
            ResponseCode::UidNext(uid)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let validity = UidValidity::new(n).ok_or_else(|| Error::Parse {
                position: lexer.position(),
                message: "UIDVALIDITY cannot be 0".to_string(),
            })?;
            ResponseCode::UidValidity(validity)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let seq = SeqNum::new(n).ok_or_else(|| Error::Parse {
                position: lexer.position(),
                message: "sequence number cannot be 0".to_string(),
            })?;
            ResponseCode::Unseen(seq)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            let flags = parse_flag_list(lexer)?;
            ResponseCode::PermanentFlags(flags.into_iter().collect())
        }
        "APPENDUID" => {
            lexer.expect_space()?;
            let validity = read_uid_validity(lexer)?;
            lexer.expect_space()?;
            let uid = read_uid(lexer)?;
            ResponseCode::AppendUid {
                uidvalidity: validity,
                uid,
            }
        }
        "COPYUID" => {
            lexer.expect_space()?;
            let validity = read_uid_validity(lexer)?;
            lexer.expect_space()?;
            let source = read_set_atom(lexer)?;
            lexer.expect_space()?;
            let dest = read_set_atom(lexer)?;
            ResponseCode::CopyUid {
                uidvalidity: validity,
                source_uids: source,
                dest_uids: dest,
            }
        }
        _ => {
            skip_to_bracket_close(lexer);
            ResponseCode::Unknown(atom.to_string())
        }
    };

    skip_to_bracket_close(lexer);
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

fn read_uid(lexer: &mut Lexer<'_>) -> Result<Uid> {
    let n = lexer.read_number()?;
    Uid::new(n).ok_or_else(|| Error::Parse {
        position: lexer.position(),
        message: "UID cannot be 0".to_string(),
    })
}

fn read_uid_validity(lexer: &mut Lexer<'_>) -> Result<UidValidity> {
    let n = lexer.read_number()?;
    UidValidity::new(n).ok_or_else(|| Error::Parse {
        position: lexer.position(),
        message: "UIDVALIDITY cannot be 0".to_string(),
    })
}

/// Reads a UID-set token (`5`, `5:7`, `1,3:4`) as a raw string.
fn read_set_atom(lexer: &mut Lexer<'_>) -> Result<String> {
    let mut out = String::new();
    while let Some(b) = lexer.peek() {
        if b.is_ascii_digit() || b == b':' || b == b',' || b == b'*' {
            out.push(b as char);
            lexer.advance();
        } else {
            break;
        }
    }
    if out.is_empty() {
        return Err(Error::Parse {
            position: lexer.position(),
            message: "expected UID set".to_string(),
        });
    }
    Ok(out)
}

fn skip_to_bracket_close(lexer: &mut Lexer<'_>) {
    while lexer.peek() != Some(b']') && !lexer.is_eof() {
        lexer.advance();
    }
}

/// Parses space-separated capability tokens up to end of line.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            Token::Space => {}
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in flag list: {token:?}"),
                });
            }
        }
    }

    Ok(flags)
}

/// Parses the body of a LIST or LSUB response.
pub fn parse_list_data(lexer: &mut Lexer<'_>) -> Result<MailboxInfo> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in LIST attributes: {token:?}"),
                });
            }
        }
    }

    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => {
            return Err(Error::Parse {
                position: lexer.position(),
                message: format!("expected delimiter, got {token:?}"),
            });
        }
    };

    lexer.expect_space()?;
    let mailbox_name = lexer.read_astring()?;

    Ok(MailboxInfo {
        attributes,
        delimiter,
        mailbox: Mailbox::new(mailbox_name),
    })
}

/// Parses the numbers following SEARCH or SORT.
pub fn parse_number_list(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Number(n) = lexer.next_token()? {
            nums.push(n);
        }
    }

    Ok(nums)
}

/// Parses the body of a STATUS response.
pub fn parse_status_data(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let mailbox_name = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let value = lexer.read_number()?;

                let item = match name.to_uppercase().as_str() {
                    "MESSAGES" => StatusItem::Messages(value),
                    "RECENT" => StatusItem::Recent(value),
                    "UNSEEN" => StatusItem::Unseen(value),
                    "UIDNEXT" => match Uid::new(value) {
                        Some(uid) => StatusItem::UidNext(uid),
                        None => continue,
                    },
                    "UIDVALIDITY" => match UidValidity::new(value) {
                        Some(v) => StatusItem::UidValidity(v),
                        None => continue,
                    },
                    _ => continue,
                };
                items.push(item);
            }
            _ => {}
        }
    }

    Ok((Mailbox::new(mailbox_name), items))
}

/// Parses an ID response body: `NIL` or `(key value ...)`.
pub fn parse_id_data(lexer: &mut Lexer<'_>) -> Result<Option<Vec<(String, String)>>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
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
            Ok(Some(params))
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected ID data, got {token:?}"),
        }),
    }
}

/// Reads remaining text until CRLF, consuming the CRLF if present.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();

    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end);
    if lexer.peek() == Some(b'\r') {
        lexer.skip(2);
    }

    String::from_utf8_lossy(&remaining[..end]).to_string()
}
