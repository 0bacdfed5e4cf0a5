//! Response parser.
//!
//! Converts framed server responses into typed [`Response`] values per the
//! RFC 3501 grammar. Framing (literal reassembly) has already happened by
//! the time bytes arrive here; see [`crate::connection::framed`].

mod fetch;
mod helpers;
mod lexer;
mod types;

pub use lexer::{Lexer, Token};
pub use types::{
    Address, BodyStructure, Disposition, Envelope, FetchItem, PartExtension, StatusItem,
    UntaggedResponse,
};

use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{
    parse_capability_data, parse_id_data, parse_list_data, parse_number_list, parse_response_code,
    parse_status_data, read_text_until_crlf,
};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text/data.
        text: Option<String>,
    },
}

impl Response {
    /// Parses a complete framed response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on grammar violations.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => parse_untagged(&mut lexer),
            Token::Plus => parse_continuation(&mut lexer),
            Token::Atom(tag) => parse_tagged(&mut lexer, tag),
            token => Err(Error::Parse {
                position: 0,
                message: format!("expected *, +, or tag, got {token:?}"),
            }),
        }
    }
}

fn parse_tagged(lexer: &mut Lexer<'_>, tag_str: &str) -> Result<Response> {
    lexer.expect_space()?;

    let status = parse_status(lexer)?;
    lexer.expect_space()?;

    let (code, text) = parse_resp_text(lexer)?;

    Ok(Response::Tagged {
        tag: Tag::new(tag_str),
        status,
        code,
        text,
    })
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
    lexer.expect_space()?;

    match lexer.next_token()? {
        Token::Atom(s) => {
            let upper = s.to_uppercase();
            let payload = match upper.as_str() {
                "OK" => {
                    lexer.expect_space()?;
                    let (code, text) = parse_resp_text(lexer)?;
                    UntaggedResponse::Ok { code, text }
                }
                "NO" => {
                    lexer.expect_space()?;
                    let (code, text) = parse_resp_text(lexer)?;
                    UntaggedResponse::No { code, text }
                }
                "BAD" => {
                    lexer.expect_space()?;
                    let (code, text) = parse_resp_text(lexer)?;
                    UntaggedResponse::Bad { code, text }
                }
                "PREAUTH" => {
                    lexer.expect_space()?;
                    let (code, text) = parse_resp_text(lexer)?;
                    UntaggedResponse::PreAuth { code, text }
                }
                "BYE" => {
                    lexer.expect_space()?;
                    let (code, text) = parse_resp_text(lexer)?;
                    UntaggedResponse::Bye { code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(helpers::parse_flag_list(lexer)?)
                }
                "LIST" => {
                    lexer.expect_space()?;
                    UntaggedResponse::List(parse_list_data(lexer)?)
                }
                "LSUB" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Lsub(parse_list_data(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_number_list(lexer)?),
                "SORT" => UntaggedResponse::Sort(parse_number_list(lexer)?),
                "STATUS" => {
                    lexer.expect_space()?;
                    let (mailbox, items) = parse_status_data(lexer)?;
                    UntaggedResponse::Status { mailbox, items }
                }
                "NAMESPACE" => {
                    if lexer.peek() == Some(b' ') {
                        lexer.advance();
                    }
                    UntaggedResponse::Namespace(read_text_until_crlf(lexer))
                }
                "ID" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Id(parse_id_data(lexer)?)
                }
                _ => {
                    return Err(Error::Parse {
                        position: lexer.position(),
                        message: format!("unknown untagged response: {s}"),
                    });
                }
            };
            Ok(Response::Untagged(payload))
        }
        Token::Number(n) => {
            lexer.expect_space()?;
            let keyword = lexer.read_atom_str()?;

            let payload = match keyword.to_uppercase().as_str() {
                "EXISTS" => UntaggedResponse::Exists(n),
                "RECENT" => UntaggedResponse::Recent(n),
                "EXPUNGE" => {
                    let seq = SeqNum::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "sequence number cannot be 0".to_string(),
                    })?;
                    UntaggedResponse::Expunge(seq)
                }
                "FETCH" => {
                    let seq = SeqNum::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "sequence number cannot be 0".to_string(),
                    })?;
                    lexer.expect_space()?;
                    let items = fetch::parse_fetch_data(lexer)?;
                    UntaggedResponse::Fetch { seq, items }
                }
                other => {
                    return Err(Error::Parse {
                        position: lexer.position(),
                        message: format!("unknown message data: {other}"),
                    });
                }
            };
            Ok(Response::Untagged(payload))
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("unexpected token in untagged response: {token:?}"),
        }),
    }
}

fn parse_continuation(lexer: &mut Lexer<'_>) -> Result<Response> {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    let text = read_text_until_crlf(lexer);
    Ok(Response::Continuation {
        text: if text.is_empty() { None } else { Some(text) },
    })
}

fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
    let s = lexer.read_atom_str()?;
    match s.to_uppercase().as_str() {
        "OK" => Ok(Status::Ok),
        "NO" => Ok(Status::No),
        "BAD" => Ok(Status::Bad),
        "PREAUTH" => Ok(Status::PreAuth),
        "BYE" => Ok(Status::Bye),
        _ => Err(Error::Parse {
            position: lexer.position(),
            message: format!("invalid status: {s}"),
        }),
    }
}

fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    let code = if lexer.peek() == Some(b'[') {
        Some(parse_response_code(lexer)?)
    } else {
        None
    };

    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    Ok((code, read_text_until_crlf(lexer)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Capability, Flag, MailboxAttribute};

    #[test]
    fn untagged_ok_greeting() {
        let response = Response::parse(b"* OK IMAP4rev1 Service Ready\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                assert!(code.is_none());
                assert_eq!(text, "IMAP4rev1 Service Ready");
            }
            other => panic!("expected untagged OK, got {other:?}"),
        }
    }

    #[test]
    fn tagged_ok() {
        let response = Response::parse(b"A001 OK LOGIN completed\r\n").unwrap();
        match response {
            Response::Tagged {
                tag, status, text, ..
            } => {
                assert_eq!(tag.as_str(), "A001");
                assert_eq!(status, Status::Ok);
                assert_eq!(text, "LOGIN completed");
            }
            other => panic!("expected tagged, got {other:?}"),
        }
    }

    #[test]
    fn tagged_no_with_text() {
        let response = Response::parse(b"A007 NO [TRYCREATE] no such mailbox\r\n").unwrap();
        match response {
            Response::Tagged { status, code, .. } => {
                assert_eq!(status, Status::No);
                assert_eq!(code, Some(ResponseCode::TryCreate));
            }
            other => panic!("expected tagged, got {other:?}"),
        }
    }

    #[test]
    fn capability_line() {
        let response = Response::parse(b"* CAPABILITY IMAP4rev1 IDLE MOVE UIDPLUS\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Capability(caps)) => {
                assert!(caps.contains(&Capability::Imap4Rev1));
                assert!(caps.contains(&Capability::Idle));
                assert!(caps.contains(&Capability::Move));
                assert!(caps.contains(&Capability::UidPlus));
            }
            other => panic!("expected capability, got {other:?}"),
        }
    }

    #[test]
    fn capability_in_greeting_code() {
        let response =
            Response::parse(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=PLAIN] ready\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::Capability(caps)),
                ..
            }) => {
                assert!(caps.contains(&Capability::SaslIr));
                assert!(caps.contains(&Capability::Auth("PLAIN".to_string())));
            }
            other => panic!("expected capability code, got {other:?}"),
        }
    }

    #[test]
    fn exists_and_recent() {
        assert_eq!(
            Response::parse(b"* 172 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(172))
        );
        assert_eq!(
            Response::parse(b"* 1 RECENT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Recent(1))
        );
    }

    #[test]
    fn expunge() {
        let response = Response::parse(b"* 44 EXPUNGE\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Expunge(seq)) => assert_eq!(seq.get(), 44),
            other => panic!("expected expunge, got {other:?}"),
        }
    }

    #[test]
    fn uidvalidity_code() {
        let response = Response::parse(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::UidValidity(v)),
                ..
            }) => assert_eq!(v.get(), 3_857_529_045),
            other => panic!("expected uidvalidity, got {other:?}"),
        }
    }

    #[test]
    fn permanentflags_code() {
        let response =
            Response::parse(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] limited\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::PermanentFlags(flags)),
                ..
            }) => {
                assert!(flags.contains(&Flag::Deleted));
                assert!(flags.contains(&Flag::Seen));
            }
            other => panic!("expected permanentflags, got {other:?}"),
        }
    }

    #[test]
    fn list_line() {
        let response = Response::parse(b"* LIST (\\HasChildren \\Sent) \"/\" \"Sent Items\"\r\n")
            .unwrap();
        match response {
            Response::Untagged(UntaggedResponse::List(info)) => {
                assert!(info.attributes.contains(&MailboxAttribute::HasChildren));
                assert!(info.attributes.contains(&MailboxAttribute::Sent));
                assert_eq!(info.delimiter, Some('/'));
                assert_eq!(info.mailbox.as_str(), "Sent Items");
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn lsub_line() {
        let response = Response::parse(b"* LSUB () \".\" INBOX.Archive\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Lsub(_))
        ));
    }

    #[test]
    fn search_results() {
        let response = Response::parse(b"* SEARCH 2 84 882\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Search(nums)) => {
                assert_eq!(nums, vec![2, 84, 882]);
            }
            other => panic!("expected search, got {other:?}"),
        }
    }

    #[test]
    fn empty_search_results() {
        let response = Response::parse(b"* SEARCH\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Search(vec![]))
        );
    }

    #[test]
    fn sort_results() {
        let response = Response::parse(b"* SORT 5 3 1\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Sort(vec![5, 3, 1]))
        );
    }

    #[test]
    fn status_line() {
        let response =
            Response::parse(b"* STATUS blurdybloop (MESSAGES 231 UIDNEXT 44292)\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Status { mailbox, items }) => {
                assert_eq!(mailbox.as_str(), "blurdybloop");
                assert!(items.contains(&StatusItem::Messages(231)));
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn id_line() {
        let response =
            Response::parse(b"* ID (\"name\" \"Dovecot\" \"version\" \"2.3\")\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Id(Some(params))) => {
                assert_eq!(params[0], ("name".to_string(), "Dovecot".to_string()));
            }
            other => panic!("expected id, got {other:?}"),
        }
    }

    #[test]
    fn id_nil() {
        let response = Response::parse(b"* ID NIL\r\n").unwrap();
        assert_eq!(response, Response::Untagged(UntaggedResponse::Id(None)));
    }

    #[test]
    fn continuation() {
        let response = Response::parse(b"+ idling\r\n").unwrap();
        assert_eq!(
            response,
            Response::Continuation {
                text: Some("idling".to_string())
            }
        );

        let response = Response::parse(b"+\r\n").unwrap();
        assert_eq!(response, Response::Continuation { text: None });
    }

    #[test]
    fn bye_line() {
        let response = Response::parse(b"* BYE Autologout; idle for too long\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                assert_eq!(text, "Autologout; idle for too long");
            }
            other => panic!("expected bye, got {other:?}"),
        }
    }

    #[test]
    fn fetch_line() {
        let response = Response::parse(b"* 12 FETCH (FLAGS (\\Seen) UID 4827)\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                assert_eq!(seq.get(), 12);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }
}
