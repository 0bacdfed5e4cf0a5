//! Assembled message types: headers, parts, and derived body views.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use mailbound_mime::{
    decode_base64, decode_encoded_words, decode_quoted_printable_lossy, decode_with_charset,
    detect_charset,
};

use crate::parser::{Address, BodyStructure, Disposition, Envelope, FetchItem};
use crate::types::{Flags, SeqNum, Uid};
use crate::walker::PartPlan;

/// Message header assembled from a FETCH with envelope, flags, and the
/// raw header block.
#[derive(Debug, Clone)]
pub struct Header {
    /// Sequence number within the selected mailbox.
    pub seq: SeqNum,
    /// UID, when fetched.
    pub uid: Option<Uid>,
    /// Subject with encoded words decoded.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Date header parsed to an absolute instant.
    pub date: Option<DateTime<FixedOffset>>,
    /// Server INTERNALDATE parsed to an absolute instant.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Message-ID header.
    pub message_id: Option<String>,
    /// Message flags.
    pub flags: Flags,
    /// Additional header fields from the BODY[HEADER] block, lowercased
    /// names, first value each.
    pub fields: HashMap<String, String>,
    /// Parsed MIME structure, when fetched alongside the header.
    pub structure: Option<BodyStructure>,
}

impl Header {
    /// Builds a header from the items of one FETCH response.
    #[must_use]
    pub fn from_fetch(seq: SeqNum, items: &[FetchItem]) -> Self {
        let mut header = Self {
            seq,
            uid: None,
            subject: None,
            from: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            date: None,
            internal_date: None,
            message_id: None,
            flags: Flags::new(),
            fields: HashMap::new(),
            structure: None,
        };

        for item in items {
            match item {
                FetchItem::Uid(uid) => header.uid = Some(*uid),
                FetchItem::Flags(flags) => header.flags = flags.clone(),
                FetchItem::InternalDate(raw) => {
                    header.internal_date = parse_internal_date(raw);
                }
                FetchItem::Envelope(env) => header.apply_envelope(env),
                FetchItem::BodyStructure(bs) => header.structure = Some(bs.clone()),
                FetchItem::Body {
                    section: Some(section),
                    data: Some(data),
                    ..
                } if section.eq_ignore_ascii_case("HEADER") => {
                    header.apply_raw_headers(data);
                }
                FetchItem::Body { .. } | FetchItem::Rfc822Size(_) => {}
            }
        }

        header
    }

    fn apply_envelope(&mut self, env: &Envelope) {
        self.subject = env.subject.as_deref().map(decode_encoded_words);
        self.from = decode_addresses(&env.from);
        self.to = decode_addresses(&env.to);
        self.cc = decode_addresses(&env.cc);
        self.message_id = env.message_id.clone();
        self.date = env.date.as_deref().and_then(parse_rfc2822_date);
    }

    fn apply_raw_headers(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        if let Ok(parsed) = mailbound_mime::Headers::parse(&text) {
            for (name, value) in parsed.iter() {
                self.fields
                    .entry(name.to_string())
                    .or_insert_with(|| decode_encoded_words(value));
            }
        }
    }
}

fn decode_addresses(addresses: &[Address]) -> Vec<Address> {
    addresses
        .iter()
        .map(|a| Address {
            name: a.name.as_deref().map(decode_encoded_words),
            adl: a.adl.clone(),
            mailbox: a.mailbox.clone(),
            host: a.host.clone(),
        })
        .collect()
}

/// Parses an RFC 2822 Date header. Returns `None` rather than failing
/// the whole fetch on the malformed dates real mail contains.
fn parse_rfc2822_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(raw.trim()).ok()
}

/// Parses an IMAP INTERNALDATE (`"17-Jul-1996 02:44:25 -0700"`).
fn parse_internal_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}

/// One fetched MIME part: the walker's descriptor plus raw wire bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    /// Dotted section path (`1`, `1.2.1`; `0` for a multipart root).
    pub section: String,
    /// Top-level media type, uppercased.
    pub media_type: String,
    /// Media subtype, uppercased.
    pub media_subtype: String,
    /// Content-Disposition, when reported.
    pub disposition: Option<Disposition>,
    /// Content-Transfer-Encoding, lowercased.
    pub encoding: String,
    /// Filename, when reported.
    pub filename: Option<String>,
    /// Content-ID without angle brackets.
    pub content_id: Option<String>,
    /// Declared charset, when reported.
    pub charset: Option<String>,
    /// Raw body bytes exactly as fetched; still transfer-encoded.
    pub data: Vec<u8>,
}

impl MessagePart {
    /// Combines a walker descriptor with fetched bytes.
    #[must_use]
    pub fn from_plan(plan: PartPlan, data: Vec<u8>) -> Self {
        Self {
            section: plan.section,
            media_type: plan.media_type,
            media_subtype: plan.media_subtype,
            disposition: plan.disposition,
            encoding: plan.encoding,
            filename: plan.filename,
            content_id: plan.content_id,
            charset: plan.charset,
            data,
        }
    }

    /// Returns true for `type/subtype`, case-insensitively.
    #[must_use]
    pub fn is_media(&self, media_type: &str, subtype: &str) -> bool {
        self.media_type.eq_ignore_ascii_case(media_type)
            && self.media_subtype.eq_ignore_ascii_case(subtype)
    }

    /// Returns true when this part should be treated as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition
            .as_ref()
            .is_some_and(Disposition::is_attachment)
            || (self.filename.is_some() && !self.media_type.eq_ignore_ascii_case("TEXT"))
    }

    /// Reverses the content transfer encoding, yielding content bytes.
    #[must_use]
    pub fn decoded_data(&self) -> Vec<u8> {
        match self.encoding.as_str() {
            "base64" => {
                let text = String::from_utf8_lossy(&self.data);
                decode_base64(&text).unwrap_or_else(|_| self.data.clone())
            }
            "quoted-printable" => {
                decode_quoted_printable_lossy(&String::from_utf8_lossy(&self.data))
            }
            _ => self.data.clone(),
        }
    }

    /// Decodes the part to text using its declared charset, falling back
    /// to content sniffing and then UTF-8.
    #[must_use]
    pub fn decoded_text(&self) -> String {
        let bytes = self.decoded_data();
        let label = self
            .charset
            .clone()
            .or_else(|| detect_charset(&bytes))
            .unwrap_or_else(|| "utf-8".to_string());
        decode_with_charset(&bytes, &label)
    }
}

/// A decoded attachment view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename, when the sender provided one.
    pub filename: Option<String>,
    /// `type/subtype`, lowercased.
    pub content_type: String,
    /// Section path of the source part.
    pub section: String,
    /// Content bytes with the transfer encoding reversed.
    pub data: Vec<u8>,
}

/// A complete message: header plus its ordered parts.
#[derive(Debug, Clone)]
pub struct Message {
    /// The message header.
    pub header: Header,
    /// All fetched parts in traversal order.
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Returns the decoded `text/plain` body, if the message has one.
    #[must_use]
    pub fn text_body(&self) -> Option<String> {
        self.parts
            .iter()
            .find(|p| p.is_media("TEXT", "PLAIN") && !p.is_attachment())
            .map(MessagePart::decoded_text)
    }

    /// Returns the decoded `text/html` body, if the message has one.
    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        self.parts
            .iter()
            .find(|p| p.is_media("TEXT", "HTML") && !p.is_attachment())
            .map(MessagePart::decoded_text)
    }

    /// Returns all attachments with their transfer encoding reversed.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.parts
            .iter()
            .filter(|p| p.is_attachment())
            .map(|p| Attachment {
                filename: p.filename.clone(),
                content_type: format!(
                    "{}/{}",
                    p.media_type.to_lowercase(),
                    p.media_subtype.to_lowercase()
                ),
                section: p.section.clone(),
                data: p.decoded_data(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::Envelope;

    fn plain_part(data: &[u8], encoding: &str, charset: Option<&str>) -> MessagePart {
        MessagePart {
            section: "1".to_string(),
            media_type: "TEXT".to_string(),
            media_subtype: "PLAIN".to_string(),
            disposition: None,
            encoding: encoding.to_string(),
            filename: None,
            content_id: None,
            charset: charset.map(ToString::to_string),
            data: data.to_vec(),
        }
    }

    #[test]
    fn header_from_envelope() {
        let env = Envelope {
            date: Some("Mon, 7 Feb 1994 21:52:25 -0800".to_string()),
            subject: Some("=?ISO-8859-1?Q?J=F6rg_M=FCller?=".to_string()),
            from: vec![Address {
                name: Some("=?utf-8?Q?Caf=C3=A9?=".to_string()),
                adl: None,
                mailbox: Some("cafe".to_string()),
                host: Some("example.com".to_string()),
            }],
            message_id: Some("<x@y>".to_string()),
            ..Envelope::default()
        };

        let items = vec![
            FetchItem::Uid(Uid::new(99).unwrap()),
            FetchItem::Envelope(Box::new(env)),
        ];
        let header = Header::from_fetch(SeqNum::new(1).unwrap(), &items);

        assert_eq!(header.uid.unwrap().get(), 99);
        assert_eq!(header.subject.as_deref(), Some("Jörg Müller"));
        assert_eq!(header.from[0].name.as_deref(), Some("Café"));
        assert_eq!(header.date.unwrap().timestamp(), 760_686_745);
    }

    #[test]
    fn header_extra_fields_from_raw_block() {
        let raw = b"X-Priority: 1\r\nList-Id: <dev.example.org>\r\n\r\n";
        let items = vec![FetchItem::Body {
            section: Some("HEADER".to_string()),
            origin: None,
            data: Some(raw.to_vec()),
        }];
        let header = Header::from_fetch(SeqNum::new(2).unwrap(), &items);
        assert_eq!(header.fields.get("x-priority").map(String::as_str), Some("1"));
        assert_eq!(
            header.fields.get("list-id").map(String::as_str),
            Some("<dev.example.org>")
        );
    }

    #[test]
    fn internal_date_parses() {
        let items = vec![FetchItem::InternalDate(
            "17-Jul-1996 02:44:25 -0700".to_string(),
        )];
        let header = Header::from_fetch(SeqNum::new(3).unwrap(), &items);
        assert!(header.internal_date.is_some());
    }

    #[test]
    fn malformed_date_is_none() {
        assert!(parse_rfc2822_date("not a date").is_none());
    }

    #[test]
    fn part_decodes_quoted_printable_latin1() {
        let part = plain_part(b"J=F6rg", "quoted-printable", Some("iso-8859-1"));
        assert_eq!(part.decoded_text(), "Jörg");
    }

    #[test]
    fn part_decodes_base64_utf8() {
        let part = plain_part(b"SMOpbGxv", "base64", Some("utf-8"));
        assert_eq!(part.decoded_text(), "Héllo");
    }

    #[test]
    fn part_detects_charset_when_undeclared() {
        let body = b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\nJ\xf6rg";
        let part = plain_part(body, "7bit", None);
        assert!(part.decoded_text().contains("J\u{f6}rg"));
    }

    #[test]
    fn message_body_views() {
        let text = plain_part(b"hello", "7bit", None);
        let mut html = plain_part(b"<b>hello</b>", "7bit", None);
        html.media_subtype = "HTML".to_string();
        html.section = "2".to_string();

        let pdf = MessagePart {
            section: "3".to_string(),
            media_type: "APPLICATION".to_string(),
            media_subtype: "PDF".to_string(),
            disposition: Some(Disposition {
                name: "attachment".to_string(),
                params: vec![("filename".to_string(), "r.pdf".to_string())],
            }),
            encoding: "base64".to_string(),
            filename: Some("r.pdf".to_string()),
            content_id: None,
            charset: None,
            data: b"JVBERg==".to_vec(),
        };

        let message = Message {
            header: Header::from_fetch(SeqNum::new(1).unwrap(), &[]),
            parts: vec![text, html, pdf],
        };

        assert_eq!(message.text_body().as_deref(), Some("hello"));
        assert_eq!(message.html_body().as_deref(), Some("<b>hello</b>"));

        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename.as_deref(), Some("r.pdf"));
        assert_eq!(attachments[0].content_type, "application/pdf");
        assert_eq!(attachments[0].data, b"%PDF");
    }
}
