//! Typed response values.

use crate::types::{Flags, Mailbox, ResponseCode, SeqNum, Uid, UidValidity};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date, as sent by the server.
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// Envelope.
    Envelope(Box<Envelope>),
    /// UID.
    Uid(Uid),
    /// BODY section content.
    Body {
        /// Section specifier (e.g. `1.2`, `HEADER`).
        section: Option<String>,
        /// Origin offset for partial fetches.
        origin: Option<u32>,
        /// Body data. `None` for NIL; empty when the content was
        /// delivered through the streaming path instead.
        data: Option<Vec<u8>>,
    },
    /// BODYSTRUCTURE.
    BodyStructure(BodyStructure),
}

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header (raw; may contain encoded words).
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Email address from an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Mailbox name (local part).
    pub mailbox: Option<String>,
    /// Host name (domain part).
    pub host: Option<String>,
}

impl Address {
    /// Returns the full email address when both parts are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Content-Disposition from BODYSTRUCTURE extension data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Disposition name (e.g. `attachment`, `inline`), lowercased.
    pub name: String,
    /// Disposition parameters (e.g. `filename`).
    pub params: Vec<(String, String)>,
}

impl Disposition {
    /// Case-insensitive parameter lookup.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if this is an attachment disposition.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.name.eq_ignore_ascii_case("attachment")
    }
}

/// Extension data trailing a body part description.
///
/// Parsed where RFC 3501 defines the fields; anything beyond is retained
/// raw so unknown server extensions survive a round trip through the
/// parser without being interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartExtension {
    /// Body MD5 (singlepart only).
    pub md5: Option<String>,
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Content-Language.
    pub language: Vec<String>,
    /// Content-Location.
    pub location: Option<String>,
    /// Unparsed trailing extension data, verbatim.
    pub raw: Option<String>,
}

/// Parsed BODYSTRUCTURE tree.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructure {
    /// Single-part body (neither text nor message/rfc822).
    Basic {
        /// MIME type.
        media_type: String,
        /// MIME subtype.
        media_subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
        /// Extension data.
        extension: Option<PartExtension>,
    },
    /// Text body.
    Text {
        /// Text subtype.
        subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
        /// Size in lines.
        lines: u32,
        /// Extension data.
        extension: Option<PartExtension>,
    },
    /// `message/rfc822` body with the nested message's envelope and
    /// structure.
    Message {
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
        /// Envelope of the nested message.
        envelope: Box<Envelope>,
        /// Body structure of the nested message.
        body: Box<Self>,
        /// Size in lines.
        lines: u32,
        /// Extension data.
        extension: Option<PartExtension>,
    },
    /// Multipart container.
    Multipart {
        /// Child body parts.
        parts: Vec<Self>,
        /// Multipart subtype.
        subtype: String,
        /// Body parameters (e.g. boundary).
        params: Vec<(String, String)>,
        /// Extension data.
        extension: Option<PartExtension>,
    },
}

impl BodyStructure {
    /// Returns the top-level media type, uppercased.
    #[must_use]
    pub fn media_type(&self) -> &str {
        match self {
            Self::Basic { media_type, .. } => media_type,
            Self::Text { .. } => "TEXT",
            Self::Message { .. } => "MESSAGE",
            Self::Multipart { .. } => "MULTIPART",
        }
    }

    /// Returns the media subtype, uppercased.
    #[must_use]
    pub fn media_subtype(&self) -> &str {
        match self {
            Self::Basic { media_subtype, .. } => media_subtype,
            Self::Text { subtype, .. } | Self::Multipart { subtype, .. } => subtype,
            Self::Message { .. } => "RFC822",
        }
    }

    /// Returns the content transfer encoding, or empty for multipart.
    #[must_use]
    pub fn encoding(&self) -> &str {
        match self {
            Self::Basic { encoding, .. }
            | Self::Text { encoding, .. }
            | Self::Message { encoding, .. } => encoding,
            Self::Multipart { .. } => "",
        }
    }

    /// Returns the body parameters.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        match self {
            Self::Basic { params, .. }
            | Self::Text { params, .. }
            | Self::Message { params, .. }
            | Self::Multipart { params, .. } => params,
        }
    }

    /// Returns the Content-ID, if any.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        match self {
            Self::Basic { id, .. } | Self::Text { id, .. } | Self::Message { id, .. } => {
                id.as_deref()
            }
            Self::Multipart { .. } => None,
        }
    }

    /// Returns the extension data, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&PartExtension> {
        match self {
            Self::Basic { extension, .. }
            | Self::Text { extension, .. }
            | Self::Message { extension, .. }
            | Self::Multipart { extension, .. } => extension.as_ref(),
        }
    }

    /// Returns true for multipart containers.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart { .. })
    }
}

/// STATUS response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusItem {
    /// Number of messages.
    Messages(u32),
    /// Number of recent messages.
    Recent(u32),
    /// Next UID.
    UidNext(Uid),
    /// UIDVALIDITY value.
    UidValidity(UidValidity),
    /// Number of unseen messages.
    Unseen(u32),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedResponse {
    /// OK response with optional code.
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// NO response.
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BAD response.
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// PREAUTH greeting.
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BYE response.
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<crate::types::Capability>),
    /// LIST data.
    List(crate::types::MailboxInfo),
    /// LSUB data.
    Lsub(crate::types::MailboxInfo),
    /// FLAGS data.
    Flags(Flags),
    /// EXISTS (message count).
    Exists(u32),
    /// RECENT count.
    Recent(u32),
    /// EXPUNGE (message removed).
    Expunge(SeqNum),
    /// FETCH data.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetch data items.
        items: Vec<FetchItem>,
    },
    /// SEARCH results. Raw numbers: sequence numbers for SEARCH, UIDs
    /// for UID SEARCH; the engine knows which it asked for.
    Search(Vec<u32>),
    /// SORT results, same number space rules as SEARCH.
    Sort(Vec<u32>),
    /// STATUS data.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items.
        items: Vec<StatusItem>,
    },
    /// NAMESPACE data, retained verbatim.
    Namespace(String),
    /// ID data: server identification field/value pairs, or `None` for
    /// `ID NIL`.
    Id(Option<Vec<(String, String)>>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_email() {
        let addr = Address {
            name: Some("John Doe".to_string()),
            adl: None,
            mailbox: Some("john".to_string()),
            host: Some("example.com".to_string()),
        };
        assert_eq!(addr.email(), Some("john@example.com".to_string()));

        let partial = Address {
            name: None,
            adl: None,
            mailbox: Some("john".to_string()),
            host: None,
        };
        assert_eq!(partial.email(), None);
    }

    #[test]
    fn disposition_param_lookup_is_case_insensitive() {
        let dsp = Disposition {
            name: "attachment".to_string(),
            params: vec![("FILENAME".to_string(), "report.pdf".to_string())],
        };
        assert_eq!(dsp.param("filename"), Some("report.pdf"));
        assert!(dsp.is_attachment());
    }

    #[test]
    fn body_structure_accessors() {
        let text = BodyStructure::Text {
            subtype: "PLAIN".to_string(),
            params: vec![("CHARSET".to_string(), "utf-8".to_string())],
            id: None,
            description: None,
            encoding: "quoted-printable".to_string(),
            size: 120,
            lines: 4,
            extension: None,
        };
        assert_eq!(text.media_type(), "TEXT");
        assert_eq!(text.media_subtype(), "PLAIN");
        assert_eq!(text.encoding(), "quoted-printable");
        assert!(!text.is_multipart());

        let multi = BodyStructure::Multipart {
            parts: vec![text],
            subtype: "ALTERNATIVE".to_string(),
            params: vec![],
            extension: None,
        };
        assert_eq!(multi.media_type(), "MULTIPART");
        assert_eq!(multi.media_subtype(), "ALTERNATIVE");
        assert!(multi.is_multipart());
        assert_eq!(multi.encoding(), "");
    }
}
