//! Mailbox types.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox (case-insensitive per RFC).
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox status derived from a SELECT/EXAMINE.
#[derive(Debug, Clone, Default)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// First unseen message sequence number, when the server reports it.
    pub unseen: Option<SeqNum>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be permanently stored.
    pub permanent_flags: Flags,
    /// Whether the mailbox was selected read-only.
    pub read_only: bool,
}

/// One mailbox entry from a LIST/LSUB response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxInfo {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name.
    pub mailbox: Mailbox,
}

impl MailboxInfo {
    /// Returns true if the mailbox cannot be selected.
    #[must_use]
    pub fn is_noselect(&self) -> bool {
        self.attributes.contains(&MailboxAttribute::NoSelect)
    }

    /// Returns the special-use kind this mailbox is marked as, if any.
    #[must_use]
    pub fn special_use(&self) -> Option<FolderKind> {
        self.attributes.iter().find_map(|a| match a {
            MailboxAttribute::Inbox => Some(FolderKind::Inbox),
            MailboxAttribute::Sent => Some(FolderKind::Sent),
            MailboxAttribute::Drafts => Some(FolderKind::Drafts),
            MailboxAttribute::Trash => Some(FolderKind::Trash),
            MailboxAttribute::Junk => Some(FolderKind::Junk),
            MailboxAttribute::Archive => Some(FolderKind::Archive),
            MailboxAttribute::Flagged => Some(FolderKind::Flagged),
            _ => None,
        })
    }
}

/// Mailbox attributes from LIST/LSUB responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    // SPECIAL-USE mailbox attributes (RFC 6154)
    /// Mailbox is the inbox.
    Inbox,
    /// Mailbox is the sent folder.
    Sent,
    /// Mailbox is the drafts folder.
    Drafts,
    /// Mailbox is the trash folder.
    Trash,
    /// Mailbox is the junk/spam folder.
    Junk,
    /// Mailbox is the archive folder.
    Archive,
    /// Flagged/starred messages (virtual mailbox).
    Flagged,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute token.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            // RFC 6154 SPECIAL-USE
            "\\INBOX" => Self::Inbox,
            "\\SENT" => Self::Sent,
            "\\DRAFTS" => Self::Drafts,
            "\\TRASH" => Self::Trash,
            "\\JUNK" | "\\SPAM" => Self::Junk,
            "\\ARCHIVE" => Self::Archive,
            "\\FLAGGED" => Self::Flagged,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

/// Special-use folder kinds, for locating well-known mailboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderKind {
    /// The inbox.
    Inbox,
    /// Sent mail.
    Sent,
    /// Draft messages.
    Drafts,
    /// Deleted mail.
    Trash,
    /// Junk/spam.
    Junk,
    /// Archived mail.
    Archive,
    /// Flagged/starred mail.
    Flagged,
}

impl std::fmt::Display for FolderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Drafts => "drafts",
            Self::Trash => "trash",
            Self::Junk => "junk",
            Self::Archive => "archive",
            Self::Flagged => "flagged",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_constant() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
    }

    #[test]
    fn parse_attributes() {
        assert_eq!(
            MailboxAttribute::parse("\\NoSelect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(
            MailboxAttribute::parse("\\HasChildren"),
            MailboxAttribute::HasChildren
        );
        assert_eq!(MailboxAttribute::parse("\\Trash"), MailboxAttribute::Trash);
        assert_eq!(MailboxAttribute::parse("\\Spam"), MailboxAttribute::Junk);
        assert_eq!(MailboxAttribute::parse("\\Inbox"), MailboxAttribute::Inbox);
    }

    #[test]
    fn parse_unknown_attribute() {
        assert_eq!(
            MailboxAttribute::parse("\\Custom"),
            MailboxAttribute::Unknown("\\Custom".to_string())
        );
    }

    #[test]
    fn special_use_lookup() {
        let info = MailboxInfo {
            attributes: vec![MailboxAttribute::HasChildren, MailboxAttribute::Archive],
            delimiter: Some('/'),
            mailbox: Mailbox::new("Archive"),
        };
        assert_eq!(info.special_use(), Some(FolderKind::Archive));
        assert!(!info.is_noselect());
    }

    #[test]
    fn default_status() {
        let status = MailboxStatus::default();
        assert_eq!(status.exists, 0);
        assert!(status.unseen.is_none());
        assert!(!status.read_only);
    }
}
