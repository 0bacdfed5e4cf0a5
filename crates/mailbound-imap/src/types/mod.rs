//! Core IMAP types.
//!
//! Fundamental types used throughout the engine, following RFC 3501
//! (`IMAP4rev1`) and the extensions the engine consumes.

mod capability;
mod flags;
mod identifiers;
mod idset;
mod mailbox;
mod response_code;

pub use capability::{Capabilities, Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use idset::{IdSet, MessageId, SeqSet, UidSet};
pub use mailbox::{FolderKind, Mailbox, MailboxAttribute, MailboxInfo, MailboxStatus};
pub use response_code::ResponseCode;
