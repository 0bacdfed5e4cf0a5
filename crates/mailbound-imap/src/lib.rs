//! # mailbound-imap
//!
//! An async IMAP4rev1 (RFC 3501) client engine: a framed TLS transport,
//! a tagged command/response state machine, a capability-driven command
//! dispatcher, an IDLE push channel, and MIME message reconstruction from
//! server `BODY[section]` fetches.
//!
//! ## Features
//!
//! - **One serialized command pipeline per connection**: concurrent
//!   callers share a [`Session`] by reference; a command queue enforces
//!   the protocol's one-in-flight rule while independent sessions run in
//!   parallel
//! - **Literal-exact framing**: `{N}` literals are reassembled verbatim,
//!   with caps on line and literal sizes and a streaming path for
//!   oversized content
//! - **Capability-driven dispatch**: MOVE falls back to
//!   COPY/STORE/EXPUNGE, UNSELECT reports unsupported, SASL-IR gates
//!   initial responses
//! - **IDLE push**: a lossless, ordered event stream with coalesced DONE
//! - **TLS via rustls**: implicit TLS on 993 or STARTTLS upgrade on 143,
//!   verified against the webpki roots
//! - **Per-command timeouts**: a timed-out command is abandoned without
//!   closing the transport
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbound_imap::{Session, SessionConfig, UidSet};
//!
//! #[tokio::main]
//! async fn main() -> mailbound_imap::Result<()> {
//!     let config = SessionConfig::new("imap.example.com");
//!     let session = Session::connect(config).await?;
//!     session.login("user@example.com", "password").await?;
//!
//!     let status = session.select("INBOX").await?;
//!     println!("{} messages", status.exists);
//!
//!     // Fetch the newest message in full.
//!     if let Some(uid) = status.uid_next.and_then(|u| mailbound_imap::Uid::new(u.get() - 1)) {
//!         let message = session.fetch_message(uid).await?;
//!         println!("{:?}: {:?}", message.header.subject, message.text_body());
//!     }
//!
//!     // Wait for server pushes.
//!     let mut idle = session.idle().await?;
//!     while let Some(event) = idle.next_event().await {
//!         println!("{event:?}");
//!         break;
//!     }
//!     idle.done().await;
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command variants and wire serialization
//! - [`config`]: session configuration
//! - [`connection`]: transport streams and protocol framing
//! - [`idle`]: the IDLE push channel
//! - [`message`]: assembled messages, headers, parts
//! - [`parser`]: typed response parsing
//! - [`search`]: search keys and sort criteria
//! - [`types`]: identifiers, identifier sets, flags, mailboxes,
//!   capabilities
//! - [`walker`]: BODYSTRUCTURE traversal

#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod connection;
mod error;
pub mod idle;
pub mod message;
pub mod parser;
pub mod queue;
pub mod search;
mod session;
pub mod types;
pub mod walker;

pub use command::{Command, FetchAttribute, StoreAction};
pub use config::{Credentials, Security, SessionConfig, SessionConfigBuilder};
pub use connection::{FramedStream, ImapStream, Outbound, StreamEvent};
pub use error::{Error, Result};
pub use idle::{IdleEvent, IdleSession};
pub use message::{Attachment, Header, Message, MessagePart};
pub use parser::{BodyStructure, Envelope, FetchItem, Response, UntaggedResponse};
pub use queue::{CommandQueue, QueueGuard};
pub use search::{SearchCriteria, SortCriterion, SortKey};
pub use session::Session;
pub use types::{
    Capabilities, Capability, Flag, Flags, FolderKind, IdSet, Mailbox, MailboxAttribute,
    MailboxInfo, MailboxStatus, ResponseCode, SeqNum, SeqSet, Tag, Uid, UidSet, UidValidity,
};

/// IMAP protocol version implemented.
pub const IMAP_VERSION: &str = "IMAP4rev1";
