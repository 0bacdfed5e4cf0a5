//! IMAP command variants and wire serialization.
//!
//! One enum variant per command; the engine's dispatch matches on the
//! variant rather than sharing behavior through polymorphism. Identifier
//! sets arrive here already rendered to their wire form.

use crate::search::{SearchCriteria, SortCriterion, write_astring};
use crate::types::{Flag, Mailbox};

/// Marker substituted for credentials in outbound logs.
pub const REDACTED: &str = "[redacted]";

/// FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// Envelope.
    Envelope,
    /// BODYSTRUCTURE.
    BodyStructure,
    /// UID.
    Uid,
    /// BODY[section] content.
    Body {
        /// Section specifier; `None` fetches the whole body.
        section: Option<String>,
        /// Use BODY.PEEK to avoid setting \Seen.
        peek: bool,
    },
}

impl FetchAttribute {
    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Flags => buf.extend_from_slice(b"FLAGS"),
            Self::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
            Self::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
            Self::Envelope => buf.extend_from_slice(b"ENVELOPE"),
            Self::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
            Self::Uid => buf.extend_from_slice(b"UID"),
            Self::Body { section, peek } => {
                if *peek {
                    buf.extend_from_slice(b"BODY.PEEK[");
                } else {
                    buf.extend_from_slice(b"BODY[");
                }
                if let Some(s) = section {
                    buf.extend_from_slice(s.as_bytes());
                }
                buf.push(b']');
            }
        }
    }
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace the flags.
    SetFlags(Vec<Flag>),
    /// Add flags (`+FLAGS`).
    AddFlags(Vec<Flag>),
    /// Remove flags (`-FLAGS`).
    RemoveFlags(Vec<Flag>),
}

impl StoreAction {
    /// Returns the flags this action carries.
    #[must_use]
    pub fn flags(&self) -> &[Flag] {
        match self {
            Self::SetFlags(f) | Self::AddFlags(f) | Self::RemoveFlags(f) => f,
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>, silent: bool) {
        let prefix: &[u8] = match self {
            Self::SetFlags(_) => b"FLAGS",
            Self::AddFlags(_) => b"+FLAGS",
            Self::RemoveFlags(_) => b"-FLAGS",
        };
        buf.extend_from_slice(prefix);
        if silent {
            buf.extend_from_slice(b".SILENT");
        }
        buf.extend_from_slice(b" (");
        for (i, flag) in self.flags().iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }
            buf.extend_from_slice(flag.as_str().as_bytes());
        }
        buf.push(b')');
    }
}

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any state
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not authenticated
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AUTHENTICATE command.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Initial response, base64-encoded (requires SASL-IR).
        initial_response: Option<String>,
    },

    // Authenticated
    /// ID command (RFC 2971).
    Id {
        /// Client identification parameters; `None` sends `ID NIL`.
        parameters: Option<Vec<(String, String)>>,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// NAMESPACE command.
    Namespace,
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request, in wire form.
        items: Vec<String>,
    },
    /// APPEND command. The message body follows as a literal after the
    /// server's continuation.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set on the appended message.
        flags: Option<Vec<Flag>>,
        /// Message size announced in the literal.
        size: usize,
    },

    // Selected
    /// CLOSE command.
    Close,
    /// UNSELECT command (RFC 3691).
    Unselect,
    /// EXPUNGE command.
    Expunge,
    /// SEARCH command.
    Search {
        /// Search criteria.
        criteria: SearchCriteria,
        /// Use UID SEARCH.
        uid: bool,
    },
    /// SORT command (RFC 5256).
    Sort {
        /// Sort criteria.
        criteria: Vec<SortCriterion>,
        /// Search criteria restricting the sorted set.
        search: SearchCriteria,
        /// Use UID SORT.
        uid: bool,
    },
    /// FETCH command.
    Fetch {
        /// Identifier set, in wire form.
        set: String,
        /// Items to fetch.
        items: Vec<FetchAttribute>,
        /// Use UID FETCH.
        uid: bool,
    },
    /// STORE command.
    Store {
        /// Identifier set, in wire form.
        set: String,
        /// Store action.
        action: StoreAction,
        /// Use UID STORE.
        uid: bool,
        /// Suppress the FETCH responses.
        silent: bool,
    },
    /// COPY command.
    Copy {
        /// Identifier set, in wire form.
        set: String,
        /// Target mailbox.
        mailbox: Mailbox,
        /// Use UID COPY.
        uid: bool,
    },
    /// MOVE command (RFC 6851).
    Move {
        /// Identifier set, in wire form.
        set: String,
        /// Target mailbox.
        mailbox: Mailbox,
        /// Use UID MOVE.
        uid: bool,
    },
    /// IDLE command (RFC 2177).
    Idle,
}

impl Command {
    /// Serializes the command as a tagged line, CRLF included.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                buf.extend_from_slice(mechanism.as_bytes());
                if let Some(resp) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(resp.as_bytes());
                }
            }

            Self::Id { parameters } => {
                buf.extend_from_slice(b"ID ");
                if let Some(params) = parameters {
                    buf.push(b'(');
                    for (i, (key, value)) in params.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        write_astring(&mut buf, key);
                        buf.push(b' ');
                        write_astring(&mut buf, value);
                    }
                    buf.push(b')');
                } else {
                    buf.extend_from_slice(b"NIL");
                }
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Create { mailbox } => {
                buf.extend_from_slice(b"CREATE ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Delete { mailbox } => {
                buf.extend_from_slice(b"DELETE ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Rename { from, to } => {
                buf.extend_from_slice(b"RENAME ");
                write_astring(&mut buf, from.as_str());
                buf.push(b' ');
                write_astring(&mut buf, to.as_str());
            }
            Self::Subscribe { mailbox } => {
                buf.extend_from_slice(b"SUBSCRIBE ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Unsubscribe { mailbox } => {
                buf.extend_from_slice(b"UNSUBSCRIBE ");
                write_astring(&mut buf, mailbox.as_str());
            }

            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }
            Self::Lsub { reference, pattern } => {
                buf.extend_from_slice(b"LSUB ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }
            Self::Namespace => buf.extend_from_slice(b"NAMESPACE"),

            Self::Status { mailbox, items } => {
                buf.extend_from_slice(b"STATUS ");
                write_astring(&mut buf, mailbox.as_str());
                buf.extend_from_slice(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(item.as_bytes());
                }
                buf.push(b')');
            }

            Self::Append {
                mailbox,
                flags,
                size,
            } => {
                buf.extend_from_slice(b"APPEND ");
                write_astring(&mut buf, mailbox.as_str());
                if let Some(flags) = flags {
                    buf.extend_from_slice(b" (");
                    for (i, flag) in flags.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        buf.extend_from_slice(flag.as_str().as_bytes());
                    }
                    buf.push(b')');
                }
                buf.extend_from_slice(format!(" {{{size}}}").as_bytes());
            }

            Self::Close => buf.extend_from_slice(b"CLOSE"),
            Self::Unselect => buf.extend_from_slice(b"UNSELECT"),
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),

            Self::Search { criteria, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"SEARCH ");
                criteria.write_to(&mut buf);
            }

            Self::Sort {
                criteria,
                search,
                uid,
            } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"SORT (");
                for (i, c) in criteria.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    c.write_to(&mut buf);
                }
                buf.extend_from_slice(b") UTF-8 ");
                search.write_to(&mut buf);
            }

            Self::Fetch { set, items, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"FETCH ");
                buf.extend_from_slice(set.as_bytes());
                buf.push(b' ');
                if items.len() == 1 {
                    items[0].write_to(&mut buf);
                } else {
                    buf.push(b'(');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        item.write_to(&mut buf);
                    }
                    buf.push(b')');
                }
            }

            Self::Store {
                set,
                action,
                uid,
                silent,
            } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"STORE ");
                buf.extend_from_slice(set.as_bytes());
                buf.push(b' ');
                action.write_to(&mut buf, *silent);
            }

            Self::Copy { set, mailbox, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"COPY ");
                buf.extend_from_slice(set.as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox.as_str());
            }

            Self::Move { set, mailbox, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"MOVE ");
                buf.extend_from_slice(set.as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox.as_str());
            }

            Self::Idle => buf.extend_from_slice(b"IDLE"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command line as it may appear in logs.
    ///
    /// LOGIN and AUTHENTICATE payloads are replaced with a redaction
    /// marker; credentials never reach the logging facade.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { .. } => format!("{tag} LOGIN {REDACTED}"),
            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                if initial_response.is_some() {
                    format!("{tag} AUTHENTICATE {mechanism} {REDACTED}")
                } else {
                    format!("{tag} AUTHENTICATE {mechanism}")
                }
            }
            _ => {
                let wire = self.serialize(tag);
                String::from_utf8_lossy(&wire).trim_end().to_string()
            }
        }
    }
}
