//! Error types for the IMAP engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::FolderKind;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server greeting was missing or not OK/PREAUTH.
    #[error("Greeting failed: {0}")]
    Greeting(String),

    /// LOGIN was rejected by the server.
    #[error("Login failed: {0}")]
    Login(String),

    /// AUTHENTICATE was rejected by the server.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The requested SASL mechanism is not supported by this library
    /// or not advertised by the server.
    #[error("Unsupported auth mechanism: {0}")]
    UnsupportedAuthMechanism(String),

    /// SELECT/EXAMINE was rejected.
    #[error("Select failed: {0}")]
    Select(String),

    /// LOGOUT did not complete cleanly.
    #[error("Logout failed: {0}")]
    Logout(String),

    /// FETCH was rejected or returned no usable data.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// COPY was rejected.
    #[error("Copy failed: {0}")]
    Copy(String),

    /// STORE was rejected.
    #[error("Store failed: {0}")]
    Store(String),

    /// EXPUNGE was rejected.
    #[error("Expunge failed: {0}")]
    Expunge(String),

    /// MOVE (or its COPY/STORE/EXPUNGE fallback) was rejected.
    #[error("Move failed: {0}")]
    Move(String),

    /// The server returned NO/BAD for a command with no more specific kind.
    #[error("Command failed: {0}")]
    Command(String),

    /// The server does not advertise the capability this command requires.
    #[error("Command not supported by server: {0}")]
    CommandNotSupported(String),

    /// Could not establish the connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection dropped; all pending commands were failed.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A command exceeded its per-command timeout. The connection stays
    /// open; only this command is abandoned.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A command argument failed local validation; nothing was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An identifier set was empty where a non-empty set is required.
    #[error("Empty identifier set")]
    EmptyIdSet,

    /// A special-use folder of the given kind does not exist on the server.
    #[error("No {0} folder defined on the server")]
    UndefinedFolder(FolderKind),

    /// Protocol parsing error.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
