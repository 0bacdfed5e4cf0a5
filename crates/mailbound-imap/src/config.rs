//! Session configuration.

use std::time::Duration;

use crate::connection::DEFAULT_LITERAL_LIMIT;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    StartTls,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Credentials retained for transparent reconnection.
#[derive(Clone)]
pub enum Credentials {
    /// LOGIN or AUTH=PLAIN / AUTH=LOGIN username and password.
    Password {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// XOAUTH2 bearer token.
    XOAuth2 {
        /// Account name.
        username: String,
        /// OAuth2 access token (refresh is the caller's concern).
        access_token: String,
    },
}

// Credentials never appear in Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, username) = match self {
            Self::Password { username, .. } => ("Password", username),
            Self::XOAuth2 { username, .. } => ("XOAuth2", username),
        };
        f.debug_struct("Credentials")
            .field("kind", &kind)
            .field("username", username)
            .finish_non_exhaustive()
    }
}

/// IMAP session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode; chooses implicit TLS vs. plaintext + STARTTLS.
    pub security: Security,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// Default per-command timeout.
    pub command_timeout: Duration,
    /// Timeout for APPEND, which uploads message content.
    pub append_timeout: Duration,
    /// Timeout for part and structure fetches.
    pub fetch_timeout: Duration,
    /// Largest literal buffered in memory; larger ones stream or fail.
    pub literal_size_limit: usize,
    /// Label attached to outbound protocol log lines.
    pub log_outbound: String,
    /// Label attached to inbound protocol log lines.
    pub log_inbound: String,
}

impl SessionConfig {
    /// Creates a configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(host)
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    command_timeout: Duration,
    append_timeout: Duration,
    fetch_timeout: Duration,
    literal_size_limit: usize,
    log_outbound: String,
    log_inbound: String,
}

impl SessionConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            append_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            literal_size_limit: DEFAULT_LITERAL_LIMIT,
            log_outbound: "imap.tx".to_string(),
            log_inbound: "imap.rx".to_string(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the default per-command timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the APPEND timeout.
    #[must_use]
    pub const fn append_timeout(mut self, timeout: Duration) -> Self {
        self.append_timeout = timeout;
        self
    }

    /// Sets the part/structure fetch timeout.
    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the in-memory literal cap.
    #[must_use]
    pub const fn literal_size_limit(mut self, limit: usize) -> Self {
        self.literal_size_limit = limit;
        self
    }

    /// Sets the outbound/inbound log labels.
    #[must_use]
    pub fn log_labels(
        mut self,
        outbound: impl Into<String>,
        inbound: impl Into<String>,
    ) -> Self {
        self.log_outbound = outbound.into();
        self.log_inbound = inbound.into();
        self
    }

    /// Builds the configuration. The port defaults by security mode.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            host: self.host,
            security: self.security,
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            append_timeout: self.append_timeout,
            fetch_timeout: self.fetch_timeout,
            literal_size_limit: self.literal_size_limit,
            log_outbound: self.log_outbound,
            log_inbound: self.log_inbound,
        }
    }
}
