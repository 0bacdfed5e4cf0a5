//! Server capabilities and response status.

/// Response status from a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Returns true if this is a successful status.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// Server capability.
///
/// Capabilities govern which code paths are legal; the engine refreshes
/// its set after any response carrying a CAPABILITY list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// IDLE command support (RFC 2177)
    Idle,
    /// MOVE extension (RFC 6851)
    Move,
    /// UIDPLUS extension (RFC 4315)
    UidPlus,
    /// UNSELECT command (RFC 3691)
    Unselect,
    /// SPECIAL-USE mailboxes (RFC 6154)
    SpecialUse,
    /// STARTTLS support (RFC 2595)
    StartTls,
    /// ID extension (RFC 2971)
    Id,
    /// SASL initial response (RFC 4959)
    SaslIr,
    /// SORT extension (RFC 5256)
    Sort,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// LITERAL+ extension (RFC 7888)
    LiteralPlus,
    /// LOGIN disabled (e.g. before STARTTLS)
    LoginDisabled,
    /// AUTH mechanism
    Auth(String),
    /// Unknown capability
    Unknown(String),
}

impl Capability {
    /// Parses a capability token.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IDLE" => Self::Idle,
            "MOVE" => Self::Move,
            "UIDPLUS" => Self::UidPlus,
            "UNSELECT" => Self::Unselect,
            "SPECIAL-USE" => Self::SpecialUse,
            "STARTTLS" => Self::StartTls,
            "ID" => Self::Id,
            "SASL-IR" => Self::SaslIr,
            "SORT" => Self::Sort,
            "NAMESPACE" => Self::Namespace,
            "LITERAL+" => Self::LiteralPlus,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ if upper.starts_with("AUTH=") => Self::Auth(upper[5..].to_string()),
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::Idle => write!(f, "IDLE"),
            Self::Move => write!(f, "MOVE"),
            Self::UidPlus => write!(f, "UIDPLUS"),
            Self::Unselect => write!(f, "UNSELECT"),
            Self::SpecialUse => write!(f, "SPECIAL-USE"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::Id => write!(f, "ID"),
            Self::SaslIr => write!(f, "SASL-IR"),
            Self::Sort => write!(f, "SORT"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::LiteralPlus => write!(f, "LITERAL+"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// The capability set advertised by a server.
///
/// Replaced atomically whenever the server reports capabilities (greeting,
/// LOGIN/AUTHENTICATE response code, post-STARTTLS CAPABILITY).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    caps: Vec<Capability>,
}

impl Capabilities {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capability set from parsed tokens.
    #[must_use]
    pub fn from_vec(caps: Vec<Capability>) -> Self {
        Self { caps }
    }

    /// Replaces the entire set.
    pub fn replace(&mut self, caps: Vec<Capability>) {
        self.caps = caps;
    }

    /// Returns true if the capability is advertised.
    #[must_use]
    pub fn contains(&self, cap: &Capability) -> bool {
        self.caps.contains(cap)
    }

    /// Returns true if the SASL mechanism is advertised (`AUTH=<mech>`).
    #[must_use]
    pub fn has_auth(&self, mechanism: &str) -> bool {
        self.caps
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// Returns true if no capabilities are known yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Iterates over the advertised capabilities.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bad.is_ok());
        assert!(!Status::Bye.is_ok());
    }

    #[test]
    fn parse_known_capabilities() {
        assert_eq!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("idle"), Capability::Idle);
        assert_eq!(Capability::parse("MOVE"), Capability::Move);
        assert_eq!(Capability::parse("UIDPLUS"), Capability::UidPlus);
        assert_eq!(Capability::parse("UNSELECT"), Capability::Unselect);
        assert_eq!(Capability::parse("SPECIAL-USE"), Capability::SpecialUse);
        assert_eq!(Capability::parse("SASL-IR"), Capability::SaslIr);
        assert_eq!(Capability::parse("SORT"), Capability::Sort);
    }

    #[test]
    fn parse_auth_mechanisms() {
        assert_eq!(
            Capability::parse("AUTH=PLAIN"),
            Capability::Auth("PLAIN".to_string())
        );
        assert_eq!(
            Capability::parse("auth=xoauth2"),
            Capability::Auth("XOAUTH2".to_string())
        );
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(
            Capability::parse("XSOMETHING"),
            Capability::Unknown("XSOMETHING".to_string())
        );
    }

    #[test]
    fn capabilities_contains_and_auth() {
        let caps = Capabilities::from_vec(vec![
            Capability::Imap4Rev1,
            Capability::Idle,
            Capability::Auth("XOAUTH2".to_string()),
        ]);
        assert!(caps.contains(&Capability::Idle));
        assert!(!caps.contains(&Capability::Move));
        assert!(caps.has_auth("xoauth2"));
        assert!(!caps.has_auth("PLAIN"));
    }

    #[test]
    fn capabilities_replace_is_atomic() {
        let mut caps = Capabilities::from_vec(vec![Capability::Idle]);
        caps.replace(vec![Capability::Move]);
        assert!(!caps.contains(&Capability::Idle));
        assert!(caps.contains(&Capability::Move));
    }

    #[test]
    fn display_round_trips_known_tokens() {
        for token in ["IMAP4rev1", "IDLE", "UIDPLUS", "SASL-IR", "AUTH=PLAIN"] {
            assert_eq!(Capability::parse(token).to_string(), token);
        }
    }
}
