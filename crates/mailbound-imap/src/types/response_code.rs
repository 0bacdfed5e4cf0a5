//! Response codes.

use super::{Capability, Flag, SeqNum, Uid, UidValidity};

/// Response code carried in brackets by OK/NO/BAD responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: human-readable message that MUST be shown to the user.
    Alert,
    /// CAPABILITY list.
    Capability(Vec<Capability>),
    /// PARSE: error parsing a message.
    Parse,
    /// PERMANENTFLAGS: flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: mailbox selected read-only.
    ReadOnly,
    /// READ-WRITE: mailbox selected read-write.
    ReadWrite,
    /// TRYCREATE: mailbox doesn't exist, but can be created.
    TryCreate,
    /// UIDNEXT: next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY value.
    UidValidity(UidValidity),
    /// UNSEEN: first unseen message sequence number.
    Unseen(SeqNum),
    /// APPENDUID (RFC 4315): UID assigned to an appended message.
    AppendUid {
        /// UIDVALIDITY of the mailbox.
        uidvalidity: UidValidity,
        /// UID of the appended message.
        uid: Uid,
    },
    /// COPYUID (RFC 4315): UIDs of copied messages.
    CopyUid {
        /// UIDVALIDITY of the destination mailbox.
        uidvalidity: UidValidity,
        /// Source UID set, as sent by the server.
        source_uids: String,
        /// Destination UID set, as sent by the server.
        dest_uids: String,
    },
    /// Unknown response code, retained verbatim.
    Unknown(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uid_codes_carry_values() {
        let code = ResponseCode::UidNext(Uid::new(4392).unwrap());
        assert!(matches!(code, ResponseCode::UidNext(u) if u.get() == 4392));

        let code = ResponseCode::UidValidity(UidValidity::new(3_857_529_045).unwrap());
        assert!(matches!(code, ResponseCode::UidValidity(v) if v.get() == 3_857_529_045));
    }

    #[test]
    fn copyuid_keeps_server_sets() {
        let code = ResponseCode::CopyUid {
            uidvalidity: UidValidity::new(1).unwrap(),
            source_uids: "5:7".to_string(),
            dest_uids: "100:102".to_string(),
        };
        if let ResponseCode::CopyUid { source_uids, .. } = code {
            assert_eq!(source_uids, "5:7");
        } else {
            panic!("Expected CopyUid");
        }
    }
}
