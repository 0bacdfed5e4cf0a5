//! Search keys and sort criteria in their on-the-wire form.

use crate::types::{SeqSet, UidSet};

/// SEARCH criteria (RFC 3501 §6.4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with the \Answered flag.
    Answered,
    /// Messages with the \Deleted flag.
    Deleted,
    /// Messages with the \Draft flag.
    Draft,
    /// Messages with the \Flagged flag.
    Flagged,
    /// New messages (recent and unseen).
    New,
    /// Messages without the \Seen flag.
    Unseen,
    /// Messages with the \Seen flag.
    Seen,
    /// Messages without the \Deleted flag.
    Undeleted,
    /// Messages in the sequence set.
    SeqSet(SeqSet),
    /// Messages in the UID set.
    UidSet(UidSet),
    /// Subject contains the string.
    Subject(String),
    /// From contains the string.
    From(String),
    /// To contains the string.
    To(String),
    /// Body contains the string.
    Body(String),
    /// Header or body contains the string.
    Text(String),
    /// Internal date on or after the date (`DD-Mon-YYYY`).
    Since(String),
    /// Internal date before the date.
    Before(String),
    /// Internal date on the date.
    On(String),
    /// Size larger than n octets.
    Larger(u32),
    /// Size smaller than n octets.
    Smaller(u32),
    /// Named header contains the string.
    Header(String, String),
    /// All criteria must match.
    And(Vec<SearchCriteria>),
    /// Either criterion matches.
    Or(Box<SearchCriteria>, Box<SearchCriteria>),
    /// Criterion does not match.
    Not(Box<SearchCriteria>),
}

impl SearchCriteria {
    /// Serializes the criteria into the command buffer.
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Self::All => buf.extend_from_slice(b"ALL"),
            Self::Answered => buf.extend_from_slice(b"ANSWERED"),
            Self::Deleted => buf.extend_from_slice(b"DELETED"),
            Self::Draft => buf.extend_from_slice(b"DRAFT"),
            Self::Flagged => buf.extend_from_slice(b"FLAGGED"),
            Self::New => buf.extend_from_slice(b"NEW"),
            Self::Unseen => buf.extend_from_slice(b"UNSEEN"),
            Self::Seen => buf.extend_from_slice(b"SEEN"),
            Self::Undeleted => buf.extend_from_slice(b"UNDELETED"),
            Self::SeqSet(set) => buf.extend_from_slice(set.to_string().as_bytes()),
            Self::UidSet(set) => {
                buf.extend_from_slice(b"UID ");
                buf.extend_from_slice(set.to_string().as_bytes());
            }
            Self::Subject(s) => {
                buf.extend_from_slice(b"SUBJECT ");
                write_astring(buf, s);
            }
            Self::From(s) => {
                buf.extend_from_slice(b"FROM ");
                write_astring(buf, s);
            }
            Self::To(s) => {
                buf.extend_from_slice(b"TO ");
                write_astring(buf, s);
            }
            Self::Body(s) => {
                buf.extend_from_slice(b"BODY ");
                write_astring(buf, s);
            }
            Self::Text(s) => {
                buf.extend_from_slice(b"TEXT ");
                write_astring(buf, s);
            }
            Self::Since(date) => {
                buf.extend_from_slice(b"SINCE ");
                buf.extend_from_slice(date.as_bytes());
            }
            Self::Before(date) => {
                buf.extend_from_slice(b"BEFORE ");
                buf.extend_from_slice(date.as_bytes());
            }
            Self::On(date) => {
                buf.extend_from_slice(b"ON ");
                buf.extend_from_slice(date.as_bytes());
            }
            Self::Larger(size) => buf.extend_from_slice(format!("LARGER {size}").as_bytes()),
            Self::Smaller(size) => buf.extend_from_slice(format!("SMALLER {size}").as_bytes()),
            Self::Header(name, value) => {
                buf.extend_from_slice(b"HEADER ");
                write_astring(buf, name);
                buf.push(b' ');
                write_astring(buf, value);
            }
            Self::And(criteria) => {
                for (i, c) in criteria.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    c.write_to(buf);
                }
            }
            Self::Or(a, b) => {
                buf.extend_from_slice(b"OR ");
                a.write_to(buf);
                buf.push(b' ');
                b.write_to(buf);
            }
            Self::Not(c) => {
                buf.extend_from_slice(b"NOT ");
                c.write_to(buf);
            }
        }
    }
}

/// A single SORT key (RFC 5256).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Internal date and time.
    Arrival,
    /// First Cc address.
    Cc,
    /// Date header.
    Date,
    /// First From address.
    From,
    /// Message size.
    Size,
    /// Base subject (reply prefixes stripped).
    Subject,
    /// First To address.
    To,
}

impl SortKey {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Arrival => "ARRIVAL",
            Self::Cc => "CC",
            Self::Date => "DATE",
            Self::From => "FROM",
            Self::Size => "SIZE",
            Self::Subject => "SUBJECT",
            Self::To => "TO",
        }
    }
}

/// A SORT criterion: a key, optionally reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCriterion {
    /// The sort key.
    pub key: SortKey,
    /// Sort in descending order of the key.
    pub reverse: bool,
}

impl SortCriterion {
    /// An ascending criterion.
    #[must_use]
    pub const fn ascending(key: SortKey) -> Self {
        Self {
            key,
            reverse: false,
        }
    }

    /// A descending criterion.
    #[must_use]
    pub const fn descending(key: SortKey) -> Self {
        Self { key, reverse: true }
    }

    pub(crate) fn write_to(self, buf: &mut Vec<u8>) {
        if self.reverse {
            buf.extend_from_slice(b"REVERSE ");
        }
        buf.extend_from_slice(self.key.as_str().as_bytes());
    }
}

/// Writes an astring: bare atom where possible, quoted otherwise.
pub(crate) fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{SeqNum, Uid};

    fn render(criteria: &SearchCriteria) -> String {
        let mut buf = Vec::new();
        criteria.write_to(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn simple_keys() {
        assert_eq!(render(&SearchCriteria::All), "ALL");
        assert_eq!(render(&SearchCriteria::Unseen), "UNSEEN");
        assert_eq!(render(&SearchCriteria::Undeleted), "UNDELETED");
    }

    #[test]
    fn string_keys_quote_when_needed() {
        assert_eq!(
            render(&SearchCriteria::Subject("hello world".to_string())),
            "SUBJECT \"hello world\""
        );
        assert_eq!(
            render(&SearchCriteria::From("alice@example.com".to_string())),
            "FROM alice@example.com"
        );
    }

    #[test]
    fn sets() {
        let seqs = SeqSet::range(SeqNum::new(1).unwrap(), SeqNum::new(10).unwrap());
        assert_eq!(render(&SearchCriteria::SeqSet(seqs)), "1:10");

        let uids = UidSet::single(Uid::new(5).unwrap());
        assert_eq!(render(&SearchCriteria::UidSet(uids)), "UID 5");
    }

    #[test]
    fn combinators() {
        let c = SearchCriteria::Or(
            Box::new(SearchCriteria::Seen),
            Box::new(SearchCriteria::Not(Box::new(SearchCriteria::Flagged))),
        );
        assert_eq!(render(&c), "OR SEEN NOT FLAGGED");

        let and = SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Since("1-Jan-2026".to_string()),
        ]);
        assert_eq!(render(&and), "UNSEEN SINCE 1-Jan-2026");
    }

    #[test]
    fn header_key() {
        let c = SearchCriteria::Header("Message-ID".to_string(), "<x@y>".to_string());
        assert_eq!(render(&c), "HEADER Message-ID <x@y>");
    }

    #[test]
    fn sort_criteria() {
        let mut buf = Vec::new();
        SortCriterion::descending(SortKey::Date).write_to(&mut buf);
        assert_eq!(buf, b"REVERSE DATE");

        buf.clear();
        SortCriterion::ascending(SortKey::Subject).write_to(&mut buf);
        assert_eq!(buf, b"SUBJECT");
    }

    #[test]
    fn astring_quoting() {
        let mut buf = Vec::new();
        write_astring(&mut buf, "");
        assert_eq!(buf, b"\"\"");

        buf.clear();
        write_astring(&mut buf, "with \"quote\"");
        assert_eq!(buf, b"\"with \\\"quote\\\"\"");
    }
}
