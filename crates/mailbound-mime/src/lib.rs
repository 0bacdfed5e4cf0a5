//! # mailbound-mime
//!
//! MIME decoding for the mailbound IMAP engine.
//!
//! ## Features
//!
//! - **Transfer encodings**: base64 (whitespace-tolerant) and
//!   quoted-printable with independent strict and lossy modes
//! - **RFC 2047 encoded words**: in-order decoding with adjacent-word
//!   concatenation
//! - **Charsets**: label normalization, an alias table for the spellings
//!   mail actually uses, `encoding_rs` lookup with UTF-8 fallback, and
//!   content-based detection
//! - **Headers**: RFC 5322 header block parsing with unfolding
//!
//! ## Quick Start
//!
//! ```
//! use mailbound_mime::encoding::decode_encoded_words;
//!
//! let subject = decode_encoded_words("=?ISO-8859-1?Q?J=F6rg_M=FCller?=");
//! assert_eq!(subject, "Jörg Müller");
//! ```
//!
//! ```
//! use mailbound_mime::encoding::{decode_quoted_printable, decode_quoted_printable_lossy};
//!
//! // Strict mode rejects a dangling escape...
//! assert!(decode_quoted_printable("Hello=0D=0A=").is_err());
//! // ...lossy mode keeps the raw byte and continues.
//! assert_eq!(decode_quoted_printable_lossy("Hello=0D=0A="), b"Hello\r\n=");
//! ```

#![forbid(unsafe_code)]

pub mod charset;
pub mod encoding;
mod error;
pub mod header;

pub use charset::{decode_with_charset, detect_charset, encoding_from_charset};
pub use encoding::{
    decode_base64, decode_encoded_words, decode_quoted_printable, decode_quoted_printable_lossy,
    decode_quoted_printable_text, encode_base64, encode_quoted_printable, encode_rfc2047,
};
pub use error::{Error, Result};
pub use header::Headers;
