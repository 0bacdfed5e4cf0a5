//! Connection management: transport streams and protocol framing.

mod framed;
mod stream;

pub use framed::{
    DEFAULT_LINE_LIMIT, DEFAULT_LITERAL_LIMIT, FramedStream, Outbound, StreamEvent,
};
pub use stream::{ImapStream, connect_plain, connect_tls};
