//! Framed I/O for the IMAP protocol.
//!
//! Inbound: reassembles the server byte stream into discrete responses,
//! honoring the literal protocol. A line ending in `{N}\r\n` is followed
//! by exactly `N` opaque bytes that must not be interpreted as protocol
//! lines. Literals up to the configured cap are inlined into the frame;
//! larger ones either stream to a sink in bounded chunks or fail the
//! connection.
//!
//! `read_response` is cancellation-safe: partial frame state lives in the
//! stream, so a read dropped by a timeout or a `select!` resumes exactly
//! where it stopped on the next call. The engine relies on this: a
//! command timeout abandons the command without poisoning the framing,
//! and the IDLE loop may race a DONE request against a read.
//!
//! Outbound: commands leave as typed [`Outbound`] frames, one of a tagged
//! command line, a continuation payload after the server's `+`, or the
//! untagged `DONE` that ends IDLE.

#![allow(clippy::missing_errors_doc)]

use bytes::Bytes;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default cap on a single protocol line.
pub const DEFAULT_LINE_LIMIT: usize = 1024 * 1024;

/// Default cap on an inlined literal.
pub const DEFAULT_LITERAL_LIMIT: usize = 1024 * 1024;

/// An outbound protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A complete tagged command line, CRLF included.
    Tagged(Vec<u8>),
    /// Literal payload sent after the server's `+` continuation,
    /// terminated by CRLF.
    Continuation(Vec<u8>),
    /// The untagged `DONE` line ending an IDLE.
    IdleDone,
}

impl Outbound {
    /// Returns the on-the-wire bytes of this frame.
    #[must_use]
    pub fn as_wire(&self) -> Vec<u8> {
        match self {
            Self::Tagged(bytes) => bytes.clone(),
            Self::Continuation(payload) => {
                let mut out = payload.clone();
                out.extend_from_slice(b"\r\n");
                out
            }
            Self::IdleDone => b"DONE\r\n".to_vec(),
        }
    }
}

/// Events delivered when an oversized literal streams past the cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A literal of the given total size is about to stream.
    Begin(usize),
    /// One chunk of literal content, in arrival order.
    Bytes(Bytes),
    /// The literal is complete.
    End,
}

/// Resumable state of the response currently being assembled.
#[derive(Default)]
struct PartialFrame {
    /// Accumulated response bytes, including the incomplete current line.
    frame: Vec<u8>,
    /// Offset in `frame` where the current line began.
    line_start: usize,
    /// Remaining bytes of an inlined literal being read.
    inline_remaining: usize,
    /// Remaining bytes of an oversized literal being streamed.
    stream_remaining: usize,
}

/// Framed connection over any async byte stream.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    line_limit: usize,
    literal_limit: usize,
    partial: PartialFrame,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a framed stream with default limits.
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, DEFAULT_LINE_LIMIT, DEFAULT_LITERAL_LIMIT)
    }

    /// Creates a framed stream with explicit line and literal caps.
    pub fn with_limits(stream: S, line_limit: usize, literal_limit: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            line_limit,
            literal_limit,
            partial: PartialFrame::default(),
        }
    }

    /// Reads one complete response, inlining all literals.
    ///
    /// A literal larger than the literal cap fails the connection with a
    /// protocol error; use [`Self::read_response_streaming`] when large
    /// content is expected.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        self.read_response_inner(None).await
    }

    /// Reads one complete response, streaming oversized literals.
    ///
    /// Literals at or under the cap are inlined as usual. A larger
    /// literal is delivered to `sink` as `Begin`/`Bytes`/`End` events in
    /// bounded chunks, and a zero-length literal marker is spliced into
    /// the returned frame so the parsed response stays well formed.
    pub async fn read_response_streaming(
        &mut self,
        sink: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<Vec<u8>> {
        self.read_response_inner(Some(sink)).await
    }

    async fn read_response_inner(
        &mut self,
        mut sink: Option<&mut (dyn FnMut(StreamEvent) + Send)>,
    ) -> Result<Vec<u8>> {
        loop {
            // Resume an oversized literal first: its bytes bypass the
            // frame buffer entirely.
            if self.partial.stream_remaining > 0 {
                let Some(sink) = sink.as_deref_mut() else {
                    return Err(Error::Protocol(
                        "literal stream resumed without a sink".to_string(),
                    ));
                };
                while self.partial.stream_remaining > 0 {
                    let buf = self.reader.fill_buf().await?;
                    if buf.is_empty() {
                        return Err(unexpected_eof());
                    }
                    let take = buf.len().min(self.partial.stream_remaining);
                    sink(StreamEvent::Bytes(Bytes::copy_from_slice(&buf[..take])));
                    self.reader.consume(take);
                    self.partial.stream_remaining -= take;
                }
                sink(StreamEvent::End);
            }

            // Resume an inlined literal.
            while self.partial.inline_remaining > 0 {
                let buf = self.reader.fill_buf().await?;
                if buf.is_empty() {
                    return Err(unexpected_eof());
                }
                let take = buf.len().min(self.partial.inline_remaining);
                self.partial.frame.extend_from_slice(&buf[..take]);
                self.reader.consume(take);
                self.partial.inline_remaining -= take;
            }

            // Accumulate the current line up to CRLF.
            loop {
                let buf = self.reader.fill_buf().await?;
                if buf.is_empty() {
                    return Err(unexpected_eof());
                }

                // The CRLF may straddle the previous chunk boundary. Only
                // a CR belonging to the current line counts; a literal
                // ending in CR must not be mistaken for one.
                if self.partial.frame.len() > self.partial.line_start
                    && self.partial.frame.ends_with(b"\r")
                    && buf[0] == b'\n'
                {
                    self.partial.frame.push(b'\n');
                    self.reader.consume(1);
                    break;
                }

                if let Some(pos) = find_crlf(buf) {
                    self.partial.frame.extend_from_slice(&buf[..pos + 2]);
                    self.reader.consume(pos + 2);
                    break;
                }

                let len = buf.len();
                self.partial.frame.extend_from_slice(buf);
                self.reader.consume(len);

                if self.partial.frame.len() - self.partial.line_start > self.line_limit {
                    return Err(Error::Protocol(format!(
                        "line exceeds cap of {} bytes",
                        self.line_limit
                    )));
                }
            }

            // Line complete: does it announce a literal?
            let line = &self.partial.frame[self.partial.line_start..];
            let Some(literal_len) = parse_literal_length(line) else {
                self.partial.line_start = 0;
                return Ok(std::mem::take(&mut self.partial.frame));
            };

            if literal_len > self.literal_limit {
                let Some(sink) = sink.as_deref_mut() else {
                    return Err(Error::Protocol(format!(
                        "literal of {literal_len} bytes exceeds cap of {} bytes",
                        self.literal_limit
                    )));
                };
                // Replace the announced size with an empty literal so the
                // frame the parser sees stays self-consistent.
                truncate_literal_marker(&mut self.partial.frame);
                self.partial.frame.extend_from_slice(b"{0}\r\n");
                self.partial.stream_remaining = literal_len;
                sink(StreamEvent::Begin(literal_len));
            } else {
                self.partial.inline_remaining = literal_len;
            }

            // Framing resumes after the literal; the response continues
            // until a line without a trailing announcement. Streamed
            // bytes bypass the frame, so only inlined bytes shift the
            // next line's start.
            self.partial.line_start = self.partial.frame.len() + self.partial.inline_remaining;
        }
    }

    /// Writes one outbound frame and flushes.
    pub async fn write_frame(&mut self, frame: &Outbound) -> Result<()> {
        let wire = frame.as_wire();
        let stream = self.reader.get_mut();
        stream.write_all(&wire).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Any buffered inbound bytes are discarded. This is deliberate for
    /// the STARTTLS upgrade: plaintext bytes past the completion line
    /// must not survive into the TLS session.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn unexpected_eof() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed",
    ))
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal announcement from the end of a line (`{123}\r\n`).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    if !line.ends_with(b"\r\n") {
        return None;
    }

    let line = &line[..line.len() - 2];
    if !line.ends_with(b"}") {
        return None;
    }

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..line.len() - 1];
    let digits = if digits.ends_with(b"+") {
        &digits[..digits.len() - 1]
    } else {
        digits
    };

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Removes the trailing `{N}\r\n` announcement from a buffered frame.
fn truncate_literal_marker(frame: &mut Vec<u8>) {
    if let Some(open) = frame.iter().rposition(|&b| b == b'{') {
        frame.truncate(open);
    }
}
