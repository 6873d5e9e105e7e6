//! Tokio codec for IRC lines.
//!
//! Decodes CRLF (or bare LF) terminated lines into [`Message`]s and encodes
//! outgoing messages with a CRLF terminator.
//!
//! Nothing a peer sends can end the stream: bytes that are not UTF-8 are read
//! as Windows-1252, and an overlong line is dropped and reported as a
//! per-line [`MessageParseError::LineTooLong`].

use bytes::{BufMut, BytesMut};
use encoding::{UTF_8, WINDOWS_1252};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{MessageParseError, ProtocolError};
use crate::message::Message;

/// Default maximum line length accepted from the server.
///
/// RFC 1459 allows 512 bytes; IRCv3 tags can add up to 8191 more.
pub const DEFAULT_MAX_LINE_LEN: usize = 8191 + 512;

/// Line codec producing parsed IRC messages.
///
/// A line that fails to parse is yielded as `Err(MessageParseError)` rather than
/// terminating the stream, so the caller can log it and carry on.
#[derive(Debug)]
pub struct IrcCodec {
    /// Index of the next byte to scan for a newline.
    next_index: usize,
    max_len: usize,
    /// Skipping the tail of an overlong line up to its newline.
    discarding: bool,
}

impl IrcCodec {
    /// Create a codec with [`DEFAULT_MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a codec with a custom maximum line length (terminator excluded).
    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    fn too_long(&self) -> Result<Message, MessageParseError> {
        Err(MessageParseError::LineTooLong { max: self.max_len })
    }

    /// Turn one raw line (terminator included or not) into a decoded item.
    /// `None` for blank lines.
    fn line(&self, raw: &[u8]) -> Option<Result<Message, MessageParseError>> {
        let content = strip_terminator(raw);
        if content.len() > self.max_len {
            return Some(self.too_long());
        }
        let text = decode_text(content);
        if text.trim().is_empty() {
            return None;
        }
        Some(text.parse::<Message>())
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_terminator(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

/// UTF-8 when the bytes are valid UTF-8, Windows-1252 otherwise.
fn decode_text(bytes: &[u8]) -> String {
    let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

impl Decoder for IrcCodec {
    type Item = Result<Message, MessageParseError>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // Room for the terminator on top of the content limit.
                if src.len() > self.max_len + 2 {
                    src.clear();
                    self.next_index = 0;
                    if !self.discarding {
                        self.discarding = true;
                        return Ok(Some(self.too_long()));
                    }
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let raw = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            // Blank keepalive lines are not worth reporting.
            if let Some(item) = self.line(&raw) {
                return Ok(Some(item));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let raw = src.split_to(src.len());
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            return Ok(None);
        }
        Ok(self.line(&raw))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = msg.to_string();
        // Never let embedded newlines smuggle extra commands onto the wire.
        let line = line.replace(['\r', '\n'], " ");
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
