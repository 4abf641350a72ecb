//! Newline-delimited JSON framing
//!
//! Every envelope is one line of compact UTF-8 JSON terminated by `\n`.
//! Decoding distinguishes three outcomes:
//! - a complete frame (value plus the number of bytes it used),
//! - [`Decoded::Incomplete`] when the terminating newline has not arrived,
//! - [`DecodeError`] for a line that is not a valid envelope.
//!
//! None of these functions panic on arbitrary input.

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::envelope::{CommandEnvelope, ResultEnvelope};

/// Largest frame accepted before the stream is treated as hostile (1 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line is not valid UTF-8 JSON of the expected shape
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// No newline within the frame size limit
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
}

/// Result of decoding from a byte buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Complete { value: T, consumed: usize },
    Incomplete,
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_command(envelope: &CommandEnvelope) -> Vec<u8> {
    frame(envelope.to_json().to_string())
}

pub fn encode_result(envelope: &ResultEnvelope) -> Vec<u8> {
    frame(envelope.to_json().to_string())
}

fn frame(json: String) -> Vec<u8> {
    let mut bytes = json.into_bytes();
    bytes.push(b'\n');
    bytes
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode the first command frame in `bytes`
pub fn decode_command(bytes: &[u8]) -> Result<Decoded<CommandEnvelope>, DecodeError> {
    decode_first(bytes, parse_command)
}

/// Decode the first result frame in `bytes`
pub fn decode_result(bytes: &[u8]) -> Result<Decoded<ResultEnvelope>, DecodeError> {
    decode_first(bytes, parse_result)
}

/// Parse one unframed command (e.g. an HTTP body)
pub fn parse_command(line: &[u8]) -> Result<CommandEnvelope, DecodeError> {
    parse(line)
}

/// Parse one unframed result
pub fn parse_result(line: &[u8]) -> Result<ResultEnvelope, DecodeError> {
    parse(line)
}

fn parse<T: DeserializeOwned>(line: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(line).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn decode_first<T>(
    bytes: &[u8],
    parse: fn(&[u8]) -> Result<T, DecodeError>,
) -> Result<Decoded<T>, DecodeError> {
    let mut offset = 0;
    while let Some((line, consumed)) = split_line(&bytes[offset..]) {
        offset += consumed;
        if is_blank(line) {
            continue;
        }
        return parse(line).map(|value| Decoded::Complete {
            value,
            consumed: offset,
        });
    }
    Ok(Decoded::Incomplete)
}

/// Split off the first line, without its `\n` (and an optional `\r`)
fn split_line(bytes: &[u8]) -> Option<(&[u8], usize)> {
    let pos = bytes.iter().position(|b| *b == b'\n')?;
    let line = &bytes[..pos];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, pos + 1))
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

// ============================================================================
// Streaming decoder
// ============================================================================

/// Receive buffer for one connection
///
/// Bytes are pushed as they arrive; complete frames are taken off the front.
/// A malformed line is consumed before its error is returned, so the next
/// call continues with the following frame.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame_bytes: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_bytes,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet decoded
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn next_command(&mut self) -> Result<Option<CommandEnvelope>, DecodeError> {
        self.next_frame(parse_command)
    }

    pub fn next_result(&mut self) -> Result<Option<ResultEnvelope>, DecodeError> {
        self.next_frame(parse_result)
    }

    fn next_frame<T>(
        &mut self,
        parse: fn(&[u8]) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        loop {
            let Some((line, consumed)) = split_line(&self.buf) else {
                if self.buf.len() > self.max_frame_bytes {
                    self.buf.clear();
                    return Err(DecodeError::FrameTooLarge {
                        limit: self.max_frame_bytes,
                    });
                }
                return Ok(None);
            };

            if line.len() > self.max_frame_bytes {
                self.buf.drain(..consumed);
                return Err(DecodeError::FrameTooLarge {
                    limit: self.max_frame_bytes,
                });
            }

            if is_blank(line) {
                self.buf.drain(..consumed);
                continue;
            }

            let parsed = parse(line);
            self.buf.drain(..consumed);
            return parsed.map(Some);
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}
