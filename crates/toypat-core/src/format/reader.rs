use std::io::{ErrorKind, Read};

use tracing::trace;

use super::error::{FormatError, lossy};
use super::layout;
use crate::Strength;

/// Incremental reader over a pattern byte stream.
///
/// Owns its read-ahead buffer, so callers never have to pre-buffer or
/// pre-chunk their source. Bytes are pulled in chunks of the configured
/// capacity; a segment longer than one chunk grows the buffer until its
/// delimiter (or end of input) is found.
///
/// # Examples
/// ```
/// use toypat_core::PatternReader;
///
/// let mut reader = PatternReader::with_capacity(2, &b"ab;cd"[..]);
/// assert_eq!(reader.peek(2)?, b"ab");
/// let segment = reader.read_segment(b';')?.expect("segment");
/// assert_eq!(segment.bytes, b"ab");
/// assert!(segment.terminated);
/// let segment = reader.read_segment(b';')?.expect("segment");
/// assert_eq!(segment.bytes, b"cd");
/// assert!(!segment.terminated);
/// assert!(reader.read_segment(b';')?.is_none());
/// # Ok::<(), toypat_core::FormatError>(())
/// ```
#[derive(Debug)]
pub struct PatternReader<R> {
    source: R,
    buf: Vec<u8>,
    pos: usize,
    chunk: usize,
    eof: bool,
}

/// Bytes up to (not including) a delimiter.
#[derive(Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub bytes: &'a [u8],
    /// False when the segment was ended by end of input instead of the delimiter.
    pub terminated: bool,
}

impl<R: Read> PatternReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_capacity(layout::DEFAULT_BUFFER_CAPACITY, source)
    }

    pub fn with_capacity(capacity: usize, source: R) -> Self {
        let chunk = capacity.max(1);
        Self {
            source,
            buf: Vec::with_capacity(chunk),
            pos: 0,
            chunk,
            eof: false,
        }
    }

    /// Bytes already read from the source but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Return up to `n` upcoming bytes without consuming them.
    ///
    /// Fewer than `n` bytes are returned only at end of input.
    pub fn peek(&mut self, n: usize) -> Result<&[u8], FormatError> {
        while self.buf.len() - self.pos < n && !self.eof {
            self.fill()?;
        }
        let end = (self.pos + n).min(self.buf.len());
        Ok(&self.buf[self.pos..end])
    }

    /// Consume and return the bytes before the next `delim`.
    ///
    /// The delimiter itself is consumed but not returned. At end of input the
    /// remaining bytes are returned once as an unterminated segment, then
    /// `None` on every later call.
    pub fn read_segment(&mut self, delim: u8) -> Result<Option<Segment<'_>>, FormatError> {
        let mut scanned = self.pos;
        loop {
            if let Some(offset) = self.buf[scanned..].iter().position(|&b| b == delim) {
                let start = self.pos;
                let end = scanned + offset;
                self.pos = end + 1;
                return Ok(Some(Segment {
                    bytes: &self.buf[start..end],
                    terminated: true,
                }));
            }
            if self.eof {
                if self.pos == self.buf.len() {
                    return Ok(None);
                }
                let start = self.pos;
                self.pos = self.buf.len();
                return Ok(Some(Segment {
                    bytes: &self.buf[start..],
                    terminated: false,
                }));
            }
            let searched = self.buf.len() - self.pos;
            self.fill()?;
            scanned = self.pos + searched;
        }
    }

    fn fill(&mut self) -> Result<usize, FormatError> {
        if self.eof {
            return Ok(0);
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + self.chunk, 0);
        let read = loop {
            match self.source.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err.into());
                }
            }
        };
        self.buf.truncate(start + read);
        if read == 0 {
            self.eof = true;
        }
        trace!(read, buffered = self.buf.len(), "refilled pattern buffer");
        Ok(read)
    }
}

/// Parse one data token as an 8-bit strength.
///
/// Only plain ASCII digits are accepted; signs and whitespace are rejected.
pub(crate) fn parse_strength(token: &[u8]) -> Result<Strength, FormatError> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(FormatError::InvalidPoint {
            token: lossy(token),
            reason: "not a non-negative integer".to_string(),
        });
    }
    let value = token
        .iter()
        .try_fold(0u8, |acc, &digit| acc.checked_mul(10)?.checked_add(digit - b'0'));
    value.map(Strength).ok_or_else(|| FormatError::InvalidPoint {
        token: lossy(token),
        reason: format!("exceeds maximum {}", u8::MAX),
    })
}
