//! Byte sources for pattern decoding.
//!
//! All file and stdin access lives here so the decoders stay pure. A
//! [`PatternSource`] counts the bytes it hands out, which the CLI reports for
//! inputs whose size is not known up front.

use std::fs::File;
use std::io::{self, Read, Stdin};
use std::path::Path;

use thiserror::Error;

/// Path that selects standard input.
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("not a regular file: {path}")]
    NotAFile { path: String },
}

/// A file or stdin, read sequentially.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// use toypat_core::{PatternSource, decode_pattern};
///
/// let mut source = PatternSource::open(Path::new("edge.pat"))?;
/// let pattern = decode_pattern(&mut source)?;
/// println!("{} points from {} bytes", pattern.points.len(), source.bytes_read());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PatternSource {
    input: Input,
    bytes_read: u64,
}

#[derive(Debug)]
enum Input {
    File(File),
    Stdin(Stdin),
}

impl PatternSource {
    /// Open `path`, or stdin when `path` is `-`.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if path.as_os_str() == STDIN_PATH {
            return Ok(Self::stdin());
        }
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(SourceError::NotAFile {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            input: Input::File(file),
            bytes_read: 0,
        })
    }

    pub fn stdin() -> Self {
        Self {
            input: Input::Stdin(io::stdin()),
            bytes_read: 0,
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self.input, Input::Stdin(_))
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl Read for PatternSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match &mut self.input {
            Input::File(file) => file.read(buf)?,
            Input::Stdin(stdin) => stdin.read(buf)?,
        };
        self.bytes_read += n as u64;
        Ok(n)
    }
}
