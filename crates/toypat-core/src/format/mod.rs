//! Pattern file decoding.
//!
//! Each layer has one job:
//! - `layout`: wire constants (separators, header keys, defaults)
//! - `scanner`: allocation-free splitting of an in-memory slice
//! - `reader`: buffered access to the byte stream and token conventions
//! - `header`, `legacy`, `standard`: decoders for each part of a file
//! - `error`: explicit, actionable errors
//!
//! Decoders contain no file handling; `source` and `decode` own I/O and
//! assembly.

pub mod error;
pub mod header;
pub mod layout;
pub mod legacy;
pub mod reader;
pub mod scanner;
pub mod standard;

use std::io::Read;

use crate::decode::DecodeOptions;
use crate::{Points, Version};
use error::FormatError;
use reader::PatternReader;

impl Version {
    /// Decode the data section with the grammar this version uses.
    pub(crate) fn read_points<R: Read>(
        self,
        reader: &mut PatternReader<R>,
        options: &DecodeOptions,
    ) -> Result<Points, FormatError> {
        match self {
            Version::Legacy => legacy::read_points(reader),
            Version::Standard => standard::read_points(reader, options.stride_overrun),
        }
    }
}
