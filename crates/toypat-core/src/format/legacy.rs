use std::io::Read;

use tracing::{debug, trace};

use super::error::FormatError;
use super::layout;
use super::reader::{PatternReader, parse_strength};
use super::scanner::count_byte;
use crate::Points;

/// Decode a headerless single-channel stream: one `,`-separated value per step.
///
/// Blank tokens and surrounding whitespace are skipped. A lone `#` token ends
/// the data section.
pub fn read_points<R: Read>(reader: &mut PatternReader<R>) -> Result<Points, FormatError> {
    let hint = count_byte(reader.buffered(), layout::VALUE_SEPARATOR) + 1;
    trace!(hint, "presizing legacy points");
    let mut values = Vec::with_capacity(hint);

    while let Some(segment) = reader.read_segment(layout::VALUE_SEPARATOR)? {
        let token = segment.bytes.trim_ascii();
        if token.is_empty() {
            continue;
        }
        if token == layout::DATA_TERMINATOR {
            break;
        }
        values.push(parse_strength(token)?);
    }

    debug!(points = values.len(), "decoded legacy points");
    Ok(Points::from_flat(1, values))
}
