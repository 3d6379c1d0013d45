use std::io::Read;

use tracing::{debug, trace, warn};

use super::error::{FormatError, lossy};
use super::layout;
use super::reader::{PatternReader, parse_strength};
use super::scanner::{SepScanner, count_byte};
use crate::decode::StrideOverrun;
use crate::{Points, Strength};

/// Decode `;`-terminated groups of `,`-separated values, one group per step.
///
/// The first non-blank group fixes the stride. Shorter groups are always a
/// stride violation; longer ones are rejected or truncated per `overrun`.
/// A lone `#` group ends the data section.
pub fn read_points<R: Read>(
    reader: &mut PatternReader<R>,
    overrun: StrideOverrun,
) -> Result<Points, FormatError> {
    let buffered = reader.buffered();
    let hint = count_byte(buffered, layout::FIELD_SEPARATOR)
        + count_byte(buffered, layout::VALUE_SEPARATOR)
        + 1;
    trace!(hint, "presizing standard points");
    let mut values = Vec::with_capacity(hint);
    let mut stride = None;

    while let Some(segment) = reader.read_segment(layout::FIELD_SEPARATOR)? {
        let group = segment.bytes.trim_ascii();
        if group.is_empty() {
            continue;
        }
        if group == layout::DATA_TERMINATOR {
            break;
        }
        let stride = *stride.get_or_insert_with(|| count_byte(group, layout::VALUE_SEPARATOR) + 1);
        read_group(group, stride, overrun, &mut values)?;
    }

    let stride = stride.unwrap_or(0);
    debug!(stride, points = values.len() / stride.max(1), "decoded standard points");
    Ok(Points::from_flat(stride, values))
}

fn read_group(
    group: &[u8],
    stride: usize,
    overrun: StrideOverrun,
    out: &mut Vec<Strength>,
) -> Result<(), FormatError> {
    let mut tokens = SepScanner::new(group, layout::VALUE_SEPARATOR);
    for taken in 0..stride {
        let token = tokens
            .next()
            .ok_or_else(|| stride_violation(group, stride, taken))?;
        out.push(parse_strength(token.trim_ascii())?);
    }

    let extra = tokens.count();
    if extra > 0 {
        match overrun {
            StrideOverrun::Reject => return Err(stride_violation(group, stride, stride + extra)),
            StrideOverrun::Truncate => {
                warn!(group = %lossy(group), stride, extra, "ignoring values beyond stride");
            }
        }
    }
    Ok(())
}

fn stride_violation(group: &[u8], expected: usize, actual: usize) -> FormatError {
    FormatError::StrideViolation {
        group: lossy(group),
        expected,
        actual,
    }
}
