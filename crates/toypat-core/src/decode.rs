use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::format::error::FormatError;
use crate::format::header::read_header;
use crate::format::layout;
use crate::format::reader::PatternReader;
use crate::source::{PatternSource, SourceError};
use crate::{Pattern, Version};

/// What to do with a Standard group that has more values than the stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrideOverrun {
    /// Fail with a stride violation.
    #[default]
    Reject,
    /// Keep the first `stride` values and ignore the rest.
    Truncate,
}

/// Decoder settings.
///
/// # Examples
/// ```
/// use toypat_core::{DecodeOptions, StrideOverrun, decode_pattern_with};
///
/// let options = DecodeOptions {
///     stride_overrun: StrideOverrun::Truncate,
///     ..DecodeOptions::default()
/// };
/// let pattern = decode_pattern_with(&b"V:1;F:v;#1;2,9;"[..], &options)?;
/// assert_eq!(pattern.points.len(), 2);
/// # Ok::<(), toypat_core::DecodeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub stride_overrun: StrideOverrun,
    /// Bytes requested from the source per read.
    pub buffer_capacity: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            stride_overrun: StrideOverrun::default(),
            buffer_capacity: layout::DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Decoding step at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Open,
    Header,
    Points,
    Consistency,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot open pattern source: {0}")]
    Source(#[from] SourceError),
    #[error("cannot read header: {0}")]
    Header(#[source] FormatError),
    #[error("cannot read {version} points: {source}")]
    Points {
        version: Version,
        #[source]
        source: FormatError,
    },
    #[error("mismatch: {features} features declared, {width} values per point")]
    Mismatch { features: usize, width: usize },
}

impl DecodeError {
    pub fn stage(&self) -> DecodeStage {
        match self {
            DecodeError::Source(_) => DecodeStage::Open,
            DecodeError::Header(_) => DecodeStage::Header,
            DecodeError::Points { .. } => DecodeStage::Points,
            DecodeError::Mismatch { .. } => DecodeStage::Consistency,
        }
    }

    /// The reader/decoder error behind a header or points failure.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            DecodeError::Header(err) | DecodeError::Points { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

/// Decode a complete pattern with default options.
pub fn decode_pattern<R: Read>(source: R) -> Result<Pattern, DecodeError> {
    decode_pattern_with(source, &DecodeOptions::default())
}

/// Decode a complete pattern: header, version-specific points, then the
/// feature-count check. Any failure discards everything decoded so far.
pub fn decode_pattern_with<R: Read>(
    source: R,
    options: &DecodeOptions,
) -> Result<Pattern, DecodeError> {
    let mut reader = PatternReader::with_capacity(options.buffer_capacity, source);

    let header = read_header(&mut reader).map_err(DecodeError::Header)?;
    let points = header
        .version
        .read_points(&mut reader, options)
        .map_err(|source| DecodeError::Points {
            version: header.version,
            source,
        })?;

    if !points.is_empty() && points.stride() != header.features.len() {
        return Err(DecodeError::Mismatch {
            features: header.features.len(),
            width: points.stride(),
        });
    }

    debug!(
        version = %header.version,
        points = points.len(),
        stride = points.stride(),
        "decoded pattern"
    );
    Ok(Pattern { header, points })
}

pub fn decode_pattern_bytes(bytes: &[u8]) -> Result<Pattern, DecodeError> {
    decode_pattern(bytes)
}

/// Open `path` (or stdin for `-`) and decode it.
pub fn decode_pattern_file(path: &Path) -> Result<Pattern, DecodeError> {
    let source = PatternSource::open(path)?;
    decode_pattern(source)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{Feature, Strength};

    const EDGE: &[u8] = b"V:1;T:Edge;F:v1,v2;S:100;M:deadbeef;#\n0,1;1,0;1,0;0,1;20,0;0,20;20,20;0,0;0,0;#\n";

    #[test]
    fn decodes_standard_pattern() {
        let pattern = decode_pattern_bytes(EDGE).unwrap();
        assert_eq!(pattern.header.version, Version::Standard);
        assert_eq!(pattern.header.device_type.as_deref(), Some("Edge"));
        assert_eq!(
            pattern.header.features,
            vec![Feature::from("v1"), Feature::from("v2")]
        );
        assert_eq!(pattern.header.interval, Duration::from_millis(100));
        assert_eq!(pattern.header.content_hash.as_deref(), Some("deadbeef"));
        assert_eq!(pattern.points.get(0), Some(&[Strength(0), Strength(1)][..]));
        assert_eq!(pattern.points.len(), 9);
        assert!(pattern.points.iter().all(|p| p.len() == 2));
    }

    #[test]
    fn decodes_legacy_pattern() {
        let pattern = decode_pattern_bytes(b"0,0,0,8,8,8,7,7,7,6").unwrap();
        assert_eq!(pattern.header, crate::Header::default());
        assert_eq!(pattern.points.len(), 10);
        assert_eq!(pattern.points.get(3), Some(&[Strength(8)][..]));
    }

    #[test]
    fn version_zero_header_reads_legacy_points() {
        let pattern = decode_pattern_bytes(b"V:0;S:50;#1,2,3").unwrap();
        assert_eq!(pattern.header.version, Version::Legacy);
        assert_eq!(pattern.header.interval, Duration::from_millis(50));
        assert_eq!(pattern.points.stride(), 1);
        assert_eq!(pattern.points.to_vecs(), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(pattern.duration(), Duration::from_millis(150));

        let err = decode_pattern_bytes(b"V:0;#1;2").unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Points);
        assert!(err.to_string().starts_with("cannot read V:0 points"));
    }

    #[test]
    fn empty_input_is_empty_legacy_pattern() {
        let pattern = decode_pattern_bytes(b"").unwrap();
        assert_eq!(pattern, Pattern::default());
    }

    #[test]
    fn header_error_is_tagged() {
        let err = decode_pattern_bytes(b"V:x;#1;").unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Header);
        assert!(err.to_string().starts_with("cannot read header"));
        assert!(matches!(
            err.format_error(),
            Some(FormatError::InvalidHeaderField { field: "V", .. })
        ));
    }

    #[test]
    fn points_error_is_tagged_with_version() {
        let err = decode_pattern_bytes(b"V:1;F:v1,v2;#0,1;1;").unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Points);
        assert!(err.to_string().starts_with("cannot read V:1 points"));
        assert!(matches!(
            err.format_error(),
            Some(FormatError::StrideViolation { .. })
        ));
    }

    #[test]
    fn feature_count_mismatch_is_error() {
        let err = decode_pattern_bytes(b"V:1;F:v1,v2,p;#1,2;3,4;").unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Consistency);
        assert!(matches!(
            err,
            DecodeError::Mismatch {
                features: 3,
                width: 2
            }
        ));
    }

    #[test]
    fn default_feature_with_wide_points_is_mismatch() {
        let err = decode_pattern_bytes(b"V:1;#1,2;").unwrap_err();
        assert!(matches!(err, DecodeError::Mismatch { features: 1, width: 2 }));
    }

    #[test]
    fn header_without_points_is_valid() {
        let pattern = decode_pattern_bytes(b"V:1;F:v1,v2;#").unwrap();
        assert!(pattern.points.is_empty());
        assert_eq!(pattern.header.features.len(), 2);
    }

    #[test]
    fn decoding_is_deterministic() {
        let first = decode_pattern_bytes(EDGE).unwrap();
        let second = decode_pattern_bytes(EDGE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn lenient_stride_truncates() {
        let options = DecodeOptions {
            stride_overrun: StrideOverrun::Truncate,
            buffer_capacity: 4,
        };
        let pattern = decode_pattern_with(&b"V:1;F:v1,v2;#0,1;1,0,9;"[..], &options).unwrap();
        assert_eq!(pattern.points.to_vecs(), vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = decode_pattern_file(Path::new("/nonexistent/toypat.pat")).unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Open);
    }
}
