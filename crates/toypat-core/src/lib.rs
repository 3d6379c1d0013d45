//! toypat core library for decoding vibration pattern files.
//!
//! A pattern file is a small `key:value` header followed by one intensity
//! value per motor channel per time step. Two sub-formats exist: a headerless
//! single-channel Legacy stream and a multi-channel Standard stream. Both are
//! decoded incrementally from any `std::io::Read`.
//!
//! The crate is layered the same way for both sub-formats:
//! - `format::scanner`: allocation-free token splitting
//! - `format::reader`: buffering and token conventions
//! - `format::header`, `format::legacy`, `format::standard`: decoders
//! - `decode`: the assembler and its stage-tagged errors
//!
//! Invariants:
//! - A decoded header always names at least one feature.
//! - Every point of a pattern has the same width, equal to the feature count.
//! - Decoding is a pure function of the input bytes.
//!
//! # Examples
//! ```
//! use std::time::Duration;
//!
//! use toypat_core::{Version, decode_pattern_bytes};
//!
//! let pattern = decode_pattern_bytes(b"V:1;T:Edge;F:v1,v2;S:100;#0,1;20,0;")?;
//! assert_eq!(pattern.header.version, Version::Standard);
//! assert_eq!(pattern.header.interval, Duration::from_millis(100));
//! assert_eq!(pattern.points.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

mod decode;
mod format;
mod source;

pub use decode::{
    DecodeError, DecodeOptions, DecodeStage, StrideOverrun, decode_pattern, decode_pattern_bytes,
    decode_pattern_file, decode_pattern_with,
};
pub use format::error::FormatError;
pub use format::reader::{PatternReader, Segment};
pub use format::scanner::SepScanner;
pub use source::{PatternSource, SourceError};

use format::layout;

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Pattern format version.
///
/// Selects both the header shape and the point grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    /// Headerless, single channel, strengths in 0..=100.
    #[default]
    Legacy,
    /// `V:1` header, one `;`-terminated group per step, strengths in 0..=20.
    Standard,
}

impl Version {
    pub fn number(self) -> u8 {
        match self {
            Version::Legacy => 0,
            Version::Standard => 1,
        }
    }

    /// Raw strength that maps to full intensity.
    pub fn full_scale(self) -> f64 {
        match self {
            Version::Legacy => layout::LEGACY_FULL_SCALE,
            Version::Standard => layout::STANDARD_FULL_SCALE,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V:{}", self.number())
    }
}

impl TryFrom<i64> for Version {
    type Error = FormatError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::Legacy),
            1 => Ok(Version::Standard),
            _ => Err(FormatError::UnsupportedVersion { value }),
        }
    }
}

/// Motor channel token from the `F` header field.
///
/// Tokens are kept verbatim; [`Feature::kind`] only classifies the ones
/// vendor software is known to emit.
///
/// # Examples
/// ```
/// use toypat_core::{Feature, FeatureKind};
///
/// assert_eq!(Feature::new("v2").kind(), Some(FeatureKind::Vibrate2));
/// assert_eq!(Feature::new("zz").kind(), None);
/// assert_eq!(Feature::default().as_str(), "v");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Feature(String);

impl Feature {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<FeatureKind> {
        match self.0.as_str() {
            "p" => Some(FeatureKind::AirPump),
            "r" => Some(FeatureKind::Rotate),
            "v" => Some(FeatureKind::Vibrate),
            "v1" => Some(FeatureKind::Vibrate1),
            "v2" => Some(FeatureKind::Vibrate2),
            _ => None,
        }
    }
}

impl Default for Feature {
    fn default() -> Self {
        Self::new(layout::DEFAULT_FEATURE)
    }
}

impl From<&str> for Feature {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel kinds known from vendor software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    AirPump,
    Rotate,
    Vibrate,
    Vibrate1,
    Vibrate2,
}

/// Everything before the `#` of a Standard file, or the Legacy defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: Version,
    /// Device type from `T` (no validation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Channels in point order; never empty.
    pub features: Vec<Feature>,
    /// Time between consecutive points.
    #[serde(rename = "interval_ms", serialize_with = "serialize_millis")]
    pub interval: Duration,
    /// Content hash from `M` (not verified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: Version::Legacy,
            device_type: None,
            features: vec![Feature::default()],
            interval: Duration::from_millis(layout::DEFAULT_INTERVAL_MS),
            content_hash: None,
        }
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(saturating_millis(*value))
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

/// Raw intensity of one channel at one step.
///
/// # Examples
/// ```
/// use toypat_core::{Strength, Version};
///
/// assert_eq!(Strength(50).scale(Version::Legacy), 0.5);
/// assert_eq!(Strength(25).scale(Version::Standard), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Strength(pub u8);

impl Strength {
    /// Normalize to `[0.0, 1.0]`, clamping out-of-range values.
    pub fn scale(self, version: Version) -> f64 {
        (f64::from(self.0) / version.full_scale()).clamp(0.0, 1.0)
    }
}

/// Append the scaled strengths of `point` to `out`.
pub fn scale_point_into(point: &[Strength], version: Version, out: &mut Vec<f64>) {
    out.reserve(point.len());
    out.extend(point.iter().map(|s| s.scale(version)));
}

/// Ordered points of equal width, stored flat.
///
/// # Examples
/// ```
/// use toypat_core::{Strength, decode_pattern_bytes};
///
/// let pattern = decode_pattern_bytes(b"V:1;F:v1,v2;#1,2;3,4;")?;
/// let points = &pattern.points;
/// assert_eq!(points.stride(), 2);
/// assert_eq!(points.get(1), Some(&[Strength(3), Strength(4)][..]));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Points {
    stride: usize,
    values: Vec<Strength>,
}

impl Points {
    pub(crate) fn from_flat(stride: usize, values: Vec<Strength>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        debug_assert!(stride > 0 && values.len() % stride == 0);
        Self { stride, values }
    }

    /// Values per point; `0` when there are no points.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.values.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[Strength]> {
        let start = index.checked_mul(self.stride)?;
        let end = start.checked_add(self.stride)?;
        self.values.get(start..end).filter(|p| !p.is_empty())
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, Strength> {
        self.values.chunks_exact(self.stride.max(1))
    }

    /// Scaled copy of every point.
    pub fn scaled(&self, version: Version) -> Vec<Vec<f64>> {
        self.iter()
            .map(|point| {
                let mut out = Vec::with_capacity(point.len());
                scale_point_into(point, version, &mut out);
                out
            })
            .collect()
    }

    pub fn to_vecs(&self) -> Vec<Vec<u8>> {
        self.iter()
            .map(|point| point.iter().map(|s| s.0).collect())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Points {
    type Item = &'a [Strength];
    type IntoIter = std::slice::ChunksExact<'a, Strength>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// A decoded pattern file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pattern {
    #[serde(flatten)]
    pub header: Header,
    pub points: Points,
}

impl Pattern {
    /// Playback length: one interval per point.
    pub fn duration(&self) -> Duration {
        self.header
            .interval
            .saturating_mul(u32::try_from(self.points.len()).unwrap_or(u32::MAX))
    }

    pub fn scaled(&self) -> Vec<Vec<f64>> {
        self.points.scaled(self.header.version)
    }
}

/// JSON report written by the CLI for one decoded file.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    pub input: InputInfo,
    /// Playback length in milliseconds.
    pub duration_ms: u64,
    pub pattern: Pattern,
    /// Points normalized to `[0.0, 1.0]`, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<Vec<Vec<f64>>>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Input metadata embedded in reports.
#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    /// Input path as provided, or `-` for stdin.
    pub path: String,
    /// Bytes read from the input.
    pub bytes: u64,
}

/// Wrap a decoded pattern into a versioned report.
///
/// # Examples
/// ```
/// use toypat_core::{Pattern, make_report};
///
/// let report = make_report("a.pat", 0, Pattern::default(), false);
/// assert_eq!(report.report_version, toypat_core::REPORT_VERSION);
/// assert!(report.scaled.is_none());
/// ```
pub fn make_report(
    input_path: &str,
    input_bytes: u64,
    pattern: Pattern,
    with_scaled: bool,
) -> DecodeReport {
    let scaled = with_scaled.then(|| pattern.scaled());
    DecodeReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "toypat".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        duration_ms: saturating_millis(pattern.duration()),
        pattern,
        scaled,
    }
}
