use std::io::Read;
use std::time::Duration;

use tracing::debug;

use super::error::{FormatError, lossy};
use super::layout;
use super::reader::PatternReader;
use super::scanner::{SepScanner, split_once};
use crate::{Feature, Header, Version};

/// Decode the header, or return the Legacy defaults when there is none.
///
/// Nothing is consumed unless the stream starts with `V:`. Otherwise every
/// byte through the `#` terminator is consumed.
pub fn read_header<R: Read>(reader: &mut PatternReader<R>) -> Result<Header, FormatError> {
    let mut header = Header::default();

    if reader.peek(layout::HEADER_MAGIC.len())? != &layout::HEADER_MAGIC[..] {
        debug!("no header magic, decoding as legacy stream");
        return Ok(header);
    }

    let raw = match reader.read_segment(layout::HEADER_TERMINATOR)? {
        Some(segment) if segment.terminated => segment.bytes,
        _ => {
            return Err(FormatError::UnexpectedEof {
                context: "header terminator '#' not found",
            });
        }
    };

    for field in SepScanner::new(raw, layout::FIELD_SEPARATOR) {
        let Some((key, value)) = split_once(field, layout::KEY_SEPARATOR) else {
            continue;
        };
        match key {
            layout::KEY_VERSION => {
                header.version = Version::try_from(parse_int::<i64>("V", value)?)?;
            }
            layout::KEY_DEVICE_TYPE => header.device_type = non_empty(value),
            layout::KEY_FEATURES => header.features = parse_features(value),
            layout::KEY_INTERVAL => {
                header.interval = Duration::from_millis(parse_int::<u64>("S", value)?);
            }
            layout::KEY_CONTENT_HASH => header.content_hash = non_empty(value),
            _ => {}
        }
    }

    debug!(
        version = %header.version,
        features = header.features.len(),
        interval_ms = crate::saturating_millis(header.interval),
        "decoded pattern header"
    );
    Ok(header)
}

fn parse_int<T: std::str::FromStr>(field: &'static str, value: &[u8]) -> Result<T, FormatError>
where
    T::Err: std::fmt::Display,
{
    let invalid = |reason: String| FormatError::InvalidHeaderField {
        field,
        value: lossy(value),
        reason,
    };
    std::str::from_utf8(value)
        .map_err(|err| invalid(err.to_string()))?
        .parse::<T>()
        .map_err(|err| invalid(err.to_string()))
}

/// Comma-split channel list. Always yields at least one feature.
fn parse_features(value: &[u8]) -> Vec<Feature> {
    SepScanner::new(value, layout::VALUE_SEPARATOR)
        .map(|token| Feature::new(lossy(token)))
        .collect()
}

fn non_empty(value: &[u8]) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(lossy(value))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::read_header;
    use crate::format::reader::PatternReader;
    use crate::{Feature, FormatError, Header, Version};

    fn header_of(input: &[u8]) -> Result<Header, FormatError> {
        read_header(&mut PatternReader::new(input))
    }

    #[test]
    fn full_header() {
        let header = header_of(b"V:1;T:Edge;F:v1,v2;S:100;M:deadbeef;#").unwrap();
        assert_eq!(
            header,
            Header {
                version: Version::Standard,
                device_type: Some("Edge".to_string()),
                features: vec![Feature::from("v1"), Feature::from("v2")],
                interval: Duration::from_millis(100),
                content_hash: Some("deadbeef".to_string()),
            }
        );
    }

    #[test]
    fn missing_magic_consumes_nothing() {
        let mut reader = PatternReader::new(&b"0,5,10"[..]);
        let header = read_header(&mut reader).unwrap();
        assert_eq!(header, Header::default());
        assert_eq!(reader.buffered(), b"0,5,10");
    }

    #[test]
    fn empty_and_one_byte_inputs_are_legacy() {
        assert_eq!(header_of(b"").unwrap(), Header::default());
        assert_eq!(header_of(b"V").unwrap(), Header::default());
    }

    #[test]
    fn absent_fields_keep_defaults() {
        let header = header_of(b"V:1;#").unwrap();
        assert_eq!(header.version, Version::Standard);
        assert_eq!(header.features, vec![Feature::from("v")]);
        assert_eq!(header.interval, Duration::from_millis(100));
        assert!(header.device_type.is_none());
        assert!(header.content_hash.is_none());
    }

    #[test]
    fn unknown_keys_and_bare_fields_are_ignored() {
        let header = header_of(b"V:1;X:zz;junk;;S:250;#").unwrap();
        assert_eq!(header.interval, Duration::from_millis(250));
    }

    #[test]
    fn value_keeps_later_colons() {
        let header = header_of(b"V:1;M:ab:cd;#").unwrap();
        assert_eq!(header.content_hash.as_deref(), Some("ab:cd"));
    }

    #[test]
    fn header_stops_at_terminator() {
        let mut reader = PatternReader::new(&b"V:1;F:p;#1;2;"[..]);
        let header = read_header(&mut reader).unwrap();
        assert_eq!(header.features, vec![Feature::from("p")]);
        assert_eq!(reader.buffered(), b"1;2;");
    }

    #[test]
    fn missing_terminator_is_unexpected_eof() {
        let err = header_of(b"V:1;T:Edge").unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
        assert!(err.is_transport());
    }

    #[test]
    fn non_integer_version_names_field() {
        let err = header_of(b"V:one;#").unwrap_err();
        match err {
            FormatError::InvalidHeaderField { field, value, .. } => {
                assert_eq!(field, "V");
                assert_eq!(value, "one");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unsupported_version() {
        let err = header_of(b"V:2;#").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion { value: 2 }));
    }

    #[test]
    fn bad_interval_names_field() {
        for input in [&b"V:1;S:fast;#"[..], &b"V:1;S:-5;#"[..]] {
            let err = header_of(input).unwrap_err();
            assert!(
                matches!(err, FormatError::InvalidHeaderField { field: "S", .. }),
                "{err:?}"
            );
        }
    }

    #[test]
    fn version_zero_header() {
        let header = header_of(b"V:0;F:v;S:50;#").unwrap();
        assert_eq!(header.version, Version::Legacy);
        assert_eq!(header.interval, Duration::from_millis(50));
    }
}
