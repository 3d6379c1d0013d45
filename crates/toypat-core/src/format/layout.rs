/// Two bytes that open a Standard header. Anything else is headerless Legacy data.
pub const HEADER_MAGIC: &[u8; 2] = b"V:";
pub const HEADER_TERMINATOR: u8 = b'#';
pub const FIELD_SEPARATOR: u8 = b';';
pub const KEY_SEPARATOR: u8 = b':';
pub const VALUE_SEPARATOR: u8 = b',';

/// Ends the data section when it appears as a whole group or token.
pub const DATA_TERMINATOR: &[u8] = b"#";

pub const KEY_VERSION: &[u8] = b"V";
pub const KEY_DEVICE_TYPE: &[u8] = b"T";
pub const KEY_FEATURES: &[u8] = b"F";
pub const KEY_INTERVAL: &[u8] = b"S";
pub const KEY_CONTENT_HASH: &[u8] = b"M";

pub const DEFAULT_FEATURE: &str = "v";
pub const DEFAULT_INTERVAL_MS: u64 = 100;

pub const LEGACY_FULL_SCALE: f64 = 100.0;
pub const STANDARD_FULL_SCALE: f64 = 20.0;

pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;
