/// Splits a borrowed byte slice on a single delimiter byte.
///
/// Consecutive delimiters produce empty tokens; callers decide whether an
/// empty token is meaningful. Once the tail after the last delimiter has been
/// returned, every further call yields `None`.
///
/// # Examples
/// ```
/// use toypat_core::SepScanner;
///
/// let mut scanner = SepScanner::new(b"1,,2", b',');
/// assert_eq!(scanner.next(), Some(&b"1"[..]));
/// assert_eq!(scanner.next(), Some(&b""[..]));
/// assert_eq!(scanner.next(), Some(&b"2"[..]));
/// assert_eq!(scanner.next(), None);
/// ```
#[derive(Debug, Clone)]
pub struct SepScanner<'a> {
    rest: Option<&'a [u8]>,
    delim: u8,
}

impl<'a> SepScanner<'a> {
    pub fn new(bytes: &'a [u8], delim: u8) -> Self {
        Self {
            rest: Some(bytes),
            delim,
        }
    }
}

impl<'a> Iterator for SepScanner<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;
        match rest.iter().position(|&b| b == self.delim) {
            Some(tail) => {
                self.rest = Some(&rest[tail + 1..]);
                Some(&rest[..tail])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Splits `bytes` at the first occurrence of `delim`, dropping the delimiter.
pub(crate) fn split_once(bytes: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
    let at = bytes.iter().position(|&b| b == delim)?;
    Some((&bytes[..at], &bytes[at + 1..]))
}

pub(crate) fn count_byte(bytes: &[u8], needle: u8) -> usize {
    bytes.iter().filter(|&&b| b == needle).count()
}
