//! Input checks that run before any socket is opened.

use crate::error::PortError;

/// Parses a base-10 port number in `1..=65535`.
pub fn validate_port(port: &str) -> Result<u16, PortError> {
    let n: i64 = port.parse().map_err(PortError::NotANumber)?;

    u16::try_from(n)
        .ok()
        .filter(|p| *p != 0)
        .ok_or(PortError::OutOfRange(n))
}

/// True when nothing but whitespace is left after trimming.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
