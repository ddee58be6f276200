//! Request correlation identifiers.

use std::fmt;

use rand::Rng;

/// Header carrying the request id in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is accepted.
const MAX_LEN: usize = 128;

/// A request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID: epoch millis and 32 random bits, hex.
    pub fn generate() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let salt: u32 = rand::thread_rng().gen();
        Self(format!("{millis:x}-{salt:08x}"))
    }

    /// Reuse a caller-supplied id when it is printable and short, otherwise
    /// generate one.
    pub fn resolve(header: Option<&str>) -> Self {
        match header.map(str::trim) {
            Some(id)
                if !id.is_empty()
                    && id.len() <= MAX_LEN
                    && id.chars().all(|c| c.is_ascii_graphic()) =>
            {
                Self(id.to_string())
            }
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
