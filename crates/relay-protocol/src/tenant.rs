//! Tenant (instrumentation) key
//!
//! A tenant key is a UUID-shaped routing identifier attached to every
//! payload: `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` with hex digits in
//! either case. Only payloads with a valid key may be spooled; spool files
//! carrying anything else are deleted on load.

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Length of a tenant key in ASCII bytes
pub const TENANT_KEY_LEN: usize = 36;

/// Positions of the separator dashes within the key
const DASH_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Validated tenant key
///
/// Construction goes through [`TenantKey::parse`] (or `FromStr`), so holding
/// a `TenantKey` guarantees the instrumentation-key format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantKey(String);

impl TenantKey {
    /// Parse and validate a tenant key
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        if is_valid(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(CodecError::InvalidTenantKey(truncate_for_log(s)))
        }
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as ASCII bytes (always `TENANT_KEY_LEN` long)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantKey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check whether a string has the instrumentation-key shape
pub(crate) fn is_valid(s: &str) -> bool {
    if s.len() != TENANT_KEY_LEN {
        return false;
    }
    for (i, b) in s.bytes().enumerate() {
        if DASH_POSITIONS.contains(&i) {
            if b != b'-' {
                return false;
            }
        } else if !b.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

/// Bound key material included in error messages
fn truncate_for_log(s: &str) -> String {
    const MAX: usize = 64;
    if s.len() <= MAX {
        return s.to_owned();
    }
    // Back off to a char boundary so multi-byte input cannot panic
    let mut cut = MAX;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes)", &s[..cut], s.len())
}
