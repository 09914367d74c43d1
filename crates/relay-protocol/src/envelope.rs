//! Envelope codec
//!
//! Encodes a (tenant, timestamp, payload) triple into the on-disk record
//! layout and decodes it back, rejecting truncated headers, unknown format
//! versions, and malformed tenant keys.

use bytes::Bytes;

use crate::error::CodecError;
use crate::tenant::{TENANT_KEY_LEN, TenantKey};

/// Current on-disk format version
pub const FORMAT_VERSION: u8 = 0x01;

/// Fixed header length: version byte + tenant key + created-at timestamp
pub const HEADER_LEN: usize = 1 + TENANT_KEY_LEN + 8;

/// A decoded spool record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Tenant the payload is routed by
    pub tenant: TenantKey,

    /// Milliseconds since the Unix epoch when the record was created
    pub created_at_ms: u64,

    /// Opaque gzipped payload bytes
    pub payload: Bytes,
}

/// Frame a payload with the spool header
pub fn encode(tenant: &TenantKey, created_at_ms: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(FORMAT_VERSION);
    out.extend_from_slice(tenant.as_bytes());
    out.extend_from_slice(&created_at_ms.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Parse a spool record
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            len: bytes.len(),
            expected: HEADER_LEN,
        });
    }

    let version = bytes[0];
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let key_bytes = &bytes[1..1 + TENANT_KEY_LEN];
    let key_str = std::str::from_utf8(key_bytes)
        .map_err(|_| CodecError::InvalidTenantKey("non-UTF8 key bytes".into()))?;
    let tenant = TenantKey::parse(key_str)?;

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[1 + TENANT_KEY_LEN..HEADER_LEN]);
    let created_at_ms = u64::from_be_bytes(ts);

    Ok(Envelope {
        tenant,
        created_at_ms,
        payload: Bytes::copy_from_slice(&bytes[HEADER_LEN..]),
    })
}

/// Read only the created-at timestamp from an encoded record
///
/// Used by the startup scan to order files without decoding payloads.
pub fn peek_created_at(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < HEADER_LEN || bytes[0] != FORMAT_VERSION {
        return None;
    }
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[1 + TENANT_KEY_LEN..HEADER_LEN]);
    Some(u64::from_be_bytes(ts))
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod envelope_test;
