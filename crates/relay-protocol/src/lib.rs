//! Relay protocol - spool envelope framing
//!
//! Defines the on-disk record format shared by the spool writer and loader,
//! and the tenant (instrumentation) key that routes every payload.
//!
//! # File Format
//!
//! Each durable spool file (`<uuid>.trn`) contains one framed batch:
//!
//! ```text
//! [1 byte: version = 0x01][36 bytes: ASCII tenant key][8 bytes: created-at ms, big-endian][payload...]
//! ```
//!
//! The payload is an opaque gzipped JSON-lines stream; the codec never looks
//! inside it. Files that fail to decode are deleted by the loader.

mod envelope;
mod error;
mod tenant;

pub use envelope::{Envelope, FORMAT_VERSION, HEADER_LEN, decode, encode, peek_created_at};
pub use error::CodecError;
pub use tenant::{TENANT_KEY_LEN, TenantKey};
