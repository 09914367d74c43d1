use super::*;

const TENANT: &str = "00000000-0000-0000-0000-0FEEDDADBEEF";

fn tenant() -> TenantKey {
    TenantKey::parse(TENANT).unwrap()
}

#[test]
fn test_round_trip() {
    let payload = b"hello world";
    let encoded = encode(&tenant(), 1_623_700_000_123, payload);

    let envelope = decode(&encoded).unwrap();
    assert_eq!(envelope.tenant.as_str(), TENANT);
    assert_eq!(envelope.created_at_ms, 1_623_700_000_123);
    assert_eq!(&envelope.payload[..], payload);
}

#[test]
fn test_round_trip_empty_payload() {
    let encoded = encode(&tenant(), 42, b"");
    assert_eq!(encoded.len(), HEADER_LEN);

    let envelope = decode(&encoded).unwrap();
    assert_eq!(envelope.created_at_ms, 42);
    assert!(envelope.payload.is_empty());
}

#[test]
fn test_round_trip_binary_payload() {
    // Gzipped payloads are arbitrary bytes including zeros and high bits
    let payload: Vec<u8> = (0..=255).collect();
    let encoded = encode(&tenant(), u64::MAX, &payload);

    let envelope = decode(&encoded).unwrap();
    assert_eq!(envelope.created_at_ms, u64::MAX);
    assert_eq!(&envelope.payload[..], &payload[..]);
}

#[test]
fn test_decode_truncated_header() {
    let encoded = encode(&tenant(), 1, b"payload");

    for len in [0, 1, 10, HEADER_LEN - 1] {
        let err = decode(&encoded[..len]).unwrap_err();
        assert!(
            matches!(err, CodecError::Truncated { .. }),
            "len {len} should be truncated, got {err}"
        );
    }
}

#[test]
fn test_decode_unknown_version() {
    let mut encoded = encode(&tenant(), 1, b"payload");
    encoded[0] = 0x02;

    let err = decode(&encoded).unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedVersion(0x02)));
}

#[test]
fn test_decode_malformed_tenant_key() {
    let mut encoded = encode(&tenant(), 1, b"payload");
    // Corrupt one hex digit into a non-hex character
    encoded[1] = b'z';

    let err = decode(&encoded).unwrap_err();
    assert!(matches!(err, CodecError::InvalidTenantKey(_)));
}

#[test]
fn test_decode_non_utf8_tenant_key() {
    let mut encoded = encode(&tenant(), 1, b"payload");
    encoded[1] = 0xff;

    let err = decode(&encoded).unwrap_err();
    assert!(matches!(err, CodecError::InvalidTenantKey(_)));
}

#[test]
fn test_peek_created_at() {
    let encoded = encode(&tenant(), 987_654_321, b"payload");
    assert_eq!(peek_created_at(&encoded), Some(987_654_321));

    assert_eq!(peek_created_at(&encoded[..HEADER_LEN - 1]), None);

    let mut bad_version = encoded.clone();
    bad_version[0] = 0x7f;
    assert_eq!(peek_created_at(&bad_version), None);
}
