//! DNS wire-format names (RFC 1035 §3.1) as carried in `resolve(bytes,bytes)`.

use crate::errors::{GatewayError, Result};

/// Longest label the wire format can express.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Decode a length-prefixed label sequence into a dotted name.
///
/// Bytes after the terminating zero-length label are ignored.
pub fn decode(encoded: &[u8]) -> Result<String> {
    let mut labels: Vec<&str> = Vec::new();
    let mut idx = 0;

    loop {
        let len = *encoded.get(idx).ok_or_else(|| GatewayError::MalformedName {
            reason: "missing terminating zero-length label".to_string(),
        })? as usize;
        if len == 0 {
            break;
        }

        let start = idx + 1;
        let end = start + len;
        let raw = encoded
            .get(start..end)
            .ok_or_else(|| GatewayError::MalformedName {
                reason: format!("label of {len} bytes at offset {idx} runs past the buffer"),
            })?;
        let label = std::str::from_utf8(raw).map_err(|_| GatewayError::MalformedName {
            reason: format!("label at offset {idx} is not valid UTF-8"),
        })?;
        labels.push(label);
        idx = end;
    }

    Ok(labels.join("."))
}

/// Encode a dotted name into wire format. The empty name encodes to `[0]`.
pub fn encode(name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(name.len() + 2);
    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
                return Err(GatewayError::MalformedName {
                    reason: format!("label '{label}' must be 1..={MAX_LABEL_LENGTH} bytes"),
                });
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_name() {
        assert_eq!(decode(b"\x04test\x03eth\x00").unwrap(), "test.eth");
        assert_eq!(decode(b"\x00").unwrap(), "");
    }

    #[test]
    fn encode_then_decode_preserves_labels() {
        for name in ["test.eth", "a.b.c.d", "*.test.eth", "ünïcödé.eth", "x"] {
            let wire = encode(name).unwrap();
            assert_eq!(decode(&wire).unwrap(), name);
        }
    }

    #[test]
    fn truncated_label_is_malformed() {
        let err = decode(b"\x05test").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedName { .. }));
    }

    #[test]
    fn missing_terminator_is_malformed() {
        assert!(matches!(
            decode(b"\x04test\x03eth").unwrap_err(),
            GatewayError::MalformedName { .. }
        ));
        assert!(matches!(
            decode(b"").unwrap_err(),
            GatewayError::MalformedName { .. }
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(decode(b"\x02\xff\xfe\x00").is_err());
    }

    #[test]
    fn encode_rejects_oversized_and_empty_labels() {
        assert!(encode(&"a".repeat(64)).is_err());
        assert!(encode("a..eth").is_err());
        assert_eq!(encode("").unwrap(), vec![0]);
    }
}
