use alloy_primitives::Address;

/// Errors that can occur when parsing an Ethereum address string.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AddressError {
    #[error("address must start with '0x'")]
    InvalidPrefix,
    #[error("address must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 20;
/// Expected string length of an encoded address (`0x` + 40 hex chars).
pub const ADDRESS_STRING_LENGTH: usize = 2 + ADDRESS_BYTES * 2;

/// Encode an address in its EIP-55 mixed-case checksum form.
///
/// This is the form wallets display and sign, so it is also the form used
/// inside alias claim messages and alias listings.
pub fn encode_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Decode a `0x`-prefixed address string.
///
/// The checksum is not enforced: lower-case and upper-case inputs are accepted
/// as long as the payload is 20 bytes of hex.
pub fn decode_address(address: &str) -> Result<Address, AddressError> {
    let address = address.trim();
    let payload = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or(AddressError::InvalidPrefix)?;

    if address.len() != ADDRESS_STRING_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_STRING_LENGTH,
            actual: address.len(),
        });
    }

    let mut bytes = [0u8; ADDRESS_BYTES];
    hex::decode_to_slice(payload, &mut bytes)?;
    Ok(Address::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_any_case() {
        let lower = "0x8464135c8f25da09e49bc8782676a84730c318bc";
        let checksummed = "0x8464135c8F25Da09e49BC8782676a84730C318bC";
        assert_eq!(decode_address(lower).unwrap(), decode_address(checksummed).unwrap());
        assert_eq!(encode_address(&decode_address(lower).unwrap()), checksummed);
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert_eq!(
            decode_address("8464135c8f25da09e49bc8782676a84730c318bc"),
            Err(AddressError::InvalidPrefix)
        );
        assert!(matches!(
            decode_address("0x1234"),
            Err(AddressError::InvalidLength { expected: 42, actual: 6 })
        ));
        assert!(matches!(
            decode_address("0xzz64135c8f25da09e49bc8782676a84730c318bc"),
            Err(AddressError::InvalidHex(_))
        ));
        assert_eq!(
            decode_address(""),
            Err(AddressError::InvalidPrefix)
        );
    }
}
