//! Types for alias claims

use crate::errors::{AliasError, Result};
use alloy_primitives::{Address, Signature};
use ensgw_types::{encode_address, is_normalized, MAX_ALIAS_LENGTH, MIN_ALIAS_LENGTH};
use serde::{Deserialize, Serialize};

/// Action tag the wallet signs over.
pub const SAVE_ALIAS_ACTION: &str = "save-alias";

/// Body of `POST /aliases/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasClaim {
    pub alias: String,
    /// 65-byte personal-message signature, `0x`-hex.
    pub signature: String,
}

/// The exact message a claimant signs with `personal_sign`.
///
/// Field order is significant: the JSON serialization is the signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimMessage {
    pub action: &'static str,
    /// EIP-55 checksum form of the owner.
    pub address: String,
    pub alias: String,
}

impl ClaimMessage {
    pub fn new(owner: &Address, alias: impl Into<String>) -> Self {
        Self {
            action: SAVE_ALIAS_ACTION,
            address: encode_address(owner),
            alias: alias.into(),
        }
    }

    /// Canonical JSON text of the message.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| AliasError::BadSignature(err.to_string()))
    }

    /// Recover the address that produced `signature` over this message.
    pub fn recover_signer(&self, signature: &str) -> Result<Address> {
        let raw = hex::decode(signature.trim().trim_start_matches("0x"))
            .map_err(|err| AliasError::BadSignature(format!("signature is not hex: {err}")))?;
        let signature = Signature::from_raw(&raw)
            .map_err(|err| AliasError::BadSignature(err.to_string()))?;
        signature
            .recover_address_from_msg(self.to_json()?.as_bytes())
            .map_err(|err| AliasError::BadSignature(err.to_string()))
    }
}

/// Check that `alias` can become the single leftmost label of a name.
pub fn validate_alias(alias: &str) -> Result<()> {
    let length = alias.chars().count();
    if !(MIN_ALIAS_LENGTH..=MAX_ALIAS_LENGTH).contains(&length) {
        return Err(AliasError::InvalidAliasLength {
            length,
            min: MIN_ALIAS_LENGTH,
            max: MAX_ALIAS_LENGTH,
        });
    }

    let invalid = |reason: &str| AliasError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };
    if alias.contains('.') {
        return Err(invalid("must be a single label"));
    }
    if alias.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if alias == ensgw_types::WILDCARD_LABEL || !is_normalized(alias) {
        return Err(invalid("must be in normalized form"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn claim_message_serializes_in_signed_field_order() {
        let message = ClaimMessage::new(
            &address!("8464135c8f25da09e49bc8782676a84730c318bc"),
            "alice",
        );
        assert_eq!(
            message.to_json().unwrap(),
            r#"{"action":"save-alias","address":"0x8464135c8F25Da09e49BC8782676a84730C318bC","alias":"alice"}"#
        );
    }

    #[test]
    fn alias_length_is_counted_in_characters() {
        assert!(validate_alias("abc").is_ok());
        assert!(validate_alias(&"a".repeat(64)).is_ok());
        assert!(matches!(
            validate_alias("ab"),
            Err(AliasError::InvalidAliasLength { length: 2, .. })
        ));
        assert!(matches!(
            validate_alias(&"a".repeat(65)),
            Err(AliasError::InvalidAliasLength { length: 65, .. })
        ));
        // three characters, six bytes
        assert!(validate_alias("ñåé").is_ok());
    }

    #[test]
    fn alias_must_be_one_normalized_label() {
        for alias in ["a.b.c", "has space", "Alice", "*"] {
            let err = validate_alias(alias).unwrap_err();
            assert!(
                matches!(err, AliasError::InvalidAlias { .. } | AliasError::InvalidAliasLength { .. }),
                "{alias}: {err}"
            );
        }
        assert!(matches!(
            validate_alias("Alice").unwrap_err(),
            AliasError::InvalidAlias { .. }
        ));
    }

    #[test]
    fn malformed_signature_is_bad_signature() {
        let message = ClaimMessage::new(&Address::ZERO, "alice");
        assert!(matches!(
            message.recover_signer("0xzz").unwrap_err(),
            AliasError::BadSignature(_)
        ));
        assert!(matches!(
            message.recover_signer("0x1234").unwrap_err(),
            AliasError::BadSignature(_)
        ));
    }

    #[test]
    fn claim_body_deserializes() {
        let claim: AliasClaim =
            serde_json::from_str(r#"{"alias":"alice","signature":"0xabcd"}"#).unwrap();
        assert_eq!(claim.alias, "alice");
        assert_eq!(claim.signature, "0xabcd");
    }
}
