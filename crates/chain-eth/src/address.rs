use alloy_primitives::Address;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Strips the `0x` prefix and checks that 40 hex digits remain.
fn hex_body(address: &str) -> Result<&str, EthError> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if body.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            body.len()
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    Ok(body)
}

/// Parses a 0x-prefixed hex address string.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase and
/// all-uppercase input is accepted as is.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    if !validate_address(address)? {
        return Err(EthError::InvalidAddress(format!(
            "checksum mismatch for {address}"
        )));
    }

    let bytes = hex::decode(hex_body(address)?)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    Ok(Address::from_slice(&bytes))
}

/// Validates an Ethereum address string.
///
/// Returns an error when the format is wrong (prefix, length, hex digits) and
/// `Ok(false)` when a mixed-case address fails its EIP-55 checksum.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    let body = hex_body(address)?;

    let is_all_lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = body.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    let checksummed = checksum_address(address)?;
    Ok(checksummed[2..] == *body)
}

/// Applies EIP-55 mixed-case checksum encoding to an address string of any
/// case.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let lower = hex_body(address)?.to_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        // Nibble i of the hash decides the case of character i.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

/// Formats a parsed address in EIP-55 form.
pub fn to_checksum(address: &Address) -> String {
    let lower = format!("0x{}", hex::encode(address.as_slice()));
    // A freshly hex-encoded address always has a valid body.
    checksum_address(&lower).unwrap_or(lower)
}
