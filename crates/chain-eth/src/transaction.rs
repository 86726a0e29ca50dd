use alloy_primitives::U256;
use serde::Serialize;

use crate::address::parse_address;
use crate::error::EthError;

/// Gas limit of a plain value transfer (`0x5208`).
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Parameters of an `eth_sendTransaction` call, left to the wallet to sign.
///
/// Quantities are 0x-prefixed hex strings without leading zeros, as the
/// JSON-RPC API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Calldata (absent for plain transfers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Builds a native-currency transfer of `value_wei` with a fixed gas limit.
pub fn build_transfer(
    from: &str,
    to: &str,
    value_wei: U256,
    gas_limit: u64,
) -> Result<TransactionRequest, EthError> {
    validate_parties(from, to)?;

    Ok(TransactionRequest {
        from: from.to_string(),
        to: to.to_string(),
        gas: Some(u64_quantity(gas_limit)),
        value: Some(to_quantity(value_wei)),
        data: None,
    })
}

/// Builds a contract call carrying `calldata`; gas is left to the wallet's
/// estimate.
pub fn build_contract_call(
    from: &str,
    contract: &str,
    calldata: &[u8],
) -> Result<TransactionRequest, EthError> {
    validate_parties(from, contract)?;

    Ok(TransactionRequest {
        from: from.to_string(),
        to: contract.to_string(),
        gas: None,
        value: None,
        data: Some(format!("0x{}", hex::encode(calldata))),
    })
}

fn validate_parties(from: &str, to: &str) -> Result<(), EthError> {
    parse_address(from)
        .map_err(|e| EthError::TransactionBuildError(format!("sender: {e}")))?;
    parse_address(to)
        .map_err(|e| EthError::TransactionBuildError(format!("recipient: {e}")))?;
    Ok(())
}

/// Encodes a uint256 as a JSON-RPC quantity (`0x0`, `0x5208`, ...).
pub fn to_quantity(value: U256) -> String {
    let digits = hex::encode(value.to_be_bytes::<32>());
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{trimmed}")
    }
}

fn u64_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Parses a JSON-RPC quantity back into a uint256.
pub fn parse_quantity(quantity: &str) -> Result<U256, EthError> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidQuantity(format!("{quantity:?} lacks 0x prefix")))?;

    if digits.is_empty() {
        return Err(EthError::InvalidQuantity(format!("{quantity:?} has no digits")));
    }

    U256::from_str_radix(digits, 16)
        .map_err(|e| EthError::InvalidQuantity(format!("{quantity:?}: {e}")))
}

/// Decodes 0x-prefixed hex data (`"0x"` is empty data).
pub fn parse_data(data: &str) -> Result<Vec<u8>, EthError> {
    let digits = data
        .strip_prefix("0x")
        .ok_or_else(|| EthError::DecodingError(format!("data {data:?} lacks 0x prefix")))?;
    hex::decode(digits).map_err(|e| EthError::DecodingError(format!("invalid hex data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const TO: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn build_transfer_sets_hex_quantities() {
        let one_ether = U256::from(1_000_000_000_000_000_000u64);
        let tx = build_transfer(FROM, TO, one_ether, TRANSFER_GAS_LIMIT).unwrap();

        assert_eq!(tx.from, FROM);
        assert_eq!(tx.to, TO);
        assert_eq!(tx.gas.as_deref(), Some("0x5208"));
        assert_eq!(tx.value.as_deref(), Some("0xde0b6b3a7640000"));
        assert!(tx.data.is_none());
    }

    #[test]
    fn build_transfer_serializes_without_data() {
        let tx = build_transfer(FROM, TO, U256::from(1u64), TRANSFER_GAS_LIMIT).unwrap();
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "from": FROM,
                "to": TO,
                "gas": "0x5208",
                "value": "0x1",
            })
        );
    }

    #[test]
    fn build_transfer_rejects_bad_addresses() {
        assert!(build_transfer("", TO, U256::ZERO, 21_000).is_err());
        assert!(build_transfer(FROM, "bad-address", U256::ZERO, 21_000).is_err());
    }

    #[test]
    fn build_contract_call_carries_calldata() {
        let tx = build_contract_call(FROM, TO, &[0xa9, 0x05, 0x9c, 0xbb]).unwrap();
        assert_eq!(tx.data.as_deref(), Some("0xa9059cbb"));
        assert!(tx.gas.is_none());
        assert!(tx.value.is_none());
    }

    #[test]
    fn quantity_encoding() {
        assert_eq!(to_quantity(U256::ZERO), "0x0");
        assert_eq!(to_quantity(U256::from(255u64)), "0xff");
        assert_eq!(to_quantity(U256::from(4096u64)), "0x1000");
        assert_eq!(u64_quantity(0), "0x0");
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x1").unwrap(), U256::from(1u64));
        assert_eq!(parse_quantity("0x5208").unwrap(), U256::from(21_000u64));
        assert!(parse_quantity("5208").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn data_parsing() {
        assert_eq!(parse_data("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_data("0x00ff").unwrap(), vec![0x00, 0xff]);
        assert!(parse_data("00ff").is_err());
        assert!(parse_data("0x0").is_err());
    }
}
