//! Calldata encoding and return decoding for the `Transactions` contract.
//!
//! ```solidity
//! struct TransferStruct {
//!     address sender;
//!     address receiver;
//!     uint amount;
//!     string message;
//!     uint256 timestamp;
//!     string keyword;
//! }
//! function addToBlockchain(address payable receiver, uint amount, string memory message, string memory keyword) public;
//! function getAllTransactions() public view returns (TransferStruct[] memory);
//! function getTransactionCount() public view returns (uint256);
//! ```

use alloy_primitives::{Address, U256};

use crate::abi::{encode_function_call, function_selector, AbiDecoder, AbiParam, WORD};
use crate::address::parse_address;
use crate::error::EthError;

pub const ADD_TO_BLOCKCHAIN: &str = "addToBlockchain(address,uint256,string,string)";
pub const GET_ALL_TRANSACTIONS: &str = "getAllTransactions()";
pub const GET_TRANSACTION_COUNT: &str = "getTransactionCount()";

/// Number of head words in an encoded `TransferStruct`.
const TRANSFER_HEAD_WORDS: usize = 6;

/// One transfer as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStruct {
    pub sender: Address,
    pub receiver: Address,
    /// Amount in wei.
    pub amount: U256,
    pub message: String,
    /// Block timestamp in seconds since the Unix epoch.
    pub timestamp: U256,
    pub keyword: String,
}

/// Encodes an `addToBlockchain(address,uint256,string,string)` call.
pub fn encode_add_to_blockchain(
    receiver: &str,
    amount: U256,
    message: &str,
    keyword: &str,
) -> Result<Vec<u8>, EthError> {
    let receiver = parse_address(receiver)?;
    let params = [
        AbiParam::Address(receiver),
        AbiParam::Uint256(amount),
        AbiParam::String(message.to_string()),
        AbiParam::String(keyword.to_string()),
    ];
    Ok(encode_function_call(function_selector(ADD_TO_BLOCKCHAIN), &params))
}

/// Encodes a `getAllTransactions()` call.
pub fn encode_get_all_transactions() -> Vec<u8> {
    encode_function_call(function_selector(GET_ALL_TRANSACTIONS), &[])
}

/// Encodes a `getTransactionCount()` call.
pub fn encode_get_transaction_count() -> Vec<u8> {
    encode_function_call(function_selector(GET_TRANSACTION_COUNT), &[])
}

/// Decodes the single uint256 returned by `getTransactionCount()`.
pub fn decode_transaction_count(data: &[u8]) -> Result<U256, EthError> {
    AbiDecoder::new(data).uint(0)
}

/// Decodes the `TransferStruct[]` returned by `getAllTransactions()`.
///
/// Layout: a pointer to the array, the array length, one pointer per element
/// (relative to the first pointer), then each tuple whose string fields point
/// relative to the start of that tuple.
pub fn decode_transfers(data: &[u8]) -> Result<Vec<TransferStruct>, EthError> {
    let array = AbiDecoder::new(data).follow(0)?;
    let count = array.usize(0)?;
    let elements = array.at(WORD)?;

    if count.checked_mul(WORD).map_or(true, |len| len > elements.len()) {
        return Err(EthError::DecodingError(format!(
            "array of {count} elements does not fit in {} bytes",
            elements.len()
        )));
    }

    (0..count)
        .map(|i| decode_transfer(&elements.follow(i * WORD)?))
        .collect()
}

fn decode_transfer(tuple: &AbiDecoder<'_>) -> Result<TransferStruct, EthError> {
    if tuple.len() < TRANSFER_HEAD_WORDS * WORD {
        return Err(EthError::DecodingError(format!(
            "transfer tuple needs {} head bytes, got {}",
            TRANSFER_HEAD_WORDS * WORD,
            tuple.len()
        )));
    }

    Ok(TransferStruct {
        sender: tuple.address(0)?,
        receiver: tuple.address(WORD)?,
        amount: tuple.uint(2 * WORD)?,
        message: tuple.string(tuple.usize(3 * WORD)?)?,
        timestamp: tuple.uint(4 * WORD)?,
        keyword: tuple.string(tuple.usize(5 * WORD)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIVER: &str = "0x000000000000000000000000000000000000dEaD";

    fn word(value: usize) -> Vec<u8> {
        U256::from(value).to_be_bytes::<WORD>().to_vec()
    }

    fn address_bytes(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn string_tail(s: &str) -> Vec<u8> {
        let mut out = word(s.len());
        out.extend_from_slice(s.as_bytes());
        out.resize(WORD + s.len().div_ceil(WORD) * WORD, 0);
        out
    }

    /// Encodes transfers the way solc lays out `TransferStruct[]` return data.
    fn encode_transfers(transfers: &[TransferStruct]) -> Vec<u8> {
        let tuples: Vec<Vec<u8>> = transfers
            .iter()
            .map(|t| {
                let message = string_tail(&t.message);
                let keyword = string_tail(&t.keyword);
                let head_len = TRANSFER_HEAD_WORDS * WORD;

                let mut out = Vec::new();
                let mut sender = [0u8; WORD];
                sender[12..].copy_from_slice(t.sender.as_slice());
                out.extend_from_slice(&sender);
                let mut receiver = [0u8; WORD];
                receiver[12..].copy_from_slice(t.receiver.as_slice());
                out.extend_from_slice(&receiver);
                out.extend_from_slice(&t.amount.to_be_bytes::<WORD>());
                out.extend(word(head_len));
                out.extend_from_slice(&t.timestamp.to_be_bytes::<WORD>());
                out.extend(word(head_len + message.len()));
                out.extend(message);
                out.extend(keyword);
                out
            })
            .collect();

        let mut data = word(WORD);
        data.extend(word(transfers.len()));
        let mut offset = transfers.len() * WORD;
        for tuple in &tuples {
            data.extend(word(offset));
            offset += tuple.len();
        }
        for tuple in tuples {
            data.extend(tuple);
        }
        data
    }

    fn sample(n: u8, message: &str, keyword: &str) -> TransferStruct {
        TransferStruct {
            sender: address_bytes(n),
            receiver: address_bytes(n + 1),
            amount: U256::from(u64::from(n) * 1_000_000_000_000_000_000u64 / 4),
            message: message.into(),
            timestamp: U256::from(1_640_995_200u64 + u64::from(n)),
            keyword: keyword.into(),
        }
    }

    #[test]
    fn selectors_match_signatures() {
        assert_eq!(&encode_get_all_transactions(), &function_selector(GET_ALL_TRANSACTIONS));
        assert_eq!(&encode_get_transaction_count(), &function_selector(GET_TRANSACTION_COUNT));
    }

    #[test]
    fn add_to_blockchain_layout() {
        let amount = U256::from(1_000_000_000_000_000_000u64);
        let data = encode_add_to_blockchain(RECEIVER, amount, "gm", "coffee").unwrap();
        let body = AbiDecoder::new(&data[4..]);

        assert_eq!(&data[..4], &function_selector(ADD_TO_BLOCKCHAIN));
        assert_eq!(body.address(0).unwrap(), parse_address(RECEIVER).unwrap());
        assert_eq!(body.uint(32).unwrap(), amount);
        assert_eq!(body.usize(64).unwrap(), 128);
        assert_eq!(body.usize(96).unwrap(), 192);
        assert_eq!(body.string(128).unwrap(), "gm");
        assert_eq!(body.string(192).unwrap(), "coffee");
        // selector + 4 head words + 2 * (length + one content word)
        assert_eq!(data.len(), 4 + 4 * 32 + 2 * 64);
    }

    #[test]
    fn add_to_blockchain_rejects_bad_receiver() {
        let err = encode_add_to_blockchain("0xdead", U256::ZERO, "", "").unwrap_err();
        assert!(matches!(err, EthError::InvalidAddress(_)));
    }

    #[test]
    fn decode_count() {
        let data = word(12);
        assert_eq!(decode_transaction_count(&data).unwrap(), U256::from(12u64));
        assert!(decode_transaction_count(&[]).is_err());
    }

    #[test]
    fn decode_empty_list() {
        let mut data = word(32);
        data.extend(word(0));
        assert!(decode_transfers(&data).unwrap().is_empty());
    }

    #[test]
    fn decode_transfers_in_order() {
        let transfers = vec![
            sample(1, "first payment", "cat"),
            sample(2, "", "dog"),
            sample(3, &"long message ".repeat(5), ""),
        ];
        let decoded = decode_transfers(&encode_transfers(&transfers)).unwrap();
        assert_eq!(decoded, transfers);
    }

    #[test]
    fn decode_rejects_truncated_data() {
        let data = encode_transfers(&[sample(1, "hello", "world")]);
        assert!(decode_transfers(&data[..data.len() - 40]).is_err());
    }

    #[test]
    fn decode_rejects_inflated_length() {
        let mut data = word(32);
        data.extend(word(1_000_000));
        assert!(decode_transfers(&data).is_err());
    }
}
