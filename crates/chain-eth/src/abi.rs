//! Minimal ABI encoding and decoding for EVM function calls.
//!
//! Covers the static `address`/`uint256` words and dynamic `string` values
//! needed by the `Transactions` contract, without pulling in a full ABI
//! parser.

use alloy_primitives::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to one word.
    Address(Address),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
    /// A dynamic UTF-8 string, stored in the tail and referenced by offset.
    String(String),
}

/// Computes the 4-byte selector of a canonical function signature such as
/// `"getTransactionCount()"`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Encodes a function call as `selector || head || tail`.
///
/// Static parameters are written inline in the head. Dynamic parameters put
/// their offset (relative to the start of the head) in the head and their
/// length-prefixed, right-padded contents in the tail.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        match param {
            AbiParam::Address(addr) => head.extend_from_slice(&address_word(addr)),
            AbiParam::Uint256(value) => head.extend_from_slice(&uint_word(*value)),
            AbiParam::String(s) => {
                let offset = U256::from(head_len + tail.len());
                head.extend_from_slice(&uint_word(offset));
                tail.extend_from_slice(&encode_bytes(s.as_bytes()));
            }
        }
    }

    let mut data = Vec::with_capacity(4 + head.len() + tail.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&head);
    data.extend_from_slice(&tail);
    data
}

fn address_word(addr: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

/// Length word followed by the bytes, right-padded to a word boundary.
fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded_len = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&uint_word(U256::from(bytes.len())));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len, 0);
    out
}

/// Narrows a uint256 to `u64`, failing if any high bytes are set.
pub fn u256_to_u64(value: U256) -> Result<u64, EthError> {
    let bytes = value.to_be_bytes::<WORD>();
    if bytes[..24].iter().any(|b| *b != 0) {
        return Err(EthError::DecodingError(format!("{value} does not fit in u64")));
    }

    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[24..]);
    Ok(u64::from_be_bytes(low))
}

/// Bounds-checked reader over ABI-encoded return data.
///
/// Offsets passed to the accessors are byte offsets relative to the start of
/// this reader, which is how the ABI expresses offsets inside a tuple or array.
#[derive(Debug, Clone, Copy)]
pub struct AbiDecoder<'a> {
    data: &'a [u8],
}

impl<'a> AbiDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// A reader rooted at `offset`.
    pub fn at(&self, offset: usize) -> Result<AbiDecoder<'a>, EthError> {
        self.data
            .get(offset..)
            .map(AbiDecoder::new)
            .ok_or_else(|| out_of_bounds(offset, 0, self.data.len()))
    }

    fn word(&self, offset: usize) -> Result<&'a [u8], EthError> {
        let end = offset
            .checked_add(WORD)
            .ok_or_else(|| out_of_bounds(offset, WORD, self.data.len()))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| out_of_bounds(offset, WORD, self.data.len()))
    }

    pub fn uint(&self, offset: usize) -> Result<U256, EthError> {
        Ok(U256::from_be_slice(self.word(offset)?))
    }

    pub fn address(&self, offset: usize) -> Result<Address, EthError> {
        let word = self.word(offset)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(EthError::DecodingError(format!(
                "dirty high bytes in address word at {offset}"
            )));
        }
        Ok(Address::from_slice(&word[12..]))
    }

    /// Reads a word holding an offset or length.
    pub fn usize(&self, offset: usize) -> Result<usize, EthError> {
        let value = u256_to_u64(self.uint(offset)?)?;
        usize::try_from(value)
            .map_err(|_| EthError::DecodingError(format!("{value} does not fit in usize")))
    }

    /// Reads length-prefixed bytes starting at `offset`.
    pub fn bytes(&self, offset: usize) -> Result<&'a [u8], EthError> {
        let len = self.usize(offset)?;
        let start = offset + WORD;
        let end = start
            .checked_add(len)
            .ok_or_else(|| out_of_bounds(start, len, self.data.len()))?;
        self.data
            .get(start..end)
            .ok_or_else(|| out_of_bounds(start, len, self.data.len()))
    }

    /// Reads a length-prefixed string starting at `offset`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected so that one malformed
    /// record cannot hide the rest of a list.
    pub fn string(&self, offset: usize) -> Result<String, EthError> {
        Ok(String::from_utf8_lossy(self.bytes(offset)?).into_owned())
    }

    /// Follows the dynamic-value pointer stored in the word at `head_offset`
    /// and returns a reader rooted at the pointed-to data.
    pub fn follow(&self, head_offset: usize) -> Result<AbiDecoder<'a>, EthError> {
        let target = self.usize(head_offset)?;
        self.at(target)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn out_of_bounds(offset: usize, len: usize, available: usize) -> EthError {
    EthError::DecodingError(format!(
        "read of {len} bytes at offset {offset} exceeds {available} bytes of data"
    ))
}
