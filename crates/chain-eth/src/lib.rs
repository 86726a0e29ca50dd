//! Ethereum/EVM support for the transfer context.
//!
//! This crate provides:
//! - Ethereum address parsing and validation (with EIP-55 checksums)
//! - Ether unit conversion between decimal strings and wei
//! - Minimal ABI encoding and decoding utilities
//! - Calldata and return decoding for the `Transactions` contract
//! - `eth_sendTransaction` request building

pub mod abi;
pub mod address;
pub mod contract;
pub mod error;
pub mod transaction;
pub mod units;

pub use alloy_primitives::{Address, U256};
