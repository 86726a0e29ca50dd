//! The `Transactions` contract capability and its wallet-backed
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use chain_eth::contract::{self as calls, TransferStruct};
use chain_eth::transaction::{build_contract_call, parse_data, parse_quantity};
use chain_eth::U256;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ContextError;
use crate::wallet::Eip1193;

/// Handle to a submitted contract transaction awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Outcome of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
}

/// Typed interface to the deployed `Transactions` contract.
#[async_trait]
pub trait TransactionsContract: Send + Sync {
    /// The full transfer history in contract order.
    async fn get_all_transactions(&self) -> Result<Vec<TransferStruct>, ContextError>;

    async fn get_transaction_count(&self) -> Result<U256, ContextError>;

    /// Submits `addToBlockchain(receiver, amount, message, keyword)`.
    async fn add_to_blockchain(
        &self,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<PendingTransaction, ContextError>;

    /// Resolves once the transaction is mined. A reverted transaction is an
    /// error.
    async fn wait(&self, pending: &PendingTransaction) -> Result<TransactionReceipt, ContextError>;
}

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Contract access through a wallet's own JSON-RPC connection, signing with
/// the wallet's first authorized account.
pub struct ProviderContract<W> {
    wallet: W,
    address: String,
    poll_interval: Duration,
    confirmation_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl<W: Eip1193> ProviderContract<W> {
    /// Binds `wallet` to the contract deployed at `address`.
    pub fn new(wallet: W, address: &str) -> Result<Self, ContextError> {
        chain_eth::address::parse_address(address)
            .map_err(|e| ContextError::Config(format!("contract address: {e}")))?;

        Ok(Self {
            wallet,
            address: address.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: None,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds how long [`TransactionsContract::wait`] polls. Without a timeout
    /// it polls until a receipt appears.
    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn call(&self, calldata: Vec<u8>) -> Result<Vec<u8>, ContextError> {
        let params = json!([
            { "to": self.address, "data": format!("0x{}", hex::encode(calldata)) },
            "latest"
        ]);
        match self.wallet.request("eth_call", params).await? {
            Value::String(data) => Ok(parse_data(&data)?),
            other => Err(ContextError::InvalidResponse(format!(
                "eth_call returned {other}, expected hex data"
            ))),
        }
    }

    async fn signer(&self) -> Result<String, ContextError> {
        self.wallet
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ContextError::WalletUnavailable("no authorized account to sign with".into()))
    }

    async fn receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, ContextError> {
        let result = self
            .wallet
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| ContextError::InvalidResponse(format!("malformed receipt: {e}")))?;

        if raw.status.as_deref() == Some("0x0") {
            return Err(ContextError::ContractReverted(format!(
                "transaction {} reverted",
                raw.transaction_hash
            )));
        }

        let block_number = raw
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .map(chain_eth::abi::u256_to_u64)
            .transpose()?;

        Ok(Some(TransactionReceipt {
            hash: raw.transaction_hash,
            block_number,
        }))
    }

    async fn poll_receipt(&self, hash: &str) -> Result<TransactionReceipt, ContextError> {
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(receipt);
            }
            debug!(hash, "receipt not yet available");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl<W: Eip1193> TransactionsContract for ProviderContract<W> {
    async fn get_all_transactions(&self) -> Result<Vec<TransferStruct>, ContextError> {
        let data = self.call(calls::encode_get_all_transactions()).await?;
        Ok(calls::decode_transfers(&data)?)
    }

    async fn get_transaction_count(&self) -> Result<U256, ContextError> {
        let data = self.call(calls::encode_get_transaction_count()).await?;
        Ok(calls::decode_transaction_count(&data)?)
    }

    async fn add_to_blockchain(
        &self,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<PendingTransaction, ContextError> {
        let calldata = calls::encode_add_to_blockchain(receiver, amount, message, keyword)?;
        let from = self.signer().await?;
        let tx = build_contract_call(&from, &self.address, &calldata)?;
        let hash = self.wallet.send_transaction(&tx).await?;
        info!(hash = %hash, contract = %self.address, "addToBlockchain submitted");
        Ok(PendingTransaction { hash })
    }

    async fn wait(&self, pending: &PendingTransaction) -> Result<TransactionReceipt, ContextError> {
        match self.confirmation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.poll_receipt(&pending.hash))
                .await
                .map_err(|_| {
                    ContextError::ConfirmationTimeout(format!(
                        "no receipt for {} after {timeout:?}",
                        pending.hash
                    ))
                })?,
            None => self.poll_receipt(&pending.hash).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nullables::NullWallet;

    const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const ACCOUNT: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const RECEIVER: &str = "0x000000000000000000000000000000000000dEaD";

    fn word_hex(value: u64) -> String {
        format!("0x{:064x}", value)
    }

    #[test]
    fn new_rejects_bad_contract_address() {
        let result = ProviderContract::new(NullWallet::new(), "0x1234");
        assert!(matches!(result, Err(ContextError::Config(_))));
    }

    #[tokio::test]
    async fn count_goes_through_eth_call() {
        let wallet = NullWallet::new();
        wallet.respond("eth_call", json!(word_hex(7)));
        let contract = ProviderContract::new(wallet.clone(), CONTRACT).unwrap();

        assert_eq!(contract.get_transaction_count().await.unwrap(), U256::from(7u64));

        let requests = wallet.requests_for("eth_call");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0]["to"], CONTRACT);
        assert_eq!(
            requests[0][0]["data"],
            format!("0x{}", hex::encode(calls::encode_get_transaction_count()))
        );
        assert_eq!(requests[0][1], "latest");
    }

    #[tokio::test]
    async fn empty_history_decodes() {
        let wallet = NullWallet::new();
        let data = format!("0x{:064x}{:064x}", 32, 0);
        wallet.respond("eth_call", json!(data));
        let contract = ProviderContract::new(wallet, CONTRACT).unwrap();

        assert!(contract.get_all_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_call_result_is_invalid_response() {
        let wallet = NullWallet::new();
        wallet.respond("eth_call", json!(42));
        let contract = ProviderContract::new(wallet, CONTRACT).unwrap();

        assert!(matches!(
            contract.get_transaction_count().await,
            Err(ContextError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn add_to_blockchain_signs_with_first_account() {
        let wallet = NullWallet::with_accounts(&[ACCOUNT]);
        let contract = ProviderContract::new(wallet.clone(), CONTRACT).unwrap();

        let pending = contract
            .add_to_blockchain(RECEIVER, U256::from(5u64), "hello", "cat")
            .await
            .unwrap();
        assert!(pending.hash.starts_with("0x"));

        let sent = wallet.requests_for("eth_sendTransaction");
        assert_eq!(sent.len(), 1);
        let tx = &sent[0][0];
        assert_eq!(tx["from"], ACCOUNT);
        assert_eq!(tx["to"], CONTRACT);
        let calldata = calls::encode_add_to_blockchain(RECEIVER, U256::from(5u64), "hello", "cat")
            .unwrap();
        assert_eq!(tx["data"], format!("0x{}", hex::encode(calldata)));
    }

    #[tokio::test]
    async fn add_to_blockchain_without_account_is_unavailable() {
        let contract = ProviderContract::new(NullWallet::new(), CONTRACT).unwrap();
        let result = contract.add_to_blockchain(RECEIVER, U256::ZERO, "", "").await;
        assert!(matches!(result, Err(ContextError::WalletUnavailable(_))));
    }

    #[tokio::test]
    async fn wait_polls_until_receipt() {
        let wallet = NullWallet::new();
        wallet.respond_once("eth_getTransactionReceipt", Ok(Value::Null));
        wallet.respond_once("eth_getTransactionReceipt", Ok(Value::Null));
        wallet.respond(
            "eth_getTransactionReceipt",
            json!({ "transactionHash": "0xabc", "blockNumber": "0x10", "status": "0x1" }),
        );
        let contract = ProviderContract::new(wallet.clone(), CONTRACT)
            .unwrap()
            .with_poll_interval(Duration::from_millis(1));

        let receipt = contract
            .wait(&PendingTransaction { hash: "0xabc".into() })
            .await
            .unwrap();

        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(wallet.calls("eth_getTransactionReceipt"), 3);
    }

    #[tokio::test]
    async fn reverted_receipt_is_an_error() {
        let wallet = NullWallet::new();
        wallet.respond(
            "eth_getTransactionReceipt",
            json!({ "transactionHash": "0xabc", "blockNumber": "0x10", "status": "0x0" }),
        );
        let contract = ProviderContract::new(wallet, CONTRACT).unwrap();

        let result = contract.wait(&PendingTransaction { hash: "0xabc".into() }).await;
        assert!(matches!(result, Err(ContextError::ContractReverted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let wallet = NullWallet::new();
        wallet.respond("eth_getTransactionReceipt", Value::Null);
        let contract = ProviderContract::new(wallet, CONTRACT)
            .unwrap()
            .with_confirmation_timeout(Some(Duration::from_secs(30)));

        let result = contract.wait(&PendingTransaction { hash: "0xabc".into() }).await;
        assert!(matches!(result, Err(ContextError::ConfirmationTimeout(_))));
    }
}
