//! Deterministic wallet and contract doubles.
//!
//! Both are cheap to clone and share their state between clones, so a test
//! can hand one clone to a [`TransactionContext`] and script or inspect the
//! other. Neither touches the network.
//!
//! [`TransactionContext`]: crate::context::TransactionContext

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chain_eth::address::parse_address;
use chain_eth::contract::TransferStruct;
use chain_eth::{Address, U256};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::contract::{PendingTransaction, TransactionReceipt, TransactionsContract};
use crate::error::ContextError;
use crate::wallet::Eip1193;

type Scripted = Result<Value, ContextError>;

#[derive(Default)]
struct NullWalletState {
    once: HashMap<String, VecDeque<Scripted>>,
    sticky: HashMap<String, Scripted>,
    requests: Vec<(String, Value)>,
    sent: u64,
}

/// A wallet that answers from a script and records every request.
///
/// Unscripted `eth_accounts`/`eth_requestAccounts` return no accounts and
/// unscripted `eth_sendTransaction` returns a fresh fake hash. Other
/// unscripted methods fail with [`ContextError::InvalidResponse`].
#[derive(Clone, Default)]
pub struct NullWallet {
    inner: Arc<Mutex<NullWalletState>>,
}

impl NullWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet that has already authorized `accounts`.
    pub fn with_accounts(accounts: &[&str]) -> Self {
        let wallet = Self::new();
        wallet.respond("eth_accounts", json!(accounts));
        wallet.respond("eth_requestAccounts", json!(accounts));
        wallet
    }

    /// Answers every future `method` request with `result`.
    pub fn respond(&self, method: &str, result: Value) {
        self.inner.lock().sticky.insert(method.to_string(), Ok(result));
    }

    /// Fails every future `method` request with `error`.
    pub fn fail(&self, method: &str, error: ContextError) {
        self.inner.lock().sticky.insert(method.to_string(), Err(error));
    }

    /// Queues a one-shot answer, used before any sticky answer.
    pub fn respond_once(&self, method: &str, result: Scripted) {
        self.inner
            .lock()
            .once
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// All requests so far, in order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.inner.lock().requests.clone()
    }

    /// Params of every `method` request so far.
    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.inner
            .lock()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.inner
            .lock()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }
}

#[async_trait]
impl Eip1193 for NullWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ContextError> {
        let mut state = self.inner.lock();
        state.requests.push((method.to_string(), params));

        if let Some(result) = state.once.get_mut(method).and_then(VecDeque::pop_front) {
            return result;
        }
        if let Some(result) = state.sticky.get(method) {
            return result.clone();
        }

        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!([])),
            "eth_sendTransaction" => {
                state.sent += 1;
                Ok(json!(format!("0x{:064x}", state.sent)))
            }
            _ => Err(ContextError::InvalidResponse(format!(
                "no scripted answer for {method}"
            ))),
        }
    }
}

struct NullContractState {
    transfers: Vec<TransferStruct>,
    count_override: Option<U256>,
    signer: Address,
    clock: u64,
    fetch_error: Option<ContextError>,
    count_error: Option<ContextError>,
    add_error: Option<ContextError>,
    wait_error: Option<ContextError>,
    confirmation_gate: Option<Arc<Notify>>,
    fetch_calls: usize,
    count_calls: usize,
    submitted: u64,
}

impl Default for NullContractState {
    fn default() -> Self {
        Self {
            transfers: Vec::new(),
            count_override: None,
            signer: Address::ZERO,
            clock: 1_640_995_200,
            fetch_error: None,
            count_error: None,
            add_error: None,
            wait_error: None,
            confirmation_gate: None,
            fetch_calls: 0,
            count_calls: 0,
            submitted: 0,
        }
    }
}

/// An in-memory `Transactions` contract.
///
/// `add_to_blockchain` appends to the stored history immediately, stamping
/// each record one second after the previous one. The count is the history
/// length unless overridden.
#[derive(Clone, Default)]
pub struct NullContract {
    inner: Arc<Mutex<NullContractState>>,
}

impl NullContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transfers(transfers: Vec<TransferStruct>) -> Self {
        let contract = Self::new();
        contract.inner.lock().transfers = transfers;
        contract
    }

    /// Sender recorded for transfers added through this contract.
    pub fn set_signer(&self, signer: &str) -> Result<(), ContextError> {
        self.inner.lock().signer = parse_address(signer)?;
        Ok(())
    }

    pub fn push_transfer(&self, transfer: TransferStruct) {
        self.inner.lock().transfers.push(transfer);
    }

    pub fn set_count(&self, count: Option<U256>) {
        self.inner.lock().count_override = count;
    }

    /// Makes `get_all_transactions` fail (`None` restores it).
    pub fn fail_fetch(&self, error: Option<ContextError>) {
        self.inner.lock().fetch_error = error;
    }

    pub fn fail_count(&self, error: Option<ContextError>) {
        self.inner.lock().count_error = error;
    }

    pub fn fail_add(&self, error: Option<ContextError>) {
        self.inner.lock().add_error = error;
    }

    pub fn fail_wait(&self, error: Option<ContextError>) {
        self.inner.lock().wait_error = error;
    }

    /// Holds every confirmation until the returned gate is notified once per
    /// waiting transaction.
    pub fn hold_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().confirmation_gate = Some(gate.clone());
        gate
    }

    pub fn transfers(&self) -> Vec<TransferStruct> {
        self.inner.lock().transfers.clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.inner.lock().fetch_calls
    }

    pub fn count_calls(&self) -> usize {
        self.inner.lock().count_calls
    }
}

#[async_trait]
impl TransactionsContract for NullContract {
    async fn get_all_transactions(&self) -> Result<Vec<TransferStruct>, ContextError> {
        let mut state = self.inner.lock();
        state.fetch_calls += 1;
        match &state.fetch_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.transfers.clone()),
        }
    }

    async fn get_transaction_count(&self) -> Result<U256, ContextError> {
        let mut state = self.inner.lock();
        state.count_calls += 1;
        if let Some(e) = &state.count_error {
            return Err(e.clone());
        }
        Ok(state
            .count_override
            .unwrap_or_else(|| U256::from(state.transfers.len())))
    }

    async fn add_to_blockchain(
        &self,
        receiver: &str,
        amount: U256,
        message: &str,
        keyword: &str,
    ) -> Result<PendingTransaction, ContextError> {
        let receiver = parse_address(receiver)?;
        let mut state = self.inner.lock();
        if let Some(e) = &state.add_error {
            return Err(e.clone());
        }

        state.clock += 1;
        state.submitted += 1;
        let transfer = TransferStruct {
            sender: state.signer,
            receiver,
            amount,
            message: message.to_string(),
            timestamp: U256::from(state.clock),
            keyword: keyword.to_string(),
        };
        state.transfers.push(transfer);

        Ok(PendingTransaction {
            hash: format!("0x{:064x}", 0xc0de_0000 + state.submitted),
        })
    }

    async fn wait(&self, pending: &PendingTransaction) -> Result<TransactionReceipt, ContextError> {
        let gate = self.inner.lock().confirmation_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.inner.lock();
        if let Some(e) = &state.wait_error {
            return Err(e.clone());
        }
        Ok(TransactionReceipt {
            hash: pending.hash.clone(),
            block_number: Some(state.submitted),
        })
    }
}
