//! The transaction context: shared wallet/transfer state plus the actions
//! that change it.

use std::sync::atomic::{AtomicBool, Ordering};

use chain_eth::abi::u256_to_u64;
use chain_eth::transaction::{build_transfer, TRANSFER_GAS_LIMIT};
use chain_eth::{address, units};
use chrono::Local;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::contract::TransactionsContract;
use crate::error::ContextError;
use crate::form::{FormData, FormField};
use crate::record::TransactionRecord;
use crate::state::{ContextState, Refresh, SubmittedTransfer};
use crate::storage::{KeyValueStore, TRANSACTION_COUNT_KEY};
use crate::wallet::Eip1193;

/// The wallet and the contract reached through it. Both are absent together
/// when no wallet is injected.
pub struct Capabilities<W, C> {
    pub wallet: W,
    pub contract: C,
}

/// Holds the shared state for a wallet session and performs wallet and
/// contract actions against injected capabilities.
///
/// State is published through a watch channel: call [`subscribe`] to observe
/// every change, or [`state`] for a snapshot.
///
/// [`subscribe`]: TransactionContext::subscribe
/// [`state`]: TransactionContext::state
pub struct TransactionContext<W, C, S> {
    capabilities: Option<Capabilities<W, C>>,
    store: S,
    transfer_gas_limit: u64,
    state: watch::Sender<ContextState>,
    submitting: AtomicBool,
}

/// Marks a submission in flight; released on drop, including on early error
/// returns.
struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ContextError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ContextError::SubmissionInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Publishes `is_loading = true` for its lifetime. Dropping it, including
/// when the enclosing future is cancelled, publishes `false`.
struct LoadingGuard<'a>(&'a watch::Sender<ContextState>);

impl<'a> LoadingGuard<'a> {
    fn raise(state: &'a watch::Sender<ContextState>) -> Self {
        state.send_modify(|state| state.is_loading = true);
        Self(state)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| state.is_loading = false);
    }
}

impl<W, C, S> TransactionContext<W, C, S>
where
    W: Eip1193,
    C: TransactionsContract,
    S: KeyValueStore,
{
    /// Creates the context, seeding the transaction count from `store`.
    ///
    /// Pass `None` for `capabilities` when no wallet is present; every action
    /// then fails with [`ContextError::WalletUnavailable`].
    pub fn new(capabilities: Option<Capabilities<W, C>>, store: S) -> Self {
        let transaction_count = match store.get(TRANSACTION_COUNT_KEY) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(raw = %raw, error = %e, "ignoring unparsable stored transaction count");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "could not read stored transaction count");
                None
            }
        };

        let (state, _) = watch::channel(ContextState {
            transaction_count,
            ..ContextState::default()
        });

        Self {
            capabilities,
            store,
            transfer_gas_limit: TRANSFER_GAS_LIMIT,
            state,
            submitting: AtomicBool::new(false),
        }
    }

    /// Overrides the gas limit hint sent with native transfers.
    pub fn with_transfer_gas_limit(mut self, gas_limit: u64) -> Self {
        self.transfer_gas_limit = gas_limit;
        self
    }

    // ─── Observation ─────────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<ContextState> {
        self.state.subscribe()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ContextState {
        self.state.borrow().clone()
    }

    pub fn current_account(&self) -> String {
        self.state.borrow().current_account.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.borrow().transactions.clone()
    }

    pub fn transaction_count(&self) -> Option<u64> {
        self.state.borrow().transaction_count
    }

    pub fn form_data(&self) -> FormData {
        self.state.borrow().form.clone()
    }

    // ─── Form ────────────────────────────────────────────────────────

    /// Replaces exactly one form field with `value`.
    pub fn handle_change(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        self.state
            .send_modify(|state| state.form = state.form.with_field(field, value));
    }

    pub fn set_form_data(&self, form: FormData) {
        self.state.send_modify(|state| state.form = form);
    }

    pub fn reset_form(&self) {
        self.set_form_data(FormData::default());
    }

    // ─── Wallet ──────────────────────────────────────────────────────

    fn capabilities(&self) -> Result<&Capabilities<W, C>, ContextError> {
        self.capabilities.as_ref().ok_or_else(|| {
            warn!("no wallet injected; install a browser wallet to continue");
            ContextError::WalletUnavailable("no wallet injected".into())
        })
    }

    fn set_account(&self, account: &str) {
        self.state
            .send_modify(|state| state.current_account = account.to_string());
    }

    /// Prompts the wallet for authorization and adopts the first account.
    pub async fn connect_wallet(&self) -> Result<String, ContextError> {
        let caps = self.capabilities()?;
        let account = caps
            .wallet
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ContextError::InvalidResponse("wallet authorized no accounts".into())
            })?;

        info!(account = %account, "wallet connected");
        self.set_account(&account);
        Ok(account)
    }

    /// Adopts an already-authorized account without prompting and, if there
    /// is one, refreshes the transaction list.
    pub async fn check_if_wallet_is_connected(&self) -> Result<Option<String>, ContextError> {
        let caps = self.capabilities()?;
        let Some(account) = caps.wallet.accounts().await?.into_iter().next() else {
            info!("no authorized accounts found");
            return Ok(None);
        };

        info!(account = %account, "found authorized account");
        self.set_account(&account);
        self.get_all_transactions().await;
        Ok(Some(account))
    }

    /// Handles the wallet's `accountsChanged` event.
    pub async fn on_accounts_changed(&self, accounts: Vec<String>) -> Option<Refresh> {
        match accounts.into_iter().next() {
            Some(account) => {
                info!(account = %account, "active account changed");
                self.set_account(&account);
                Some(self.get_all_transactions().await)
            }
            None => {
                info!("wallet disconnected all accounts");
                self.set_account("");
                None
            }
        }
    }

    // ─── Contract ────────────────────────────────────────────────────

    /// Replaces the transaction list with the contract's full history.
    ///
    /// Never fails: on error the list is kept, the error is logged and stored
    /// as `last_refresh_error`, and [`Refresh::Failed`] is returned.
    pub async fn get_all_transactions(&self) -> Refresh {
        let fetched = match self.capabilities() {
            Ok(caps) => caps.contract.get_all_transactions().await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(transfers) => {
                let records: Vec<TransactionRecord> = transfers
                    .iter()
                    .map(|transfer| TransactionRecord::from_transfer(transfer, &Local))
                    .collect();
                let count = records.len();
                debug!(count, "transaction list refreshed");
                self.state.send_modify(|state| {
                    state.transactions = records;
                    state.last_refresh_error = None;
                });
                Refresh::Updated { count }
            }
            Err(e) => {
                warn!(error = %e, "transaction list refresh failed");
                let reported = e.clone();
                self.state
                    .send_modify(|state| state.last_refresh_error = Some(reported));
                Refresh::Failed(e)
            }
        }
    }

    /// Reads the contract's transaction count and mirrors it into state and
    /// local storage.
    pub async fn check_if_transactions_exist(&self) -> Result<u64, ContextError> {
        let caps = self.capabilities()?;
        self.read_transaction_count(&caps.contract).await
    }

    async fn read_transaction_count(&self, contract: &C) -> Result<u64, ContextError> {
        let count = u256_to_u64(contract.get_transaction_count().await?)?;
        self.state
            .send_modify(|state| state.transaction_count = Some(count));
        self.store.set(TRANSACTION_COUNT_KEY, &count.to_string())?;
        debug!(count, "transaction count stored");
        Ok(count)
    }

    /// Sends the amount in the form to `address_to`, records the transfer on
    /// chain and waits for the record to confirm.
    ///
    /// Only one submission runs at a time; a concurrent call fails with
    /// [`ContextError::SubmissionInFlight`]. `is_loading` is true from record
    /// submission until its confirmation settles, whatever the outcome.
    pub async fn send_transaction(&self) -> Result<SubmittedTransfer, ContextError> {
        let caps = self.capabilities()?;
        let _guard = SubmissionGuard::acquire(&self.submitting)?;

        let (from, form) = {
            let state = self.state.borrow();
            (state.current_account.clone(), state.form.clone())
        };
        if from.is_empty() {
            return Err(ContextError::InvalidInput("no wallet account connected".into()));
        }
        address::parse_address(&form.address_to)
            .map_err(|e| ContextError::InvalidInput(format!("addressTo: {e}")))?;
        let amount = units::parse_ether(&form.amount_to)
            .map_err(|e| ContextError::InvalidInput(format!("amountTo: {e}")))?;

        let transfer = build_transfer(&from, &form.address_to, amount, self.transfer_gas_limit)?;
        let transfer_hash = caps.wallet.send_transaction(&transfer).await?;
        info!(hash = %transfer_hash, to = %form.address_to, "transfer submitted");

        let pending = caps
            .contract
            .add_to_blockchain(&form.address_to, amount, &form.message, &form.keyword)
            .await?;

        let loading = LoadingGuard::raise(&self.state);
        debug!(hash = %pending.hash, "awaiting record confirmation");
        let confirmation = caps.contract.wait(&pending).await;
        drop(loading);

        let receipt = confirmation?;
        info!(hash = %receipt.hash, block = ?receipt.block_number, "record confirmed");

        let transaction_count = self.read_transaction_count(&caps.contract).await?;
        self.get_all_transactions().await;

        Ok(SubmittedTransfer {
            transfer_hash,
            record_hash: pending.hash,
            block_number: receipt.block_number,
            transaction_count,
        })
    }

    /// The provider-mount sequence: adopt any authorized account, then
    /// refresh the stored transaction count. Both steps run; the first error
    /// is returned.
    pub async fn mount(&self) -> Result<(), ContextError> {
        let connected = self.check_if_wallet_is_connected().await;
        let counted = self.check_if_transactions_exist().await;
        connected?;
        counted?;
        Ok(())
    }
}
