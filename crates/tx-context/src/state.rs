use crate::error::ContextError;
use crate::form::FormData;
use crate::record::TransactionRecord;

/// Everything the transaction context publishes to its observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextState {
    /// First authorized account, or empty when no wallet is connected.
    pub current_account: String,
    /// True while a submitted record awaits confirmation.
    pub is_loading: bool,
    /// Transfer history as of the last successful refresh.
    pub transactions: Vec<TransactionRecord>,
    /// Last known on-chain transaction count, seeded from local storage.
    pub transaction_count: Option<u64>,
    pub form: FormData,
    /// Why the most recent refresh failed; cleared by the next success.
    pub last_refresh_error: Option<ContextError>,
}

impl ContextState {
    pub fn is_connected(&self) -> bool {
        !self.current_account.is_empty()
    }
}

/// Outcome of a transaction-list refresh. Refresh failures are reported,
/// never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// The list was replaced with `count` records.
    Updated { count: usize },
    /// The list was left as it was.
    Failed(ContextError),
}

/// Hashes and count after a successful [`send_transaction`].
///
/// [`send_transaction`]: crate::context::TransactionContext::send_transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    /// Hash of the native-currency transfer.
    pub transfer_hash: String,
    /// Hash of the `addToBlockchain` record transaction.
    pub record_hash: String,
    pub block_number: Option<u64>,
    pub transaction_count: u64,
}
