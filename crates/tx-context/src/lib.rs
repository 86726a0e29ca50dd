//! Wallet session and transfer-history state for the `Transactions` contract.
//!
//! [`TransactionContext`] owns the connected account, the send form, the
//! transfer list and the loading flag, and performs wallet and contract
//! actions against injected capabilities:
//! - any [`Eip1193`] wallet ([`HttpWallet`] for JSON-RPC nodes)
//! - any [`TransactionsContract`] ([`ProviderContract`] over a wallet)
//! - any [`KeyValueStore`] for the persisted transaction count
//!
//! The [`nullables`] module provides in-memory versions of all three.

pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod form;
pub mod logging;
pub mod nullables;
pub mod record;
pub mod rpc;
pub mod state;
pub mod storage;
pub mod wallet;

use std::sync::Arc;

pub use config::ContextConfig;
pub use context::{Capabilities, TransactionContext};
pub use contract::{PendingTransaction, ProviderContract, TransactionReceipt, TransactionsContract};
pub use error::ContextError;
pub use form::{FormData, FormField};
pub use record::TransactionRecord;
pub use rpc::HttpWallet;
pub use state::{ContextState, Refresh, SubmittedTransfer};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use wallet::Eip1193;

/// A context talking to a JSON-RPC node and persisting to a file.
pub type HttpContext = TransactionContext<Arc<HttpWallet>, ProviderContract<Arc<HttpWallet>>, FileStore>;

/// Builds a node-backed context from a validated configuration.
pub fn connect(config: &ContextConfig) -> Result<HttpContext, ContextError> {
    config.validate()?;

    let wallet = Arc::new(HttpWallet::new(config.rpc_url.clone())?);
    let contract = ProviderContract::new(wallet.clone(), &config.contract_address)?
        .with_poll_interval(config.receipt_poll_interval())
        .with_confirmation_timeout(config.confirmation_timeout());
    let store = FileStore::open(config.storage_path.clone())?;

    tracing::info!(
        rpc_url = %config.rpc_url,
        contract = %config.contract_address,
        storage = %config.storage_path.display(),
        "transaction context configured"
    );

    Ok(TransactionContext::new(Some(Capabilities { wallet, contract }), store)
        .with_transfer_gas_limit(config.transfer_gas_limit))
}
