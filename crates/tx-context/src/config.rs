//! Context configuration with TOML file support.

use std::path::PathBuf;
use std::time::Duration;

use chain_eth::address::parse_address;
use chain_eth::transaction::TRANSFER_GAS_LIMIT;
use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::logging::{self, LogFormat};

/// Configuration for a transaction context backed by a JSON-RPC node.
///
/// Load it with [`ContextConfig::from_toml_file`] or build it directly in
/// tests. Call [`ContextConfig::validate`] before use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Deployed `Transactions` contract.
    #[serde(default)]
    pub contract_address: String,

    /// JSON-RPC endpoint of a node with unlocked accounts.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Gas limit hint for native transfers.
    #[serde(default = "default_transfer_gas_limit")]
    pub transfer_gas_limit: u64,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    /// Upper bound on waiting for a record to confirm. Unset waits forever.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,

    /// Where the transaction count is persisted.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_transfer_gas_limit() -> u64 {
    TRANSFER_GAS_LIMIT
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./tx-context.json")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ContextConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, ContextError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ContextError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ContextError> {
        toml::from_str(s).map_err(|e| ContextError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ContextError> {
        toml::to_string_pretty(self).map_err(|e| ContextError::Config(e.to_string()))
    }

    /// Checks fields that have no usable default.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.contract_address.trim().is_empty() {
            return Err(ContextError::Config("contract_address is not set".into()));
        }
        parse_address(&self.contract_address)
            .map_err(|e| ContextError::Config(format!("contract_address: {e}")))?;
        if self.rpc_url.trim().is_empty() {
            return Err(ContextError::Config("rpc_url is not set".into()));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(ContextError::Config(
                "receipt_poll_interval_ms must be positive".into(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, ContextError> {
        self.log_format.parse()
    }

    /// Installs the global tracing subscriber with the configured format and
    /// level.
    pub fn init_logging(&self) -> Result<(), ContextError> {
        logging::init_logging(self.log_format()?, &self.log_level)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            rpc_url: default_rpc_url(),
            transfer_gas_limit: default_transfer_gas_limit(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            confirmation_timeout_secs: None,
            storage_path: default_storage_path(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ContextConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config, ContextConfig::default());
        assert_eq!(config.transfer_gas_limit, 0x5208);
        assert_eq!(config.confirmation_timeout(), None);
        assert_eq!(config.log_format().unwrap(), LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = format!(
            r#"
            contract_address = "{CONTRACT}"
            confirmation_timeout_secs = 90
            log_format = "json"
        "#
        );
        let config = ContextConfig::from_toml_str(&toml).expect("should parse");
        assert_eq!(config.contract_address, CONTRACT);
        assert_eq!(config.confirmation_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.receipt_poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = ContextConfig {
            contract_address: CONTRACT.into(),
            confirmation_timeout_secs: Some(30),
            ..ContextConfig::default()
        };
        let parsed = ContextConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_rejects_missing_or_bad_contract() {
        assert!(matches!(
            ContextConfig::default().validate(),
            Err(ContextError::Config(msg)) if msg.contains("not set")
        ));

        let config = ContextConfig {
            contract_address: "0x1234".into(),
            ..ContextConfig::default()
        };
        assert!(matches!(config.validate(), Err(ContextError::Config(_))));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let config = ContextConfig {
            contract_address: CONTRACT.into(),
            log_format: "xml".into(),
            ..ContextConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn init_logging_rejects_unknown_format_before_installing() {
        let config = ContextConfig {
            log_format: "xml".into(),
            log_level: "debug".into(),
            ..ContextConfig::default()
        };
        assert!(matches!(
            config.init_logging(),
            Err(ContextError::Config(msg)) if msg.contains("log format")
        ));

        let _ = ContextConfig::default().init_logging();
        assert!(ContextConfig::default().init_logging().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = ContextConfig::from_toml_file("/nonexistent/tx-context.toml").unwrap_err();
        assert!(matches!(err, ContextError::Config(_)));
    }
}
