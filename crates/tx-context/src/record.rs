use chain_eth::abi::u256_to_u64;
use chain_eth::address::to_checksum;
use chain_eth::contract::TransferStruct;
use chain_eth::units::wei_to_ether;
use chain_eth::U256;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Display format for transfer timestamps, e.g. `1/1/2022, 12:00:00 AM`.
pub const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// A transfer as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub address_from: String,
    pub address_to: String,
    /// Block time rendered in the display timezone.
    pub timestamp: String,
    pub message: String,
    pub keyword: String,
    /// Amount in ether.
    pub amount: f64,
}

impl TransactionRecord {
    /// Maps a contract record into the view model, rendering its timestamp
    /// in `tz`.
    pub fn from_transfer<Tz>(transfer: &TransferStruct, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            address_from: to_checksum(&transfer.sender),
            address_to: to_checksum(&transfer.receiver),
            timestamp: format_timestamp(transfer.timestamp, tz),
            message: transfer.message.clone(),
            keyword: transfer.keyword.clone(),
            amount: wei_to_ether(transfer.amount),
        }
    }
}

/// Renders a Unix timestamp in seconds. Values outside the calendar range
/// fall back to the raw number.
pub fn format_timestamp<Tz>(seconds: U256, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    u256_to_u64(seconds)
        .ok()
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| seconds.to_string())
}
