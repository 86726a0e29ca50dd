use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The send form as typed by the user. All fields are raw strings; they are
/// validated only when a transaction is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub address_to: String,
    pub amount_to: String,
    pub keyword: String,
    pub message: String,
}

/// One field of [`FormData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    AddressTo,
    AmountTo,
    Keyword,
    Message,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::AddressTo,
        FormField::AmountTo,
        FormField::Keyword,
        FormField::Message,
    ];

    /// Input name used by form inputs.
    pub fn name(&self) -> &'static str {
        match self {
            FormField::AddressTo => "addressTo",
            FormField::AmountTo => "amountTo",
            FormField::Keyword => "keyword",
            FormField::Message => "message",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormField {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| ContextError::InvalidInput(format!("unknown form field {s:?}")))
    }
}

impl FormData {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::AddressTo => &self.address_to,
            FormField::AmountTo => &self.amount_to,
            FormField::Keyword => &self.keyword,
            FormField::Message => &self.message,
        }
    }

    /// A copy of this form with `field` replaced by `value`.
    pub fn with_field(&self, field: FormField, value: impl Into<String>) -> FormData {
        let mut next = self.clone();
        let slot = match field {
            FormField::AddressTo => &mut next.address_to,
            FormField::AmountTo => &mut next.amount_to,
            FormField::Keyword => &mut next.keyword,
            FormField::Message => &mut next.message,
        };
        *slot = value.into();
        next
    }
}
