use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::money::Money;

/// Remote id stored on transactions that must never be pushed to Lunch Money.
pub const EXCLUDED_REMOTE_ID: i64 = -1;

/// Mapping target meaning "ignore this source account forever".
pub const IGNORE_ACCOUNT_ID: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    pub fn new(value: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: currency.into(),
        }
    }

    pub fn to_money(&self) -> Result<Money> {
        Money::parse(&self.value, &self.currency)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,
    pub category_code: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
}

impl Merchant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub reference_number: String,
    /// 0 = not yet synced, negative = excluded from sync.
    pub remote_id: i64,
    pub amount: Amount,
    pub merchant: Merchant,
    pub date: String,
    pub posted_date: String,
    pub source_account_name: String,
}

impl Transaction {
    pub fn is_excluded(&self) -> bool {
        self.remote_id <= EXCLUDED_REMOTE_ID
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionWithMapping {
    pub transaction: Transaction,
    pub mapping: AccountMapping,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountMapping {
    pub external_name: String,
    /// Positive for a real Lunch Money account, [`IGNORE_ACCOUNT_ID`] when ignored.
    pub remote_id: i64,
    pub is_plaid: bool,
}

impl AccountMapping {
    pub fn ignored(external_name: impl Into<String>) -> Self {
        Self {
            external_name: external_name.into(),
            remote_id: IGNORE_ACCOUNT_ID,
            is_plaid: false,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.remote_id == IGNORE_ACCOUNT_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions(u8);

impl SyncOptions {
    pub const TRANSACTIONS: SyncOptions = SyncOptions(0b01);
    pub const BALANCE: SyncOptions = SyncOptions(0b10);
    pub const ALL: SyncOptions = SyncOptions(0b11);

    pub fn from_bits(bits: i64) -> Self {
        SyncOptions((bits & Self::ALL.0 as i64) as u8)
    }

    pub fn bits(self) -> i64 {
        self.0 as i64
    }

    pub fn contains(self, other: SyncOptions) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn without(self, other: SyncOptions) -> Self {
        SyncOptions(self.0 & !other.0)
    }

    /// Parse the user-facing option names used by `accounts disable|enable`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "transaction" | "transactions" | "t" => Some(Self::TRANSACTIONS),
            "balance" | "balances" | "b" => Some(Self::BALANCE),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSyncState {
    pub remote_id: i64,
    pub balance: Amount,
    pub balance_last_updated: Option<DateTime<Utc>>,
    pub is_plaid: bool,
    pub sync_options: SyncOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAccount {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub balance: Amount,
    pub balance_last_updated: Option<DateTime<Utc>>,
    pub is_plaid: bool,
}

impl RemoteAccount {
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalAccount {
    pub name: String,
    pub description: String,
    pub balance: Amount,
}
