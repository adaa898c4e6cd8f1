use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, SyncError};

const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

const THREE_DECIMAL: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// Number of minor-unit digits for an ISO 4217 code. Unknown codes use 2.
pub fn fraction_digits(currency: &str) -> u32 {
    let code = currency.trim().to_uppercase();
    if ZERO_DECIMAL.contains(&code.as_str()) {
        0
    } else if THREE_DECIMAL.contains(&code.as_str()) {
        3
    } else {
        2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    value: Decimal,
    currency: String,
}

impl Money {
    pub fn parse(value: &str, currency: &str) -> Result<Self> {
        let raw = value.trim().replace(',', "");
        let parsed = Decimal::from_str(&raw)
            .map_err(|_| SyncError::InvalidAmount(format!("{value} {currency}")))?;
        let value = parsed.round_dp_with_strategy(fraction_digits(currency), RoundingStrategy::ToZero);
        Ok(Self {
            value,
            currency: currency.trim().to_uppercase(),
        })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Exact comparison after normalization. Different currencies are an error, never `false`.
    pub fn equals(&self, other: &Money) -> Result<bool> {
        if self.currency != other.currency {
            return Err(SyncError::CurrencyMismatch(
                self.currency.clone(),
                other.currency.clone(),
            ));
        }
        Ok(self.value == other.value)
    }
}
