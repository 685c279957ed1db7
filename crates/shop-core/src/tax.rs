//! # Tax Codes
//!
//! Tax rates are resolved from the client's and the item's sales tax
//! classification codes through a combination table.

use crate::item::Price;
use serde::{Deserialize, Serialize};

/// A tax code with its rate in basis points (1900 = 19 %)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCode {
    pub abbr: String,
    pub rate_bp: u32,
}

impl TaxCode {
    pub fn new(abbr: impl Into<String>, rate_bp: u32) -> Self {
        Self {
            abbr: abbr.into(),
            rate_bp,
        }
    }

    /// Tax on a net amount, rounded half away from zero
    pub fn tax_for(&self, net: &Price) -> Price {
        let raw = net.amount as i128 * self.rate_bp as i128;
        let rounded = if raw >= 0 {
            (raw + 5_000) / 10_000
        } else {
            (raw - 5_000) / 10_000
        };
        Price::from_cents(rounded as i64, net.currency)
    }

    /// Rate as a percentage, for display
    pub fn percent(&self) -> f64 {
        self.rate_bp as f64 / 100.0
    }
}

/// Maps (client code, item code) to a tax code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxCombination {
    pub client_code: String,
    pub item_code: String,
    pub tax_code: TaxCode,
}

impl TaxCombination {
    pub fn applies_to(&self, client_code: &str, item_code: &str) -> bool {
        self.client_code == client_code && self.item_code == item_code
    }
}
