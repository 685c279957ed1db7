//! # Stored Payment Methods
//!
//! Payment methods a client has on file, filtered by status and type
//! during checkout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Card,
    SepaDebit,
    Paypal,
    Invoice,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Card => "card",
            PaymentType::SepaDebit => "sepa_debit",
            PaymentType::Paypal => "paypal",
            PaymentType::Invoice => "invoice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" => Some(PaymentType::Card),
            "sepa_debit" | "sepa" => Some(PaymentType::SepaDebit),
            "paypal" => Some(PaymentType::Paypal),
            "invoice" => Some(PaymentType::Invoice),
            _ => None,
        }
    }

    /// Method name understood by hosted checkout, if it can be paid there
    pub fn checkout_method(&self) -> Option<&'static str> {
        match self {
            PaymentType::Card => Some("card"),
            PaymentType::SepaDebit => Some("sepa_debit"),
            PaymentType::Paypal => Some("paypal"),
            PaymentType::Invoice => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: u64,
    pub account_id: u64,
    pub kind: PaymentType,
    #[serde(default)]
    pub status: PaymentStatus,
}

impl PaymentMethod {
    pub fn is_active(&self) -> bool {
        self.status == PaymentStatus::Active
    }

    /// Active and, when an allow-list is given, of an allowed type
    pub fn is_usable(&self, allow_list: Option<&[PaymentType]>) -> bool {
        self.is_active() && allow_list.map_or(true, |types| types.contains(&self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(kind: PaymentType, status: PaymentStatus) -> PaymentMethod {
        PaymentMethod {
            id: 1,
            account_id: 1,
            kind,
            status,
        }
    }

    #[test]
    fn test_parse_payment_type() {
        assert_eq!(PaymentType::parse("Card"), Some(PaymentType::Card));
        assert_eq!(PaymentType::parse("sepa"), Some(PaymentType::SepaDebit));
        assert_eq!(PaymentType::parse("bitcoin"), None);
    }

    #[test]
    fn test_usable_filter() {
        let card = method(PaymentType::Card, PaymentStatus::Active);
        let inactive = method(PaymentType::Card, PaymentStatus::Inactive);

        assert!(card.is_usable(None));
        assert!(card.is_usable(Some(&[PaymentType::Card])));
        assert!(!card.is_usable(Some(&[PaymentType::Paypal])));
        assert!(!inactive.is_usable(None));
    }
}
