//! # Bill Types
//!
//! Bills (invoice headers), bill elements (line items) and the hosted
//! checkout sessions created for them.

use crate::error::{ShopError, ShopResult};
use crate::item::{Currency, Item, L11nKind, Price};
use crate::l11n::Language;
use crate::tax::TaxCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Bill attribute holding the hosted checkout session id
pub const STRIPE_SESSION_ATTRIBUTE: &str = "stripe_session_id";

/// Lifecycle of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Being assembled, not yet persisted as final
    #[default]
    Draft,
    /// Persisted, awaiting payment
    Active,
    /// Paid and finalized; proof of purchase
    Archived,
    Cancelled,
}

/// A line item on a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillElement {
    pub id: Uuid,

    pub item_id: u64,

    /// Item number (denormalized)
    pub item_number: String,

    /// Item name in the bill language (denormalized)
    pub item_name: String,

    pub quantity: u32,

    pub unit_net: Price,

    pub tax_code: String,

    /// Applied tax rate in basis points
    pub tax_rate_bp: u32,

    pub unit_tax: Price,

    pub unit_gross: Price,
}

impl BillElement {
    /// Price an item under a tax code
    pub fn from_item(item: &Item, tax_code: &TaxCode, quantity: u32, language: Language) -> Self {
        let unit_net = item.sales_price.clone();
        let unit_tax = tax_code.tax_for(&unit_net);
        let unit_gross = Price::from_cents(unit_net.amount + unit_tax.amount, unit_net.currency);

        let name = item.l11n(L11nKind::Name1, language);
        let item_name = if name.is_empty() {
            item.number.clone()
        } else {
            name.to_string()
        };

        Self {
            id: Uuid::new_v4(),
            item_id: item.id,
            item_number: item.number.clone(),
            item_name,
            quantity,
            unit_net,
            tax_code: tax_code.abbr.clone(),
            tax_rate_bp: tax_code.rate_bp,
            unit_tax,
            unit_gross,
        }
    }

    pub fn total_net(&self) -> Price {
        self.unit_net.times(self.quantity)
    }

    pub fn total_tax(&self) -> Price {
        self.unit_tax.times(self.quantity)
    }

    pub fn total_gross(&self) -> Price {
        self.unit_gross.times(self.quantity)
    }
}

/// Invoice header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,

    /// Human-readable bill number (assigned by billing)
    pub number: String,

    pub client_id: u64,

    /// Account the client belongs to
    pub account_id: u64,

    pub currency: Currency,

    pub language: Language,

    /// Payment contact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub status: BillStatus,

    pub elements: Vec<BillElement>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,

    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Create a draft bill with a generated id
    pub fn new(client_id: u64, account_id: u64, currency: Currency, language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: String::new(),
            client_id,
            account_id,
            currency,
            language,
            email: None,
            status: BillStatus::Draft,
            elements: Vec::new(),
            attributes: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Set payment contact email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach an element; currencies must match
    pub fn add_element(&mut self, element: BillElement) -> ShopResult<()> {
        if element.unit_net.currency != self.currency {
            return Err(ShopError::InvalidRequest(format!(
                "Element currency {} does not match bill currency {}",
                element.unit_net.currency, self.currency
            )));
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn net_total(&self) -> Price {
        self.sum(BillElement::total_net)
    }

    pub fn tax_total(&self) -> Price {
        self.sum(BillElement::total_tax)
    }

    pub fn gross_total(&self) -> Price {
        self.sum(BillElement::total_gross)
    }

    fn sum(&self, f: impl Fn(&BillElement) -> Price) -> Price {
        let amount = self.elements.iter().map(|e| f(e).amount).sum();
        Price::from_cents(amount, self.currency)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn references_item(&self, item_id: u64) -> bool {
        self.elements.iter().any(|e| e.item_id == item_id)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Status of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Session created, awaiting payment
    Open,
    /// Payment completed successfully
    Complete,
    /// Session expired
    Expired,
}

impl Default for CheckoutStatus {
    fn default() -> Self {
        CheckoutStatus::Open
    }
}

/// A checkout session created by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Bill being paid
    pub bill_id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect customer to for payment
    pub checkout_url: String,

    #[serde(default)]
    pub status: CheckoutStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(
        session_id: impl Into<String>,
        bill_id: impl Into<String>,
        provider: impl Into<String>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            bill_id: bill_id.into(),
            provider: provider.into(),
            checkout_url: checkout_url.into(),
            status: CheckoutStatus::Open,
            expires_at: None,
            payment_intent_id: None,
            customer_id: None,
            created_at: Utc::now(),
        }
    }

    /// Check if session is still valid
    pub fn is_active(&self) -> bool {
        matches!(self.status, CheckoutStatus::Open)
            && self
                .expires_at
                .map(|exp| exp > Utc::now())
                .unwrap_or(true)
    }
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CheckoutCompleted,
    /// Delayed method (e.g. SEPA debit) settled after the session completed
    AsyncPaymentSucceeded,
    AsyncPaymentFailed,
    CheckoutExpired,
    PaymentFailed,
    RefundIssued,
    /// Unknown event (passthrough)
    Unknown(String),
}

/// A parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,

    pub event_type: WebhookEventType,

    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Amount paid (in smallest unit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Raw event object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}
