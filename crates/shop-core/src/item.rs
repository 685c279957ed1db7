//! # Item Types
//!
//! Sellable items with localized texts, typed attributes and file attachments.
//! Items are loaded from the catalog file (`config/shop.toml`).

use crate::l11n::Language;
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
        }
    }

    /// Parse an ISO 4217 code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            "jpy" => Some(Currency::JPY),
            "cad" => Some(Currency::CAD),
            "aud" => Some(Currency::AUD),
            "chf" => Some(Currency::CHF),
            "mxn" => Some(Currency::MXN),
            _ => None,
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::EUR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for EUR)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Multiply by a quantity
    pub fn times(&self, quantity: u32) -> Price {
        Price::from_cents(self.amount * quantity as i64, self.currency)
    }

    /// Format for display (e.g., "€10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
            Currency::MXN => "MX$",
        };
        if self.currency.decimal_places() == 0 {
            format!("{}{}", symbol, self.amount)
        } else {
            format!("{}{:.2}", symbol, self.as_decimal())
        }
    }
}

/// Kinds of localized item texts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum L11nKind {
    Name1,
    Name2,
    DescriptionShort,
    DescriptionLong,
}

/// A localized item text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemL11n {
    pub kind: L11nKind,
    #[serde(default)]
    pub language: Language,
    pub content: String,
}

/// Attribute value as stored on items and clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttributeValue {
    /// Blank values: `""`, `"0"`, `0`, `0.0` and `false`.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Bool(b) => !b,
            AttributeValue::Int(i) => *i == 0,
            AttributeValue::Float(f) => *f == 0.0,
            AttributeValue::Str(s) => s.is_empty() || s == "0",
        }
    }

    /// String form of the value
    pub fn as_string(&self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Str(s) => s.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Bool(b) => Some(*b as i64),
            AttributeValue::Str(s) => s.trim().parse().ok(),
            AttributeValue::Float(_) => None,
        }
    }

    /// JSON representation, preserving numbers as numbers
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Named attribute on an item or client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// File attached to an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: u64,
    pub name: String,
    /// Path relative to the media root
    pub path: String,
    #[serde(default = "default_mime")]
    pub mime: String,
    /// Type tags, e.g. `shop_primary_image`, `item_purchase_download`
    #[serde(default)]
    pub types: Vec<String>,
}

fn default_mime() -> String {
    "application/octet-stream".to_string()
}

impl MediaFile {
    pub fn has_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t == name)
    }
}

/// A sellable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,

    /// Article number (SKU)
    pub number: String,

    /// Net sales price
    pub sales_price: Price,

    #[serde(default)]
    pub l11n: Vec<ItemL11n>,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    #[serde(default)]
    pub files: Vec<MediaFile>,
}

impl Item {
    pub fn new(id: u64, number: impl Into<String>, sales_price: Price) -> Self {
        Self {
            id,
            number: number.into(),
            sales_price,
            l11n: Vec::new(),
            attributes: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Builder: add a localized text
    pub fn with_l11n(mut self, kind: L11nKind, language: Language, content: impl Into<String>) -> Self {
        self.l11n.push(ItemL11n {
            kind,
            language,
            content: content.into(),
        });
        self
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder: attach a file
    pub fn with_file(mut self, file: MediaFile) -> Self {
        self.files.push(file);
        self
    }

    /// Localized text in `language`, else the first text of that kind, else empty.
    pub fn l11n(&self, kind: L11nKind, language: Language) -> &str {
        self.l11n
            .iter()
            .find(|l| l.kind == kind && l.language == language)
            .or_else(|| self.l11n.iter().find(|l| l.kind == kind))
            .map(|l| l.content.as_str())
            .unwrap_or("")
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// Attribute value only if present and not blank
    pub fn filled_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute(name).filter(|v| !v.is_empty())
    }

    /// Subscription items carry `subscription = 1`
    pub fn is_subscription(&self) -> bool {
        self.attribute("subscription")
            .and_then(AttributeValue::as_int)
            .map(|v| v == 1)
            .unwrap_or(false)
    }

    pub fn file(&self, file_id: u64) -> Option<&MediaFile> {
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn files_by_type<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MediaFile> + 'a {
        self.files.iter().filter(move |f| f.has_type(name))
    }
}

/// Reference to an item by id or article number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    Id(u64),
    Number(String),
}

impl ItemRef {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            ItemRef::Id(id) => item.id == *id,
            ItemRef::Number(number) => item.number == *number,
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Id(id) => write!(f, "#{}", id),
            ItemRef::Number(number) => f.write_str(number),
        }
    }
}
