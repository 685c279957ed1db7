//! # Accounts and Clients
//!
//! An account is the logged-in user; a client is the purchasing entity
//! billing links to. Checkout provisions a client for accounts that have none.

use crate::item::{Attribute, AttributeValue};
use crate::l11n::Language;
use crate::permission::{Permission, PermissionCategory, PermissionType};
use serde::{Deserialize, Serialize};

/// Offset added to the account id to derive a client number
pub const CLIENT_NUMBER_OFFSET: u64 = 100_000;

/// Postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
}

impl Address {
    /// Required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("postal", &self.postal),
            ("city", &self.city),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// User account as provided by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Account {
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            language: Language::default(),
            addresses: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// First stored address, if any
    pub fn primary_address(&self) -> Option<&Address> {
        self.addresses.first()
    }

    pub fn has_permission(
        &self,
        module: &str,
        kind: PermissionType,
        category: PermissionCategory,
    ) -> bool {
        self.permissions
            .iter()
            .any(|p| p.matches(module, kind, category))
    }
}

/// Purchasing entity linked to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: u64,
    pub number: String,
    pub account_id: u64,
    pub main_address: Address,
    #[serde(default)]
    pub vat_id: String,
    #[serde(default)]
    pub unit: Option<u64>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Client {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Data needed to create a client
#[derive(Debug, Clone)]
pub struct NewClient {
    pub account_id: u64,
    pub number: String,
    pub address: Address,
    pub vat_id: String,
    pub unit: Option<u64>,
}

impl NewClient {
    /// Client number derived from the account id
    pub fn number_for_account(account_id: u64) -> String {
        (CLIENT_NUMBER_OFFSET + account_id).to_string()
    }
}
