//! # Shop Catalog File
//!
//! The TOML document (`config/shop.toml`) the server seeds its in-memory
//! stores from: items, tax combinations, accounts, clients, stored payment
//! methods and the attributes newly created clients start with.

use crate::client::{Account, Client};
use crate::error::ShopResult;
use crate::item::{Attribute, Item};
use crate::memory::InMemoryShop;
use crate::payment::PaymentMethod;
use crate::tax::TaxCombination;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDefaults {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopCatalog {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub tax_combinations: Vec<TaxCombination>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub client_defaults: ClientDefaults,
}

impl ShopCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(content: &str) -> ShopResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load everything into the stores
    pub fn seed(&self, shop: &InMemoryShop) -> ShopResult<()> {
        for item in &self.items {
            shop.items.insert(item.clone())?;
        }
        for combination in &self.tax_combinations {
            shop.taxes.insert(combination.clone())?;
        }
        for account in &self.accounts {
            shop.accounts.insert(account.clone())?;
        }
        for client in &self.clients {
            shop.clients.insert(client.clone())?;
        }
        for method in &self.payment_methods {
            shop.payment_methods.insert(method.clone())?;
        }
        shop.clients
            .set_default_attributes(self.client_defaults.attributes.clone())?;

        info!(
            "Seeded {} items, {} accounts, {} clients, {} tax combinations",
            self.items.len(),
            self.accounts.len(),
            self.clients.len(),
            self.tax_combinations.len()
        );
        Ok(())
    }
}
