//! # Collaborator Ports
//!
//! Interfaces to the systems the shop sequences calls into: accounts,
//! client management, the item catalog, billing, stored payment methods,
//! tax lookup and media export. Implementations are injected through
//! [`ShopServices`].

use crate::bill::{Bill, BillElement};
use crate::client::{Account, Client, NewClient};
use crate::error::ShopResult;
use crate::item::{Currency, Item, ItemRef, MediaFile};
use crate::l11n::Language;
use crate::media::MediaExport;
use crate::payment::PaymentMethod;
use crate::tax::TaxCode;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_account(&self, account_id: u64) -> ShopResult<Option<Account>>;
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_by_account(&self, account_id: u64) -> ShopResult<Option<Client>>;

    /// Create the account's client; an account that already has one gets it back
    async fn create(&self, client: NewClient) -> ShopResult<Client>;
}

#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn find(&self, item: &ItemRef) -> ShopResult<Option<Item>>;

    async fn list(&self) -> ShopResult<Vec<Item>>;
}

#[async_trait]
pub trait PaymentMethodDirectory: Send + Sync {
    async fn find_for_account(&self, account_id: u64) -> ShopResult<Vec<PaymentMethod>>;
}

#[async_trait]
pub trait TaxService: Send + Sync {
    /// Tax code for a client and item classification pair
    async fn find(&self, client_code: &str, item_code: &str) -> ShopResult<Option<TaxCode>>;
}

/// Billing: bill construction and persistence
#[async_trait]
pub trait BillingService: Send + Sync {
    /// New draft bill for a client, numbered and addressed
    async fn create_base_bill(
        &self,
        client: &Client,
        email: Option<String>,
        currency: Currency,
        language: Language,
    ) -> ShopResult<Bill>;

    /// Line element for an item under a tax code
    fn create_base_bill_element(
        &self,
        item: &Item,
        tax_code: &TaxCode,
        quantity: u32,
        language: Language,
    ) -> BillElement {
        BillElement::from_item(item, tax_code, quantity, language)
    }

    /// Persist a bill as active. Bills without elements are rejected.
    async fn finalize(&self, bill: Bill) -> ShopResult<Bill>;

    /// Persist changes to an already finalized bill
    async fn update(&self, bill: &Bill) -> ShopResult<Bill>;

    async fn find(&self, bill_id: Uuid) -> ShopResult<Option<Bill>>;

    async fn find_by_attribute(&self, key: &str, value: &str) -> ShopResult<Option<Bill>>;

    /// Archived bills of an account's client that reference the item
    async fn archived_with_item(&self, account_id: u64, item_id: u64) -> ShopResult<Vec<Bill>>;
}

#[async_trait]
pub trait MediaService: Send + Sync {
    async fn export(&self, file: &MediaFile) -> ShopResult<MediaExport>;
}

/// The collaborators one request needs, injected into workflows
#[derive(Clone)]
pub struct ShopServices {
    pub accounts: Arc<dyn AccountDirectory>,
    pub clients: Arc<dyn ClientDirectory>,
    pub items: Arc<dyn ItemCatalog>,
    pub payment_methods: Arc<dyn PaymentMethodDirectory>,
    pub taxes: Arc<dyn TaxService>,
    pub billing: Arc<dyn BillingService>,
    pub media: Arc<dyn MediaService>,
}
