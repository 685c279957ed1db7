//! # In-Memory Stores
//!
//! `RwLock`-guarded implementations of every collaborator port. The server
//! seeds them from the catalog file; tests build them directly.

use crate::bill::{Bill, BillStatus};
use crate::client::{Account, Client, NewClient};
use crate::error::{ShopError, ShopResult};
use crate::item::{Attribute, Currency, Item, ItemRef};
use crate::l11n::Language;
use crate::payment::PaymentMethod;
use crate::services::{
    AccountDirectory, BillingService, ClientDirectory, ItemCatalog, MediaService,
    PaymentMethodDirectory, ShopServices, TaxService,
};
use crate::tax::{TaxCode, TaxCombination};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

fn read<T>(lock: &RwLock<T>) -> ShopResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| ShopError::Storage(format!("Failed to acquire read lock: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> ShopResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| ShopError::Storage(format!("Failed to acquire write lock: {}", e)))
}

#[derive(Clone, Default)]
pub struct InMemoryAccounts {
    accounts: Arc<RwLock<HashMap<u64, Account>>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) -> ShopResult<()> {
        write(&self.accounts)?.insert(account.id, account);
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccounts {
    async fn find_account(&self, account_id: u64) -> ShopResult<Option<Account>> {
        Ok(read(&self.accounts)?.get(&account_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryClients {
    clients: Arc<RwLock<HashMap<u64, Client>>>,
    next_id: Arc<AtomicU64>,
    /// Attributes every newly created client starts with
    defaults: Arc<RwLock<Vec<Attribute>>>,
}

impl InMemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, client: Client) -> ShopResult<()> {
        self.next_id.fetch_max(client.id, Ordering::SeqCst);
        write(&self.clients)?.insert(client.id, client);
        Ok(())
    }

    pub fn set_default_attributes(&self, attributes: Vec<Attribute>) -> ShopResult<()> {
        *write(&self.defaults)? = attributes;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClients {
    async fn find_by_account(&self, account_id: u64) -> ShopResult<Option<Client>> {
        Ok(read(&self.clients)?
            .values()
            .find(|c| c.account_id == account_id)
            .cloned())
    }

    async fn create(&self, new_client: NewClient) -> ShopResult<Client> {
        let mut clients = write(&self.clients)?;
        if let Some(existing) = clients.values().find(|c| c.account_id == new_client.account_id) {
            debug!(
                "Account {} already has client {}, reusing it",
                existing.account_id, existing.number
            );
            return Ok(existing.clone());
        }

        let client = Client {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            number: new_client.number,
            account_id: new_client.account_id,
            main_address: new_client.address,
            vat_id: new_client.vat_id,
            unit: new_client.unit,
            attributes: read(&self.defaults)?.clone(),
        };
        clients.insert(client.id, client.clone());

        info!("Created client {} for account {}", client.number, client.account_id);
        Ok(client)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryItems {
    items: Arc<RwLock<Vec<Item>>>,
}

impl InMemoryItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: Item) -> ShopResult<()> {
        let mut items = write(&self.items)?;
        items.retain(|i| i.id != item.id);
        items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ItemCatalog for InMemoryItems {
    async fn find(&self, item: &ItemRef) -> ShopResult<Option<Item>> {
        Ok(read(&self.items)?.iter().find(|i| item.matches(i)).cloned())
    }

    async fn list(&self) -> ShopResult<Vec<Item>> {
        let mut items = read(&self.items)?.clone();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPaymentMethods {
    methods: Arc<RwLock<Vec<PaymentMethod>>>,
}

impl InMemoryPaymentMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, method: PaymentMethod) -> ShopResult<()> {
        write(&self.methods)?.push(method);
        Ok(())
    }
}

#[async_trait]
impl PaymentMethodDirectory for InMemoryPaymentMethods {
    async fn find_for_account(&self, account_id: u64) -> ShopResult<Vec<PaymentMethod>> {
        Ok(read(&self.methods)?
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaxes {
    combinations: Arc<RwLock<Vec<TaxCombination>>>,
}

impl InMemoryTaxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, combination: TaxCombination) -> ShopResult<()> {
        write(&self.combinations)?.push(combination);
        Ok(())
    }
}

#[async_trait]
impl TaxService for InMemoryTaxes {
    async fn find(&self, client_code: &str, item_code: &str) -> ShopResult<Option<TaxCode>> {
        Ok(read(&self.combinations)?
            .iter()
            .find(|c| c.applies_to(client_code, item_code))
            .map(|c| c.tax_code.clone()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBilling {
    bills: Arc<RwLock<HashMap<Uuid, Bill>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryBilling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a bill as-is (seeding and tests)
    pub fn insert(&self, bill: Bill) -> ShopResult<()> {
        write(&self.bills)?.insert(bill.id, bill);
        Ok(())
    }

    pub fn all(&self) -> ShopResult<Vec<Bill>> {
        let mut bills: Vec<Bill> = read(&self.bills)?.values().cloned().collect();
        bills.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(bills)
    }

    fn next_number(&self) -> String {
        format!("B{:06}", self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl BillingService for InMemoryBilling {
    async fn create_base_bill(
        &self,
        client: &Client,
        email: Option<String>,
        currency: Currency,
        language: Language,
    ) -> ShopResult<Bill> {
        let mut bill = Bill::new(client.id, client.account_id, currency, language);
        bill.number = self.next_number();
        bill.email = email;
        Ok(bill)
    }

    async fn finalize(&self, mut bill: Bill) -> ShopResult<Bill> {
        if bill.is_empty() {
            return Err(ShopError::EmptyBill {
                bill: bill.number.clone(),
            });
        }
        bill.status = BillStatus::Active;
        write(&self.bills)?.insert(bill.id, bill.clone());

        info!(
            "Finalized bill {} ({} elements, gross {})",
            bill.number,
            bill.elements.len(),
            bill.gross_total().display()
        );
        Ok(bill)
    }

    async fn update(&self, bill: &Bill) -> ShopResult<Bill> {
        let mut bills = write(&self.bills)?;
        if !bills.contains_key(&bill.id) {
            return Err(ShopError::BillNotFound {
                bill: bill.id.to_string(),
            });
        }
        bills.insert(bill.id, bill.clone());
        Ok(bill.clone())
    }

    async fn find(&self, bill_id: Uuid) -> ShopResult<Option<Bill>> {
        Ok(read(&self.bills)?.get(&bill_id).cloned())
    }

    async fn find_by_attribute(&self, key: &str, value: &str) -> ShopResult<Option<Bill>> {
        Ok(read(&self.bills)?
            .values()
            .find(|b| b.attribute(key) == Some(value))
            .cloned())
    }

    async fn archived_with_item(&self, account_id: u64, item_id: u64) -> ShopResult<Vec<Bill>> {
        Ok(read(&self.bills)?
            .values()
            .filter(|b| {
                b.account_id == account_id
                    && b.status == BillStatus::Archived
                    && b.references_item(item_id)
            })
            .cloned()
            .collect())
    }
}

/// All in-memory stores, kept as concrete handles for seeding and inspection
#[derive(Clone, Default)]
pub struct InMemoryShop {
    pub accounts: InMemoryAccounts,
    pub clients: InMemoryClients,
    pub items: InMemoryItems,
    pub payment_methods: InMemoryPaymentMethods,
    pub taxes: InMemoryTaxes,
    pub billing: InMemoryBilling,
}

impl InMemoryShop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the stores into the service bundle the workflows take
    pub fn services(&self, media: Arc<dyn MediaService>) -> ShopServices {
        ShopServices {
            accounts: Arc::new(self.accounts.clone()),
            clients: Arc::new(self.clients.clone()),
            items: Arc::new(self.items.clone()),
            payment_methods: Arc::new(self.payment_methods.clone()),
            taxes: Arc::new(self.taxes.clone()),
            billing: Arc::new(self.billing.clone()),
            media,
        }
    }
}
