//! # One-Click Checkout
//!
//! Turns "this account buys this item" into a finalized bill and a
//! redirect: either to the item's billing portal (subscriptions) or to a
//! hosted payment page created by the configured [`PaymentStrategy`].
//!
//! ```text
//! resolve_client ─► resolve_payment_methods ─► resolve_item ─► resolve_tax_code
//!                                                                    │
//!                     redirect ◄── branch ◄── finalize ◄── create_bill
//! ```
//!
//! Every request creates a new bill. Retrying a request therefore opens a
//! second bill; the gateway call itself is keyed on the bill id.
//!
//! [`PaymentStrategy`]: crate::strategy::PaymentStrategy

use crate::bill::{Bill, BillStatus, STRIPE_SESSION_ATTRIBUTE};
use crate::client::{Account, Address, Client, NewClient};
use crate::error::{ShopError, ShopResult};
use crate::item::{Item, ItemRef};
use crate::l11n::Language;
use crate::payment::{PaymentMethod, PaymentType};
use crate::services::ShopServices;
use crate::strategy::{BoxedPaymentStrategy, CheckoutUrls, PaymentStrategySelector};
use crate::tax::TaxCode;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const SALES_TAX_CODE: &str = "sales_tax_code";
pub const ONE_CLICK_PAY_CC: &str = "one_click_pay_cc";

/// Client data supplied with the request; used only when a client has to be created
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub address: Option<String>,
    pub postal: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub vat_id: Option<String>,
    pub unit: Option<u64>,
}

impl ClientOverrides {
    /// Request values take precedence over the stored address
    pub fn apply(&self, base: Option<&Address>) -> Address {
        let mut address = base.cloned().unwrap_or_default();
        let pick = |value: &Option<String>, target: &mut String| {
            if let Some(v) = value.as_ref().filter(|v| !v.trim().is_empty()) {
                *target = v.trim().to_string();
            }
        };
        pick(&self.address, &mut address.address);
        pick(&self.postal, &mut address.postal);
        pick(&self.city, &mut address.city);
        pick(&self.country, &mut address.country);
        pick(&self.state, &mut address.state);
        address
    }
}

/// A one-click purchase request from an authenticated account
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub account_id: u64,
    pub item: ItemRef,
    /// Allow-list of payment types; `None` allows all
    pub payment_types: Option<Vec<PaymentType>>,
    pub language: Language,
    pub overrides: ClientOverrides,
}

impl CheckoutRequest {
    pub fn new(account_id: u64, item: ItemRef) -> Self {
        Self {
            account_id,
            item,
            payment_types: None,
            language: Language::default(),
            overrides: ClientOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutKind {
    /// Redirect to the item's billing portal
    Subscription,
    /// Redirect to a provider-hosted payment page
    HostedCheckout { session_id: String, provider: String },
}

/// Result of a successful checkout; the caller answers with a 303 to `location`
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub bill_id: Uuid,
    pub bill_number: String,
    pub location: String,
    pub kind: CheckoutKind,
    pub payment_methods: Vec<PaymentMethod>,
}

/// The one-click buy workflow
#[derive(Clone)]
pub struct OneClickBuy {
    services: ShopServices,
    strategies: PaymentStrategySelector,
    urls: CheckoutUrls,
}

impl OneClickBuy {
    pub fn new(services: ShopServices, strategies: PaymentStrategySelector, urls: CheckoutUrls) -> Self {
        Self {
            services,
            strategies,
            urls,
        }
    }

    #[instrument(skip(self, request), fields(account_id = request.account_id, item = %request.item))]
    pub async fn execute(&self, request: &CheckoutRequest) -> ShopResult<CheckoutOutcome> {
        let account = self.resolve_account(request.account_id).await?;
        let client = self.resolve_client(&account, &request.overrides).await?;
        let payment_methods = self
            .resolve_payment_methods(account.id, request.payment_types.as_deref())
            .await?;
        let item = self.resolve_item(&request.item).await?;
        let tax_code = self.resolve_tax_code(&item, &client).await?;

        // Resolve the branch target before anything is persisted
        let target = if item.is_subscription() {
            Target::Portal(Self::subscription_portal(&item)?)
        } else {
            Target::Hosted(self.strategy()?.clone())
        };

        let bill = self
            .create_bill(&client, &account, &item, &tax_code, request.language)
            .await?;

        let (location, kind) = match target {
            Target::Portal(url) => {
                info!("Subscription item {}: redirecting bill {} to portal", item.number, bill.number);
                (url, CheckoutKind::Subscription)
            }
            Target::Hosted(strategy) => {
                let allowed = request.payment_types.clone().unwrap_or_default();
                match self.open_hosted_checkout(bill.clone(), &strategy, &allowed).await {
                    Ok(redirect) => redirect,
                    Err(e) => {
                        self.cancel_bill(bill).await;
                        return Err(e);
                    }
                }
            }
        };

        Ok(CheckoutOutcome {
            bill_id: bill.id,
            bill_number: bill.number,
            location,
            kind,
            payment_methods,
        })
    }

    async fn resolve_account(&self, account_id: u64) -> ShopResult<Account> {
        self.services
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(ShopError::AccountNotFound { account_id })
    }

    /// Client of the account, created from the first stored address and the
    /// request overrides when the account has none yet.
    pub async fn resolve_client(&self, account: &Account, overrides: &ClientOverrides) -> ShopResult<Client> {
        if let Some(client) = self.services.clients.find_by_account(account.id).await? {
            return Ok(client);
        }

        let address = overrides.apply(account.primary_address());
        if let Some(field) = address.missing_fields().first() {
            return Err(ShopError::MissingField {
                field: field.to_string(),
            });
        }

        let new_client = NewClient {
            account_id: account.id,
            number: NewClient::number_for_account(account.id),
            address,
            vat_id: overrides.vat_id.clone().unwrap_or_default(),
            unit: overrides.unit,
        };
        self.services.clients.create(new_client).await
    }

    /// Active payment methods of the account, narrowed by the allow-list
    pub async fn resolve_payment_methods(
        &self,
        account_id: u64,
        allow_list: Option<&[PaymentType]>,
    ) -> ShopResult<Vec<PaymentMethod>> {
        let methods: Vec<PaymentMethod> = self
            .services
            .payment_methods
            .find_for_account(account_id)
            .await?
            .into_iter()
            .filter(|m| m.is_usable(allow_list))
            .collect();

        if methods.is_empty() {
            warn!("Account {} has no usable stored payment method", account_id);
        }
        Ok(methods)
    }

    pub async fn resolve_item(&self, item: &ItemRef) -> ShopResult<Item> {
        self.services
            .items
            .find(item)
            .await?
            .ok_or_else(|| ShopError::ItemNotFound {
                item: item.to_string(),
            })
    }

    /// Tax code from the client's and item's sales tax classification
    pub async fn resolve_tax_code(&self, item: &Item, client: &Client) -> ShopResult<TaxCode> {
        let item_code = item
            .filled_attribute(SALES_TAX_CODE)
            .map(|v| v.as_string())
            .ok_or_else(|| ShopError::missing_attribute(format!("item {}", item.number), SALES_TAX_CODE))?;

        let client_code = client
            .attribute(SALES_TAX_CODE)
            .filter(|v| !v.is_empty())
            .map(|v| v.as_string())
            .ok_or_else(|| ShopError::missing_attribute(format!("client {}", client.number), SALES_TAX_CODE))?;

        self.services
            .taxes
            .find(&client_code, &item_code)
            .await?
            .ok_or(ShopError::TaxCodeNotFound {
                client_code,
                item_code,
            })
    }

    /// Bill header plus one element for the item, persisted as active
    pub async fn create_bill(
        &self,
        client: &Client,
        account: &Account,
        item: &Item,
        tax_code: &TaxCode,
        language: Language,
    ) -> ShopResult<Bill> {
        let billing = &self.services.billing;
        let email = Some(account.email.clone()).filter(|e| !e.is_empty());

        let mut bill = billing
            .create_base_bill(client, email, item.sales_price.currency, language)
            .await?;
        let element = billing.create_base_bill_element(item, tax_code, 1, language);
        bill.add_element(element)?;

        billing.finalize(bill).await
    }

    async fn open_hosted_checkout(
        &self,
        mut bill: Bill,
        strategy: &BoxedPaymentStrategy,
        payment_types: &[PaymentType],
    ) -> ShopResult<(String, CheckoutKind)> {
        let session = strategy
            .create_checkout(
                &bill,
                &self.urls.success_url_with_session(),
                &self.urls.cancel_url(),
                payment_types,
            )
            .await?;

        bill.set_attribute(STRIPE_SESSION_ATTRIBUTE, session.session_id.clone());
        self.services.billing.update(&bill).await?;

        info!(
            "Bill {} sent to {} checkout session {}",
            bill.number, session.provider, session.session_id
        );
        Ok((
            session.checkout_url,
            CheckoutKind::HostedCheckout {
                session_id: session.session_id,
                provider: session.provider,
            },
        ))
    }

    /// A bill whose payment session could not be opened is never payable
    async fn cancel_bill(&self, mut bill: Bill) {
        bill.status = BillStatus::Cancelled;
        match self.services.billing.update(&bill).await {
            Ok(_) => warn!("Bill {} cancelled, no payment session could be opened", bill.number),
            Err(e) => warn!("Failed to cancel bill {}: {}", bill.number, e),
        }
    }

    fn strategy(&self) -> ShopResult<&BoxedPaymentStrategy> {
        self.strategies.default_strategy().ok_or_else(|| {
            ShopError::Configuration("No payment provider configured".to_string())
        })
    }

    fn subscription_portal(item: &Item) -> ShopResult<String> {
        item.filled_attribute(ONE_CLICK_PAY_CC)
            .map(|v| v.as_string())
            .ok_or_else(|| ShopError::missing_attribute(format!("item {}", item.number), ONE_CLICK_PAY_CC))
    }
}

enum Target {
    Portal(String),
    Hosted(BoxedPaymentStrategy),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::{CheckoutSession, WebhookEvent};
    use crate::item::{Currency, L11nKind, Price};
    use crate::media::LocalMediaStore;
    use crate::memory::InMemoryShop;
    use crate::payment::PaymentStatus;
    use crate::services::ClientDirectory;
    use crate::strategy::PaymentStrategy;
    use crate::tax::TaxCombination;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingStrategy {
        calls: Mutex<Vec<(Uuid, Vec<PaymentType>)>>,
        decline: bool,
    }

    #[async_trait]
    impl PaymentStrategy for RecordingStrategy {
        async fn create_checkout(
            &self,
            bill: &Bill,
            _success_url: &str,
            _cancel_url: &str,
            payment_types: &[PaymentType],
        ) -> ShopResult<CheckoutSession> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((bill.id, payment_types.to_vec()));
            if self.decline {
                return Err(ShopError::ProviderError {
                    provider: "stripe".into(),
                    message: "gateway unavailable".into(),
                });
            }
            let id = format!("cs_test_{}", calls.len());
            Ok(CheckoutSession::new(
                id.clone(),
                bill.id.to_string(),
                "stripe",
                format!("https://checkout.example.com/{}", id),
            ))
        }

        async fn verify_webhook(&self, _payload: &[u8], _signature: &str) -> ShopResult<WebhookEvent> {
            Err(ShopError::WebhookVerificationFailed("not used".into()))
        }

        fn provider_name(&self) -> &'static str {
            "stripe"
        }
    }

    fn full_address() -> Address {
        Address {
            address: "Hauptstr. 1".into(),
            postal: "10115".into(),
            city: "Berlin".into(),
            country: "DE".into(),
            state: String::new(),
        }
    }

    fn shop() -> InMemoryShop {
        let shop = InMemoryShop::new();
        shop.accounts
            .insert(Account::new(1, "Jane", "jane@example.com").with_address(full_address()))
            .unwrap();
        shop.accounts
            .insert(Account::new(2, "Nobody", "nobody@example.com"))
            .unwrap();
        shop.clients
            .set_default_attributes(vec![crate::item::Attribute {
                name: SALES_TAX_CODE.into(),
                value: "DOMESTIC".into(),
            }])
            .unwrap();
        shop.items
            .insert(
                Item::new(10, "APP-10", Price::from_cents(1000, Currency::EUR))
                    .with_l11n(L11nKind::Name1, Language::En, "App")
                    .with_attribute(SALES_TAX_CODE, "SOFTWARE"),
            )
            .unwrap();
        shop.items
            .insert(
                Item::new(20, "SUB-20", Price::from_cents(500, Currency::EUR))
                    .with_attribute(SALES_TAX_CODE, "SOFTWARE")
                    .with_attribute("subscription", 1_i64)
                    .with_attribute(ONE_CLICK_PAY_CC, "https://billing.example.com/portal"),
            )
            .unwrap();
        shop.items
            .insert(Item::new(30, "RAW-30", Price::from_cents(500, Currency::EUR)))
            .unwrap();
        shop.taxes
            .insert(TaxCombination {
                client_code: "DOMESTIC".into(),
                item_code: "SOFTWARE".into(),
                tax_code: TaxCode::new("VAT19", 1900),
            })
            .unwrap();
        shop.payment_methods
            .insert(PaymentMethod {
                id: 1,
                account_id: 1,
                kind: PaymentType::Card,
                status: PaymentStatus::Active,
            })
            .unwrap();
        shop.payment_methods
            .insert(PaymentMethod {
                id: 2,
                account_id: 1,
                kind: PaymentType::Paypal,
                status: PaymentStatus::Inactive,
            })
            .unwrap();
        shop
    }

    fn workflow(shop: &InMemoryShop, strategy: Option<Arc<RecordingStrategy>>) -> OneClickBuy {
        let services = shop.services(Arc::new(LocalMediaStore::new("media")));
        let mut strategies = PaymentStrategySelector::default();
        if let Some(strategy) = strategy {
            strategies.register(strategy);
        }
        OneClickBuy::new(services, strategies, CheckoutUrls::new("https://shop.example.com"))
    }

    #[tokio::test]
    async fn test_hosted_checkout() {
        let shop = shop();
        let strategy = Arc::new(RecordingStrategy::default());
        let buy = workflow(&shop, Some(strategy.clone()));

        let outcome = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(10))).await.unwrap();

        assert_eq!(outcome.location, "https://checkout.example.com/cs_test_1");
        assert_eq!(
            outcome.kind,
            CheckoutKind::HostedCheckout {
                session_id: "cs_test_1".into(),
                provider: "stripe".into()
            }
        );
        assert_eq!(outcome.payment_methods.len(), 1);

        let bills = shop.billing.all().unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].status, BillStatus::Active);
        assert_eq!(bills[0].gross_total().amount, 1190);
        assert_eq!(bills[0].email.as_deref(), Some("jane@example.com"));
        assert_eq!(bills[0].attribute(STRIPE_SESSION_ATTRIBUTE), Some("cs_test_1"));
        assert_eq!(shop.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_requests_create_new_bills() {
        let shop = shop();
        let strategy = Arc::new(RecordingStrategy::default());
        let buy = workflow(&shop, Some(strategy.clone()));
        let request = CheckoutRequest::new(1, ItemRef::Number("APP-10".into()));

        let first = buy.execute(&request).await.unwrap();
        let second = buy.execute(&request).await.unwrap();

        assert_ne!(first.bill_id, second.bill_id);
        assert_ne!(first.bill_number, second.bill_number);
        assert_eq!(shop.billing.all().unwrap().len(), 2);
        assert_eq!(shop.clients.len(), 1);
        assert_eq!(strategy.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_gateway_failure_cancels_bill() {
        let shop = shop();
        let strategy = Arc::new(RecordingStrategy {
            decline: true,
            ..Default::default()
        });
        let buy = workflow(&shop, Some(strategy.clone()));

        let err = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(10))).await.unwrap_err();
        assert!(matches!(err, ShopError::ProviderError { .. }));

        let bills = shop.billing.all().unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].status, BillStatus::Cancelled);
        assert_eq!(bills[0].attribute(STRIPE_SESSION_ATTRIBUTE), None);
    }

    #[tokio::test]
    async fn test_concurrent_first_purchases_share_client() {
        let shop = shop();
        let buy = workflow(&shop, Some(Arc::new(RecordingStrategy::default())));
        let request = CheckoutRequest::new(1, ItemRef::Id(10));

        let (first, second) = tokio::join!(buy.execute(&request), buy.execute(&request));

        first.unwrap();
        second.unwrap();
        assert_eq!(shop.clients.len(), 1);
        assert_eq!(shop.billing.all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_redirects_to_portal() {
        let shop = shop();
        let strategy = Arc::new(RecordingStrategy::default());
        let buy = workflow(&shop, Some(strategy.clone()));

        let outcome = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(20))).await.unwrap();

        assert_eq!(outcome.kind, CheckoutKind::Subscription);
        assert_eq!(outcome.location, "https://billing.example.com/portal");
        assert!(strategy.calls.lock().unwrap().is_empty());
        assert_eq!(shop.billing.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_address_rejected() {
        let shop = shop();
        let buy = workflow(&shop, Some(Arc::new(RecordingStrategy::default())));

        let err = buy.execute(&CheckoutRequest::new(2, ItemRef::Id(10))).await.unwrap_err();
        assert!(matches!(err, ShopError::MissingField { ref field } if field == "address"));
        assert!(shop.clients.is_empty());
        assert!(shop.billing.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overrides_complete_address() {
        let shop = shop();
        let buy = workflow(&shop, Some(Arc::new(RecordingStrategy::default())));

        let mut request = CheckoutRequest::new(2, ItemRef::Id(10));
        request.overrides = ClientOverrides {
            address: Some("Ring 5".into()),
            postal: Some("80331".into()),
            city: Some("München".into()),
            country: Some("DE".into()),
            vat_id: Some("DE123".into()),
            ..Default::default()
        };

        buy.execute(&request).await.unwrap();

        let client = shop.clients.find_by_account(2).await.unwrap().unwrap();
        assert_eq!(client.number, "100002");
        assert_eq!(client.main_address.city, "München");
        assert_eq!(client.vat_id, "DE123");
    }

    #[tokio::test]
    async fn test_missing_tax_attribute() {
        let shop = shop();
        let buy = workflow(&shop, Some(Arc::new(RecordingStrategy::default())));

        let err = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(30))).await.unwrap_err();
        assert!(matches!(err, ShopError::MissingAttribute { ref attribute, .. } if attribute == SALES_TAX_CODE));
        assert!(shop.billing.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_payment_provider() {
        let shop = shop();
        let buy = workflow(&shop, None);

        let err = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(10))).await.unwrap_err();
        assert!(matches!(err, ShopError::Configuration(_)));
        assert_eq!(err.status_code(), 500);
        assert!(shop.billing.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_and_account() {
        let shop = shop();
        let buy = workflow(&shop, Some(Arc::new(RecordingStrategy::default())));

        let err = buy.execute(&CheckoutRequest::new(1, ItemRef::Id(99))).await.unwrap_err();
        assert!(matches!(err, ShopError::ItemNotFound { .. }));

        let err = buy.execute(&CheckoutRequest::new(42, ItemRef::Id(10))).await.unwrap_err();
        assert!(matches!(err, ShopError::AccountNotFound { account_id: 42 }));
    }

    #[tokio::test]
    async fn test_allow_list_filters_methods_and_reaches_provider() {
        let shop = shop();
        let strategy = Arc::new(RecordingStrategy::default());
        let buy = workflow(&shop, Some(strategy.clone()));

        let mut request = CheckoutRequest::new(1, ItemRef::Id(10));
        request.payment_types = Some(vec![PaymentType::Paypal]);

        let outcome = buy.execute(&request).await.unwrap();

        assert!(outcome.payment_methods.is_empty());
        assert_eq!(strategy.calls.lock().unwrap()[0].1, vec![PaymentType::Paypal]);
    }
}
