//! # shop-core
//!
//! Core types, collaborator traits and workflows for the one-click shop.
//!
//! This crate provides:
//! - `OneClickBuy` for the one-click checkout workflow
//! - `build_schema` for schema.org `Product` documents
//! - `authorize_download` for purchase-gated item files
//! - `PaymentStrategy` trait for hosted checkout providers
//! - Collaborator ports (`ClientDirectory`, `BillingService`, ...) and
//!   in-memory implementations seeded from `ShopCatalog`
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CheckoutRequest, ItemRef, OneClickBuy};
//!
//! let buy = OneClickBuy::new(services, strategies, CheckoutUrls::new("https://shop.example.com"));
//! let outcome = buy.execute(&CheckoutRequest::new(account_id, ItemRef::Number("APP-1".into()))).await?;
//!
//! // Answer with 303 See Other to outcome.location
//! ```

pub mod bill;
pub mod catalog;
pub mod checkout;
pub mod client;
pub mod download;
pub mod error;
pub mod item;
pub mod l11n;
pub mod media;
pub mod memory;
pub mod payment;
pub mod permission;
pub mod schema;
pub mod services;
pub mod strategy;
pub mod tax;

// Re-exports for convenience
pub use bill::{
    Bill, BillElement, BillStatus, CheckoutSession, CheckoutStatus, WebhookEvent,
    WebhookEventType, STRIPE_SESSION_ATTRIBUTE,
};
pub use catalog::ShopCatalog;
pub use checkout::{CheckoutKind, CheckoutOutcome, CheckoutRequest, ClientOverrides, OneClickBuy};
pub use client::{Account, Address, Client, NewClient};
pub use download::{authorize_download, download};
pub use error::{ShopError, ShopResult};
pub use item::{AttributeValue, Currency, Item, ItemRef, L11nKind, MediaFile, Price};
pub use l11n::Language;
pub use media::{LocalMediaStore, MediaExport};
pub use memory::InMemoryShop;
pub use payment::{PaymentMethod, PaymentStatus, PaymentType};
pub use permission::{Permission, PermissionCategory, PermissionType, SHOP_MODULE};
pub use schema::build_schema;
pub use services::ShopServices;
pub use strategy::{
    BoxedPaymentStrategy, CheckoutUrls, PaymentStrategy, PaymentStrategySelector,
};
pub use tax::{TaxCode, TaxCombination};
