//! # shop-stripe
//!
//! Stripe hosted checkout for the one-click shop.
//!
//! **StripeCheckoutStrategy** creates Checkout Sessions for finalized bills:
//! one line item per bill element at its unit gross, the bill id as client
//! reference and metadata, and an idempotency key derived from the bill.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeCheckoutStrategy;
//! use shop_core::PaymentStrategy;
//!
//! let strategy = StripeCheckoutStrategy::from_env()?;
//!
//! let session = strategy.create_checkout(
//!     &bill,
//!     "https://shop.example.com/shop/checkout/success?session_id={CHECKOUT_SESSION_ID}",
//!     "https://shop.example.com/shop/checkout/cancel",
//!     &[],
//! ).await?;
//!
//! // Redirect user to session.checkout_url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use shop_stripe::{BillArchivingHandler, dispatch_webhook_event};
//!
//! let handler = BillArchivingHandler::new(services.billing.clone());
//!
//! // In your webhook endpoint:
//! let event = strategy.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&handler, event).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutStrategy;
pub use config::StripeConfig;
pub use webhook::{
    dispatch_webhook_event, signature_header, BillArchivingHandler, CheckoutCompletedData,
    LoggingWebhookHandler, WebhookHandler, REQUIRED_WEBHOOK_EVENTS,
};
