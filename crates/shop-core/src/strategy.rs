//! # Payment Strategy Trait
//!
//! Strategy trait for hosted-checkout payment providers. The checkout
//! workflow only ever talks to this trait; Stripe is one implementation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_checkout()                                      │
//! │  ├── verify_webhook()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │StripeCheckout     │
//!                  │   Strategy        │
//!                  └───────────────────┘
//! ```

use crate::bill::{Bill, CheckoutSession, WebhookEvent};
use crate::error::ShopResult;
use crate::payment::PaymentType;
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Create a hosted checkout session for a finalized bill.
    ///
    /// # Arguments
    /// * `bill` - The bill to collect payment for (must have elements)
    /// * `success_url` - URL to redirect after successful payment
    /// * `cancel_url` - URL to redirect if customer cancels
    /// * `payment_types` - Allowed payment types; empty means provider default
    async fn create_checkout(
        &self,
        bill: &Bill,
        success_url: &str,
        cancel_url: &str,
        payment_types: &[PaymentType],
    ) -> ShopResult<CheckoutSession>;

    /// Verify a webhook signature and parse the event.
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Strategy selector for multiple providers
#[derive(Clone)]
pub struct PaymentStrategySelector {
    strategies: std::collections::HashMap<String, BoxedPaymentStrategy>,
    default_provider: String,
}

impl PaymentStrategySelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            strategies: std::collections::HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a payment strategy
    pub fn register(&mut self, strategy: BoxedPaymentStrategy) {
        let name = strategy.provider_name().to_string();
        self.strategies.insert(name, strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedPaymentStrategy) -> Self {
        self.register(strategy);
        self
    }

    /// Get the default strategy
    pub fn default_strategy(&self) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(&self.default_provider)
    }

    /// Get a strategy by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(provider)
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for PaymentStrategySelector {
    fn default() -> Self {
        Self::new("stripe")
    }
}

/// URLs the payment provider sends the customer back to
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the shop (e.g., "https://shop.example.com")
    pub base_url: String,
    pub success_path: String,
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            success_path: "/shop/checkout/success".to_string(),
            cancel_path: "/shop/checkout/cancel".to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}{}", self.base_url, self.success_path)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }

    /// Success URL with the provider's session id placeholder
    pub fn success_url_with_session(&self) -> String {
        let url = self.success_url();
        if url.contains('?') {
            format!("{}&session_id={{CHECKOUT_SESSION_ID}}", url)
        } else {
            format!("{}?session_id={{CHECKOUT_SESSION_ID}}", url)
        }
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
