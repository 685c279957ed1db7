//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API for bills.
//! Every bill element becomes one line item priced at its unit gross.

use crate::config::StripeConfig;
use crate::webhook::verify_signature;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    Bill, CheckoutSession, CheckoutStatus, Currency, PaymentStrategy, PaymentType, ShopError,
    ShopResult, WebhookEvent, WebhookEventType,
};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session strategy
///
/// Uses Stripe's hosted checkout page for secure payments.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutStrategy {
    /// Create a new Stripe checkout strategy
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Idempotency key for the session request of a bill
    pub fn idempotency_key(bill: &Bill) -> String {
        format!("bill-{}", bill.id)
    }

    /// Form parameters for `POST /v1/checkout/sessions`
    fn build_form(
        bill: &Bill,
        success_url: &str,
        cancel_url: &str,
        payment_types: &[PaymentType],
    ) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("client_reference_id".to_string(), bill.id.to_string()),
        ];

        if let Some(ref email) = bill.email {
            form.push(("customer_email".to_string(), email.clone()));
        }

        for (i, element) in bill.elements.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form.push((
                format!("{}[price_data][currency]", prefix),
                bill.currency.as_str().to_string(),
            ));
            form.push((
                format!("{}[price_data][unit_amount]", prefix),
                element.unit_gross.amount.to_string(),
            ));
            form.push((
                format!("{}[price_data][product_data][name]", prefix),
                element.item_name.clone(),
            ));
            form.push((
                format!("{}[price_data][product_data][metadata][item_number]", prefix),
                element.item_number.clone(),
            ));
            form.push((format!("{}[quantity]", prefix), element.quantity.to_string()));
        }

        form.push(("metadata[bill_id]".to_string(), bill.id.to_string()));
        form.push(("metadata[bill_number]".to_string(), bill.number.clone()));

        for (i, method) in payment_types
            .iter()
            .filter_map(PaymentType::checkout_method)
            .enumerate()
        {
            form.push((format!("payment_method_types[{}]", i), method.to_string()));
        }

        form
    }
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, bill, payment_types), fields(bill = %bill.number))]
    async fn create_checkout(
        &self,
        bill: &Bill,
        success_url: &str,
        cancel_url: &str,
        payment_types: &[PaymentType],
    ) -> ShopResult<CheckoutSession> {
        if bill.is_empty() {
            return Err(ShopError::InvalidRequest(format!(
                "Bill {} has no elements",
                bill.number
            )));
        }

        let form = Self::build_form(bill, success_url, cancel_url, payment_types);
        debug!(
            "Creating Stripe checkout session: {} elements, {} form fields",
            bill.elements.len(),
            form.len()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", Self::idempotency_key(bill))
            .form(&form)
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!(
            "Created Stripe checkout session: id={}, bill={}",
            session.id, bill.number
        );

        Ok(CheckoutSession {
            session_id: session.id,
            bill_id: bill.id.to_string(),
            provider: PROVIDER.to_string(),
            checkout_url: session.url,
            status: session.status,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            payment_intent_id: session.payment_intent,
            customer_id: session.customer,
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            signature,
            payload,
            Utc::now().timestamp(),
        )?;

        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        let event_type = match event.event_type.as_str() {
            "checkout.session.completed" => WebhookEventType::CheckoutCompleted,
            "checkout.session.async_payment_succeeded" => WebhookEventType::AsyncPaymentSucceeded,
            "checkout.session.async_payment_failed" => WebhookEventType::AsyncPaymentFailed,
            "checkout.session.expired" => WebhookEventType::CheckoutExpired,
            "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
            "charge.refunded" => WebhookEventType::RefundIssued,
            other => WebhookEventType::Unknown(other.to_string()),
        };

        let object = event.data.object;
        let text = |key: &str| object.get(key).and_then(|v| v.as_str()).map(String::from);

        Ok(WebhookEvent {
            event_id: event.id,
            event_type,
            provider: PROVIDER.to_string(),
            session_id: text("id"),
            payment_intent_id: text("payment_intent"),
            customer_email: object
                .get("customer_details")
                .and_then(|cd| cd.get("email"))
                .and_then(|v| v.as_str())
                .map(String::from),
            amount_paid: object.get("amount_total").and_then(|v| v.as_i64()),
            currency: text("currency").and_then(|c| Currency::from_code(&c)),
            raw_data: Some(serde_json::Value::Object(object.clone())),
            timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    url: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    status: CheckoutStatus,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}
