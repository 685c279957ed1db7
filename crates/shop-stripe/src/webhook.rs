//! # Stripe Webhook Handling
//!
//! Signature verification helpers, typed event data and handler dispatch.
//! A paid checkout session archives its bill, which is what unlocks
//! purchase downloads. Delayed methods such as SEPA debit complete the
//! session unpaid and settle later through `async_payment_succeeded`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shop_core::services::BillingService;
use shop_core::{
    Bill, BillStatus, Currency, ShopError, ShopResult, WebhookEvent, WebhookEventType,
    STRIPE_SESSION_ATTRIBUTE,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum age of a signed webhook, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

// =============================================================================
// Signature Verification
// =============================================================================

pub(crate) struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub(crate) fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `Stripe-Signature` header value for a payload, as Stripe would send it
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Check a `Stripe-Signature` header against the payload at time `now`
pub fn verify_signature(secret: &str, header: &str, payload: &[u8], now: i64) -> ShopResult<()> {
    let parts = parse_signature_header(header)?;

    if (now - parts.timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ShopError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(secret, parts.timestamp, payload)?;
    if parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        Ok(())
    } else {
        Err(ShopError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ))
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// =============================================================================
// Event Data
// =============================================================================

/// Parsed checkout.session.completed event data
#[derive(Debug, Clone)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
    pub amount_total: i64,
    pub currency: Option<Currency>,
    pub payment_status: String,
    pub metadata: HashMap<String, String>,
}

impl CheckoutCompletedData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> ShopResult<Self> {
        let obj = event
            .raw_data
            .as_ref()
            .and_then(|raw| raw.as_object())
            .ok_or_else(|| ShopError::WebhookParseError("Missing event object".to_string()))?;

        let text = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);

        let session_id = text("id")
            .ok_or_else(|| ShopError::WebhookParseError("Missing session id".to_string()))?;

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            session_id,
            payment_intent_id: text("payment_intent"),
            customer_id: text("customer"),
            customer_email: obj
                .get("customer_details")
                .and_then(|cd| cd.get("email"))
                .and_then(|v| v.as_str())
                .map(String::from),
            client_reference_id: text("client_reference_id"),
            amount_total: obj.get("amount_total").and_then(|v| v.as_i64()).unwrap_or(0),
            currency: text("currency").and_then(|c| Currency::from_code(&c)),
            payment_status: text("payment_status").unwrap_or_else(|| "unknown".to_string()),
            metadata,
        })
    }

    /// Check if payment was successful
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Bill id from metadata, falling back to the client reference
    pub fn bill_id(&self) -> Option<&str> {
        self.metadata
            .get("bill_id")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Webhook event handler trait
///
/// Implement this trait to handle different webhook events.
#[allow(unused_variables)]
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        info!(
            "Checkout completed: session={}, amount={}",
            data.session_id, data.amount_total
        );
        Ok(())
    }

    /// Called when a delayed payment method settles
    async fn on_async_payment_succeeded(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        info!("Delayed payment succeeded: session={}", data.session_id);
        Ok(())
    }

    /// Called when a delayed payment method fails to settle
    async fn on_async_payment_failed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        warn!("Delayed payment failed: session={}", data.session_id);
        Ok(())
    }

    /// Called when a checkout session expires unpaid
    async fn on_checkout_expired(&self, event: &WebhookEvent) -> ShopResult<()> {
        info!("Checkout expired: {:?}", event.session_id);
        Ok(())
    }

    /// Called when a payment fails
    async fn on_payment_failed(&self, event: &WebhookEvent) -> ShopResult<()> {
        warn!("Payment failed: {:?}", event.payment_intent_id);
        Ok(())
    }

    /// Called when a refund is issued
    async fn on_refund_issued(&self, event: &WebhookEvent) -> ShopResult<()> {
        info!("Refund issued: {:?}", event.payment_intent_id);
        Ok(())
    }

    /// Called for unknown/unhandled events
    async fn on_unknown_event(&self, event: &WebhookEvent) -> ShopResult<()> {
        debug!("Unhandled webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Default no-op webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Archives the bill behind a paid checkout session, cancels it when a
/// delayed payment fails
pub struct BillArchivingHandler {
    billing: Arc<dyn BillingService>,
}

impl BillArchivingHandler {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }

    async fn session_bill(&self, data: &CheckoutCompletedData) -> ShopResult<Bill> {
        self.billing
            .find_by_attribute(STRIPE_SESSION_ATTRIBUTE, &data.session_id)
            .await?
            .ok_or_else(|| ShopError::BillNotFound {
                bill: data.bill_id().unwrap_or(&data.session_id).to_string(),
            })
    }

    async fn archive(&self, data: &CheckoutCompletedData) -> ShopResult<()> {
        let mut bill = self.session_bill(data).await?;

        if bill.status == BillStatus::Archived {
            debug!("Bill {} already archived", bill.number);
            return Ok(());
        }

        bill.status = BillStatus::Archived;
        self.billing.update(&bill).await?;

        info!(
            "Bill {} archived after payment of session {}",
            bill.number, data.session_id
        );
        Ok(())
    }
}

#[async_trait]
impl WebhookHandler for BillArchivingHandler {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        // delayed methods report `unpaid` here and settle via async_payment_succeeded
        if !data.is_paid() {
            info!(
                "Checkout {} completed with payment status {}, bill left open",
                data.session_id, data.payment_status
            );
            return Ok(());
        }
        self.archive(&data).await
    }

    async fn on_async_payment_succeeded(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        self.archive(&data).await
    }

    async fn on_async_payment_failed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        let mut bill = self.session_bill(&data).await?;
        if bill.status != BillStatus::Active {
            return Ok(());
        }

        bill.status = BillStatus::Cancelled;
        self.billing.update(&bill).await?;

        warn!(
            "Bill {} cancelled, delayed payment of session {} failed",
            bill.number, data.session_id
        );
        Ok(())
    }
}

/// Dispatch a webhook event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: WebhookEvent,
) -> ShopResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutCompleted => {
            let data = CheckoutCompletedData::from_event(&event)?;
            handler.on_checkout_completed(data).await
        }
        WebhookEventType::AsyncPaymentSucceeded => {
            let data = CheckoutCompletedData::from_event(&event)?;
            handler.on_async_payment_succeeded(data).await
        }
        WebhookEventType::AsyncPaymentFailed => {
            let data = CheckoutCompletedData::from_event(&event)?;
            handler.on_async_payment_failed(data).await
        }
        WebhookEventType::CheckoutExpired => handler.on_checkout_expired(&event).await,
        WebhookEventType::PaymentFailed => handler.on_payment_failed(&event).await,
        WebhookEventType::RefundIssued => handler.on_refund_issued(&event).await,
        WebhookEventType::Unknown(_) => handler.on_unknown_event(&event).await,
    }
}

/// Events that should be enabled in Stripe Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
    "checkout.session.async_payment_failed",
    "checkout.session.expired",
    "payment_intent.payment_failed",
    "charge.refunded",
];
