//! # Request Handlers
//!
//! Axum request handlers for the shop: storefront, one-click checkout,
//! gated downloads, product schema and the Stripe webhook.

use crate::requester::{authorize, Requester};
use crate::state::AppState;
use crate::storefront::StorefrontEntry;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{
    build_schema, download, CheckoutRequest, ClientOverrides, Item, ItemRef, PaymentType,
    PermissionCategory, PermissionType, Price, ShopError,
};
use shop_stripe::dispatch_webhook_event;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query of `GET /shop/oneclick/buy`
#[derive(Debug, Default, Deserialize)]
pub struct BuyParams {
    pub item: Option<u64>,
    pub number: Option<String>,
    /// Comma-separated payment type allow-list
    pub payment_types: Option<String>,
    pub csrf: Option<String>,
    pub address: Option<String>,
    pub postal: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub vat_id: Option<String>,
    pub unit: Option<u64>,
}

impl BuyParams {
    fn payment_types(&self) -> Result<Option<Vec<PaymentType>>, ShopError> {
        let Some(raw) = self.payment_types.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        raw.split(',')
            .map(|t| {
                PaymentType::parse(t)
                    .ok_or_else(|| ShopError::InvalidRequest(format!("Unknown payment type: {}", t.trim())))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn overrides(&self) -> ClientOverrides {
        ClientOverrides {
            address: self.address.clone(),
            postal: self.postal.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            state: self.state.clone(),
            vat_id: self.vat_id.clone(),
            unit: self.unit,
        }
    }
}

/// Item selector shared by schema and checkout queries
#[derive(Debug, Deserialize)]
pub struct ItemParams {
    pub item: Option<u64>,
    pub number: Option<String>,
}

fn item_ref(id: Option<u64>, number: Option<&str>) -> Result<ItemRef, ShopError> {
    match (id, number.map(str::trim).filter(|n| !n.is_empty())) {
        (Some(id), _) => Ok(ItemRef::Id(id)),
        (None, Some(number)) => Ok(ItemRef::Number(number.to_string())),
        (None, None) => Err(ShopError::MissingField {
            field: "item".to_string(),
        }),
    }
}

/// Query of `GET /shop/media/download`
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub item: u64,
    pub id: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "oneclick-shop",
        "version": env!("CARGO_PKG_VERSION"),
        "payment_providers": state.strategies.providers(),
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Storefront landing page
#[instrument(skip(state, requester), fields(account_id = ?requester.account_id))]
pub async fn storefront(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Html<String>, ApiError> {
    let client = match requester.account_id {
        Some(account_id) => {
            authorize(&state, account_id, PermissionType::Read, PermissionCategory::Shop)
                .await
                .map_err(shop_error_to_response)?;
            state
                .services
                .clients
                .find_by_account(account_id)
                .await
                .map_err(shop_error_to_response)?
        }
        None => None,
    };

    let items = state
        .services
        .items
        .list()
        .await
        .map_err(shop_error_to_response)?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let gross = match &client {
            Some(client) => gross_price(&state, &item, client).await,
            None => None,
        };
        entries.push(StorefrontEntry { item, gross });
    }

    state
        .templates
        .render_storefront(&entries, requester.language, requester.csrf_token())
        .map(Html)
        .map_err(shop_error_to_response)
}

async fn gross_price(state: &AppState, item: &Item, client: &shop_core::Client) -> Option<Price> {
    let tax = state.checkout.resolve_tax_code(item, client).await.ok()?;
    let net = &item.sales_price;
    Some(Price::from_cents(net.amount + tax.tax_for(net).amount, net.currency))
}

/// One-click buy: finalize a bill and redirect to payment
#[instrument(skip(state, requester, params), fields(account_id = ?requester.account_id))]
pub async fn one_click_buy(
    State(state): State<AppState>,
    requester: Requester,
    Query(params): Query<BuyParams>,
) -> Result<Response, ApiError> {
    let account_id = requester.require_account().map_err(shop_error_to_response)?;
    requester
        .verify_csrf(params.csrf.as_deref())
        .map_err(shop_error_to_response)?;
    authorize(&state, account_id, PermissionType::Create, PermissionCategory::Buy)
        .await
        .map_err(shop_error_to_response)?;

    let request = CheckoutRequest {
        account_id,
        item: item_ref(params.item, params.number.as_deref()).map_err(shop_error_to_response)?,
        payment_types: params.payment_types().map_err(shop_error_to_response)?,
        language: requester.language,
        overrides: params.overrides(),
    };

    let outcome = state.checkout.execute(&request).await.map_err(|e| {
        error!("One-click checkout failed: {}", e);
        shop_error_to_response(e)
    })?;

    info!(
        "One-click checkout: bill={}, location={}",
        outcome.bill_number, outcome.location
    );

    let location = HeaderValue::from_str(&outcome.location).map_err(|_| {
        shop_error_to_response(ShopError::Internal(format!(
            "Invalid redirect location: {}",
            outcome.location
        )))
    })?;

    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)], Json(outcome)).into_response())
}

/// Purchase-gated file download
#[instrument(skip(state, requester), fields(account_id = ?requester.account_id))]
pub async fn media_download(
    State(state): State<AppState>,
    requester: Requester,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let export = download(&state.services, params.item, params.id, requester.account_id)
        .await
        .map_err(|e| {
            warn!("Download of file {} refused: {}", params.id, e);
            shop_error_to_response(e)
        })?;

    let content_type = HeaderValue::from_str(&export.mime)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let filename = export.filename.replace(['"', '\\', '\r', '\n'], "_");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}

/// schema.org `Product` document for an item
pub async fn product_schema(
    State(state): State<AppState>,
    requester: Requester,
    Query(params): Query<ItemParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let item = item_ref(params.item, params.number.as_deref()).map_err(shop_error_to_response)?;
    let item = state
        .checkout
        .resolve_item(&item)
        .await
        .map_err(shop_error_to_response)?;

    Ok(Json(build_schema(&item, &state.config.base_url, requester.language)))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    // Get signature header
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Stripe-Signature header", 400)),
            )
        })?;

    // Get Stripe strategy
    let strategy = state.strategy("stripe").ok_or_else(|| {
        shop_error_to_response(ShopError::Configuration("Stripe not configured".to_string()))
    })?;

    // Verify and parse webhook
    let event = strategy
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            shop_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    dispatch_webhook_event(state.webhook_handler.as_ref(), event)
        .await
        .map_err(|e| {
            error!("Webhook handler error: {}", e);
            shop_error_to_response(e)
        })?;

    Ok(StatusCode::OK)
}

/// Checkout success page
pub async fn checkout_success(
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> impl IntoResponse {
    let session_id: String = params
        .get("session_id")
        .map(|s| s.as_str())
        .unwrap_or("unknown")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    Html(format!(r#"
<!DOCTYPE html>
<html>
<head><title>Payment Successful</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Payment Successful!</h1>
        <p>Session: <code>{}</code></p>
        <p style="color: #666;">Your downloads unlock as soon as the payment is confirmed.</p>
        <p><a href="/shop">Back to the shop</a></p>
    </div>
</body>
</html>
"#, session_id))
}

/// Checkout cancel page
pub async fn checkout_cancel() -> impl IntoResponse {
    Html(r#"
<!DOCTYPE html>
<html>
<head><title>Payment Cancelled</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; border-radius: 16px; text-align: center;">
        <h1>Payment Cancelled</h1>
        <p style="color: #666;">No charges were made. Your bill stays open.</p>
        <p><a href="/shop">Back to the shop</a></p>
    </div>
</body>
</html>
"#)
}
