//! # Routes
//!
//! Axum router configuration for the shop.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Storefront:
///   - GET /shop - Landing page
///   - GET /shop/schema?item={id} - schema.org Product JSON
///
/// - Checkout:
///   - GET /shop/oneclick/buy?item={id}&csrf={token} - One-click buy, 303 to payment
///   - GET /shop/checkout/success - Success page
///   - GET /shop/checkout/cancel - Cancel page
///
/// - Media:
///   - GET /shop/media/download?item={id}&id={file} - Gated download
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Static success/cancel pages
    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    let shop_routes = Router::new()
        .route("/oneclick/buy", get(handlers::one_click_buy))
        .route("/media/download", get(handlers::media_download))
        .route("/schema", get(handlers::product_schema))
        .nest("/checkout", checkout_routes);

    // Webhook routes (must accept raw body)
    let webhook_routes = Router::new()
        .route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route("/shop", get(handlers::storefront))
        .nest("/shop", shop_routes)
        .nest("/webhook", webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
