//! # One-Click Shop
//!
//! Storefront and one-click checkout server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export SHOP_CATALOG=config/shop.toml
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # Run the server
//! oneclick-shop
//! ```

use shop_api::{routes, state::AppState};
use shop_stripe::REQUIRED_WEBHOOK_EVENTS;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();
    let has_stripe = state.strategy("stripe").is_some();

    let items = state.shop.items.len();
    info!("Environment: {}", state.config.environment);
    info!("Items loaded: {}", items);
    info!("Payment providers: {:?}", state.strategies.providers());

    let app = routes::create_router(state);

    info!("Shop starting on http://{}", addr);

    if !is_prod {
        info!("Storefront: GET http://{}/shop", addr);
        info!("Checkout: GET http://{}/shop/oneclick/buy?item=<id>", addr);
        info!("Webhook: POST http://{}/webhook/stripe", addr);
    }

    if has_stripe {
        info!("Stripe webhook events to enable: {}", REQUIRED_WEBHOOK_EVENTS.join(", "));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  One-Click Shop
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront and checkout
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
