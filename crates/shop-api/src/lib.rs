//! # shop-api
//!
//! HTTP layer of the one-click shop.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Storefront page and schema.org product documents
//! - One-click checkout and purchase-gated downloads
//! - Webhook handlers for payment events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/shop` | Storefront |
//! | GET | `/shop/oneclick/buy` | One-click checkout |
//! | GET | `/shop/media/download` | Gated download |
//! | GET | `/shop/schema` | schema.org Product JSON |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod handlers;
pub mod requester;
pub mod routes;
pub mod state;
pub mod storefront;

pub use requester::Requester;
pub use routes::create_router;
pub use state::{AppConfig, AppState};
