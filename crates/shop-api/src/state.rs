//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the seeded stores, the checkout workflow, payment strategies
//! and configuration.

use crate::storefront::TemplateEngine;
use shop_core::{
    BoxedPaymentStrategy, CheckoutUrls, InMemoryShop, Language, LocalMediaStore, OneClickBuy,
    PaymentStrategySelector, ShopCatalog, ShopServices,
};
use shop_stripe::{BillArchivingHandler, StripeCheckoutStrategy, StripeConfig, WebhookHandler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks and schema image links
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Catalog file; searched in `config/` when unset
    pub catalog_path: Option<PathBuf>,
    /// Directory item files are served from
    pub media_root: PathBuf,
    /// Language when the request names none
    pub default_language: Language,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            base_url: lookup("BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            catalog_path: lookup("SHOP_CATALOG").map(PathBuf::from),
            media_root: lookup("SHOP_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            default_language: lookup("SHOP_DEFAULT_LANGUAGE")
                .map(|l| Language::parse_or_default(&l))
                .unwrap_or_default(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Concrete store handles (seeding, inspection)
    pub shop: InMemoryShop,
    /// Collaborators as the workflows see them
    pub services: ShopServices,
    /// One-click checkout workflow
    pub checkout: OneClickBuy,
    /// Payment strategy selector
    pub strategies: PaymentStrategySelector,
    /// Receives verified payment webhooks
    pub webhook_handler: Arc<dyn WebhookHandler>,
    /// Checkout URLs
    pub urls: CheckoutUrls,
    /// Compiled HTML templates
    pub templates: TemplateEngine,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment: catalog file, media root and Stripe
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_catalog(&config)?;

        let mut strategies = PaymentStrategySelector::new("stripe");
        match StripeConfig::from_env_optional() {
            Ok(Some(stripe)) => {
                let strategy = StripeCheckoutStrategy::new(stripe)
                    .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
                strategies.register(Arc::new(strategy) as BoxedPaymentStrategy);
            }
            Ok(None) => {
                warn!("STRIPE_SECRET_KEY not set; hosted checkout is disabled");
            }
            Err(e) => return Err(anyhow::anyhow!("Invalid Stripe configuration: {}", e)),
        }

        Self::with_catalog(config, &catalog, strategies)
    }

    /// Build state from explicit parts
    pub fn with_catalog(
        config: AppConfig,
        catalog: &ShopCatalog,
        strategies: PaymentStrategySelector,
    ) -> anyhow::Result<Self> {
        let shop = InMemoryShop::new();
        catalog
            .seed(&shop)
            .map_err(|e| anyhow::anyhow!("Failed to seed catalog: {}", e))?;

        let services = shop.services(Arc::new(LocalMediaStore::new(config.media_root.clone())));
        let urls = CheckoutUrls::new(&config.base_url);
        let checkout = OneClickBuy::new(services.clone(), strategies.clone(), urls.clone());
        let webhook_handler: Arc<dyn WebhookHandler> =
            Arc::new(BillArchivingHandler::new(services.billing.clone()));
        let templates = TemplateEngine::new()
            .map_err(|e| anyhow::anyhow!("Failed to compile templates: {}", e))?;

        Ok(Self {
            shop,
            services,
            checkout,
            strategies,
            webhook_handler,
            urls,
            templates,
            config,
        })
    }

    /// Get a specific payment strategy
    pub fn strategy(&self, provider: &str) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(provider)
    }
}

/// Load the shop catalog from the configured path or `config/shop.toml`
fn load_catalog(config: &AppConfig) -> anyhow::Result<ShopCatalog> {
    if let Some(path) = &config.catalog_path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        return parse_catalog(&content, &path.display().to_string());
    }

    let config_paths = [
        "config/shop.toml",
        "../config/shop.toml",
        "../../config/shop.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_catalog(&content, path);
        }
    }

    warn!("No shop catalog found, using empty catalog");
    Ok(ShopCatalog::new())
}

fn parse_catalog(content: &str, path: &str) -> anyhow::Result<ShopCatalog> {
    let catalog = ShopCatalog::from_toml(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    info!("Loaded {} items from {}", catalog.items.len(), path);
    Ok(catalog)
}
