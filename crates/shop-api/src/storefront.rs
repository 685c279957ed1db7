//! # Storefront Page
//!
//! Server-rendered landing page listing the catalog with localized labels.
//! The page is a tera template with HTML autoescaping, compiled into the
//! binary so the server does not depend on its working directory.

use serde::Serialize;
use shop_core::download::{DEMO_DOWNLOAD, PUBLIC_DOWNLOAD};
use shop_core::l11n::label;
use shop_core::{Item, L11nKind, Language, Price, ShopError, ShopResult};
use std::sync::Arc;
use tera::{Context, Tera};

const STOREFRONT_TEMPLATE: &str = "storefront.html";

/// An item as shown on the storefront
pub struct StorefrontEntry {
    pub item: Item,
    /// Gross price when the requester's tax code is known
    pub gross: Option<Price>,
}

#[derive(Serialize)]
struct Labels {
    buy: &'static str,
    website: &'static str,
    demo: &'static str,
    download: &'static str,
    price: &'static str,
    net: &'static str,
    gross: &'static str,
}

impl Labels {
    fn new(language: Language) -> Self {
        Self {
            buy: label(language, "Buy"),
            website: label(language, "Website"),
            demo: label(language, "Demo"),
            download: label(language, "Download"),
            price: label(language, "Price"),
            net: label(language, "Net"),
            gross: label(language, "Gross"),
        }
    }
}

#[derive(Serialize)]
struct ItemView {
    id: u64,
    name: String,
    description: String,
    net: String,
    gross: Option<String>,
    website: Option<String>,
    demos: Vec<u64>,
    downloads: Vec<u64>,
}

impl ItemView {
    fn new(entry: &StorefrontEntry, language: Language) -> Self {
        let item = &entry.item;
        let name = match item.l11n(L11nKind::Name1, language) {
            "" => item.number.as_str(),
            name => name,
        };

        Self {
            id: item.id,
            name: name.to_string(),
            description: item.l11n(L11nKind::DescriptionShort, language).to_string(),
            net: item.sales_price.display(),
            gross: entry.gross.as_ref().map(Price::display),
            website: item.filled_attribute("website").map(|v| v.as_string()),
            demos: item.files_by_type(DEMO_DOWNLOAD).map(|f| f.id).collect(),
            downloads: item.files_by_type(PUBLIC_DOWNLOAD).map(|f| f.id).collect(),
        }
    }
}

#[derive(Serialize)]
struct StorefrontView<'a> {
    lang: String,
    labels: Labels,
    items: Vec<ItemView>,
    csrf: Option<&'a str>,
}

/// Compiled page templates
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Arc<Tera>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(STOREFRONT_TEMPLATE, include_str!("../templates/storefront.html"))?;
        tera.autoescape_on(vec![".html"]);

        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Full storefront document
    pub fn render_storefront(
        &self,
        entries: &[StorefrontEntry],
        language: Language,
        csrf: Option<&str>,
    ) -> ShopResult<String> {
        let view = StorefrontView {
            lang: language.to_string(),
            labels: Labels::new(language),
            items: entries.iter().map(|e| ItemView::new(e, language)).collect(),
            csrf,
        };
        let context = Context::from_serialize(&view)
            .map_err(|e| ShopError::Internal(format!("Storefront context: {}", e)))?;

        self.tera
            .render(STOREFRONT_TEMPLATE, &context)
            .map_err(|e| ShopError::Internal(format!("Failed to render storefront: {}", e)))
    }
}
