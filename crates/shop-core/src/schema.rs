//! # Product Schema
//!
//! Maps an item onto a schema.org `Product` JSON-LD document. Optional keys
//! are only emitted for attributes that are present and not blank.

use crate::item::{Item, L11nKind};
use crate::l11n::Language;
use serde_json::{json, Map, Value};

pub const SCHEMA_CONTEXT: &str = "https://schema.org/";
pub const PRIMARY_IMAGE: &str = "shop_primary_image";
/// Offers are always published in euro, whatever the item's currency
pub const OFFER_CURRENCY: &str = "EUR";

/// Build the `Product` document for an item.
///
/// `base_url` prefixes image paths; a trailing `/` is not doubled.
pub fn build_schema(item: &Item, base_url: &str, language: Language) -> Value {
    let base = base_url.trim_end_matches('/');

    let images: Vec<Value> = item
        .files_by_type(PRIMARY_IMAGE)
        .map(|f| Value::String(format!("{}/{}", base, f.path.trim_start_matches('/'))))
        .collect();

    let mut schema = Map::new();
    schema.insert("@context".into(), json!(SCHEMA_CONTEXT));
    schema.insert("@type".into(), json!("Product"));
    schema.insert("identifier".into(), json!(item.number));
    schema.insert("name".into(), json!(item.l11n(L11nKind::Name1, language)));
    schema.insert(
        "description".into(),
        json!(item.l11n(L11nKind::DescriptionShort, language)),
    );
    schema.insert("image".into(), Value::Array(images));
    schema.insert(
        "offers".into(),
        json!({
            "@type": "Offer",
            "priceCurrency": OFFER_CURRENCY,
            "price": item.sales_price.as_decimal(),
            "availability": "http://schema.org/InStock",
        }),
    );

    let attr = |name: &str| item.filled_attribute(name).map(|v| v.to_json());

    if let Some(brand) = attr("brand") {
        schema.insert("brand".into(), json!({ "@type": "Brand", "name": brand }));
    }

    for (key, attribute) in [
        ("model", "model"),
        ("color", "color"),
        ("countryOfAssembly", "country_of_assembly"),
        ("countryOfLastProcessing", "country_of_last_processing"),
        ("gtin", "gtin"),
        ("releasedate", "release_date"),
    ] {
        if let Some(value) = attr(attribute) {
            schema.insert(key.into(), value);
        }
    }

    if let Some(origin) = attr("country_of_origin") {
        schema.insert(
            "countryOfOrigin".into(),
            json!({ "@type": "Country", "identifier": origin }),
        );
    }

    for key in ["weight", "width", "height"] {
        if let Some(value) = attr(key) {
            schema.insert(
                key.into(),
                json!({ "@type": "QuantitativeValue", "value": value }),
            );
        }
    }

    if let Some(manufacturer) = attr("manufacturer") {
        schema.insert(
            "manufacturer".into(),
            json!({ "@type": "Organization", "legalName": manufacturer }),
        );
    }

    if let Some(group) = attr("variantof") {
        schema.insert(
            "isVariantOf".into(),
            json!({ "@type": "ProductGroup", "productGroupID": group }),
        );
    }

    let parts: Vec<Value> = ["accessoryfor", "sparepartfor"]
        .into_iter()
        .filter_map(|name| attr(name))
        .map(|id| json!({ "@type": "Product", "identifier": id }))
        .collect();
    if !parts.is_empty() {
        schema.insert("isAccessoryOrSparePartFor".into(), Value::Array(parts));
    }

    if let Some(consumable) = attr("consumablefor") {
        schema.insert(
            "isConsumableFor".into(),
            json!({ "@type": "Product", "identifier": consumable }),
        );
    }

    if attr("isfamilyfriendly").is_some() {
        schema.insert("isFamilyFriendly".into(), Value::Bool(true));
    }

    Value::Object(schema)
}
