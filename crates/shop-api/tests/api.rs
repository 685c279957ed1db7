//! End-to-end tests of the HTTP surface against a seeded catalog, a
//! temporary media root and a mocked Stripe API.

use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::requester::{ACCOUNT_HEADER, CSRF_HEADER, LANGUAGE_HEADER};
use shop_api::{create_router, AppConfig, AppState};
use shop_core::{BillStatus, PaymentStrategySelector, ShopCatalog};
use shop_stripe::{signature_header, StripeCheckoutStrategy, StripeConfig};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

const CATALOG: &str = r#"
[client_defaults]
attributes = [{ name = "sales_tax_code", value = "DOMESTIC" }]

[[tax_combinations]]
client_code = "DOMESTIC"
item_code = "SOFTWARE"
tax_code = { abbr = "VAT19", rate_bp = 1900 }

[[items]]
id = 1
number = "APP-1"
sales_price = { amount = 4900, currency = "eur" }
l11n = [
    { kind = "name1", language = "en", content = "Ledger App" },
    { kind = "name1", language = "de", content = "Kassenbuch" },
    { kind = "description_short", language = "en", content = "Bookkeeping" },
]
attributes = [
    { name = "sales_tax_code", value = "SOFTWARE" },
    { name = "brand", value = "Acme" },
    { name = "color", value = "" },
    { name = "website", value = "https://acme.example.com" },
]

[[items.files]]
id = 11
name = "Demo"
path = "items/1/demo.txt"
mime = "text/plain"
types = ["item_demo_download"]

[[items.files]]
id = 12
name = "Full"
path = "items/1/full.txt"
mime = "text/plain"
types = ["item_purchase_download"]

[[items.files]]
id = 13
name = "Cover"
path = "/items/1/cover.png"
mime = "image/png"
types = ["shop_primary_image"]

[[items]]
id = 2
number = "SUB-2"
sales_price = { amount = 990, currency = "eur" }
attributes = [
    { name = "sales_tax_code", value = "SOFTWARE" },
    { name = "subscription", value = 1 },
    { name = "one_click_pay_cc", value = "https://billing.example.com/portal" },
]

[[items]]
id = 3
number = "RAW-3"
sales_price = { amount = 100, currency = "eur" }

[[accounts]]
id = 1
name = "Jane"
email = "jane@example.com"
addresses = [{ address = "Hauptstr. 1", postal = "10115", city = "Berlin", country = "DE" }]
permissions = [
    { module = "Shop", type = "create", category = "buy" },
    { module = "Shop", type = "read", category = "shop" },
]

[[accounts]]
id = 2
name = "No Address"
email = "nobody@example.com"
permissions = [{ module = "Shop", type = "create", category = "buy" }]

[[accounts]]
id = 3
name = "Visitor"
email = "visitor@example.com"
addresses = [{ address = "Ring 2", postal = "1010", city = "Wien", country = "AT" }]

[[payment_methods]]
id = 1
account_id = 1
kind = "card"
"#;

struct Harness {
    server: TestServer,
    state: AppState,
    _media: TempDir,
}

fn media_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let items = dir.path().join("items/1");
    std::fs::create_dir_all(&items).unwrap();
    std::fs::write(items.join("demo.txt"), b"demo bytes").unwrap();
    std::fs::write(items.join("full.txt"), b"full bytes").unwrap();
    dir
}

fn harness(stripe_uri: Option<&str>) -> Harness {
    let media = media_root();
    let config = AppConfig {
        base_url: "https://shop.example.com/".to_string(),
        media_root: media.path().to_path_buf(),
        ..AppConfig::default()
    };

    let mut strategies = PaymentStrategySelector::new("stripe");
    if let Some(uri) = stripe_uri {
        let stripe = StripeConfig::new("sk_test_abc", "pk_test_abc", WEBHOOK_SECRET).with_api_base_url(uri);
        strategies.register(Arc::new(StripeCheckoutStrategy::new(stripe).unwrap()));
    }

    let catalog = ShopCatalog::from_toml(CATALOG).unwrap();
    let state = AppState::with_catalog(config, &catalog, strategies).unwrap();
    let server = TestServer::new(create_router(state.clone())).unwrap();

    Harness {
        server,
        state,
        _media: media,
    }
}

async fn mock_stripe() -> MockServer {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_42",
            "url": "https://checkout.stripe.com/c/pay/cs_test_42",
        })))
        .mount(&stripe)
        .await;
    stripe
}

fn header(name: &'static str) -> HeaderName {
    HeaderName::from_static(name)
}

fn value(v: &str) -> HeaderValue {
    HeaderValue::from_str(v).unwrap()
}

async fn buy(harness: &Harness, account: &str, query: &str) -> axum_test::TestResponse {
    harness
        .server
        .get(&format!("/shop/oneclick/buy?{}&csrf=tok", query))
        .add_header(header(ACCOUNT_HEADER), value(account))
        .add_header(header(CSRF_HEADER), value("tok"))
        .await
}

async fn completed_webhook(harness: &Harness, session_id: &str, payment_status: &str) -> axum_test::TestResponse {
    let payload = serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": session_id,
            "payment_status": payment_status,
            "amount_total": 5831,
            "currency": "eur",
        }}
    }))
    .unwrap();
    let signature = signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &payload).unwrap();

    harness
        .server
        .post("/webhook/stripe")
        .add_header(header("stripe-signature"), value(&signature))
        .bytes(Bytes::from(payload))
        .await
}

#[tokio::test]
async fn test_health() {
    let harness = harness(None);

    let response = harness.server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "oneclick-shop");
}

mod storefront {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_storefront() {
        let harness = harness(None);

        let response = harness.server.get("/shop").await;
        response.assert_status_ok();

        let html = response.text();
        assert!(html.contains("Ledger App"));
        assert!(html.contains("/shop/oneclick/buy?item=1"));
        assert!(html.contains("/shop/media/download?item=1&amp;id=11"));
        assert!(!html.contains("id=12"));
        assert!(!html.contains("class=\"gross\""));
    }

    #[tokio::test]
    async fn test_storefront_in_german_with_gross() {
        let harness = harness(None);
        let storefront = || {
            harness
                .server
                .get("/shop")
                .add_header(header(ACCOUNT_HEADER), value("1"))
                .add_header(header(LANGUAGE_HEADER), value("de"))
                .add_header(header(CSRF_HEADER), value("tok"))
        };

        let response = storefront().await;
        response.assert_status_ok();

        let html = response.text();
        assert!(html.contains("Kassenbuch"));
        assert!(html.contains("Kaufen"));
        assert!(html.contains("csrf=tok"));
        // no client yet, so no tax classification
        assert!(!html.contains("class=\"gross\""));

        buy(&harness, "1", "item=2").await.assert_status(StatusCode::SEE_OTHER);

        let html = storefront().await.text();
        assert!(html.contains("Brutto: €58.31"));
    }

    #[tokio::test]
    async fn test_storefront_requires_read_permission() {
        let harness = harness(None);

        let response = harness
            .server
            .get("/shop")
            .add_header(header(ACCOUNT_HEADER), value("2"))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
}

mod schema {
    use super::*;

    #[tokio::test]
    async fn test_product_schema() {
        let harness = harness(None);

        let response = harness.server.get("/shop/schema?item=1").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["@type"], "Product");
        assert_eq!(body["identifier"], "APP-1");
        assert_eq!(body["name"], "Ledger App");
        assert_eq!(body["brand"]["name"], "Acme");
        assert_eq!(body["image"][0], "https://shop.example.com/items/1/cover.png");
        assert_eq!(body["offers"]["price"], 49.0);
        assert!(body.get("color").is_none());
    }

    #[tokio::test]
    async fn test_schema_by_number_and_language() {
        let harness = harness(None);

        let response = harness.server.get("/shop/schema?number=APP-1&lang=de").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], "Kassenbuch");

        harness.server.get("/shop/schema?item=99").await.assert_status(StatusCode::NOT_FOUND);
        harness.server.get("/shop/schema").await.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn test_hosted_checkout_redirects() {
        let stripe = mock_stripe().await;
        let harness = harness(Some(&stripe.uri()));

        let response = buy(&harness, "1", "item=1").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            "https://checkout.stripe.com/c/pay/cs_test_42"
        );

        let body: Value = response.json();
        assert_eq!(body["kind"]["kind"], "hosted_checkout");
        assert_eq!(body["kind"]["session_id"], "cs_test_42");
        assert_eq!(body["payment_methods"].as_array().unwrap().len(), 1);

        let bills = harness.state.shop.billing.all().unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].status, BillStatus::Active);
        assert_eq!(bills[0].gross_total().amount, 5831);
    }

    #[tokio::test]
    async fn test_repeated_requests_create_new_bills() {
        let stripe = mock_stripe().await;
        let harness = harness(Some(&stripe.uri()));

        buy(&harness, "1", "item=1").await.assert_status(StatusCode::SEE_OTHER);
        buy(&harness, "1", "number=APP-1").await.assert_status(StatusCode::SEE_OTHER);

        let bills = harness.state.shop.billing.all().unwrap();
        assert_eq!(bills.len(), 2);
        assert_ne!(bills[0].id, bills[1].id);
        assert_eq!(harness.state.shop.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_redirects_to_portal() {
        let harness = harness(None);

        let response = buy(&harness, "1", "item=2").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "https://billing.example.com/portal");

        let body: Value = response.json();
        assert_eq!(body["kind"]["kind"], "subscription");
    }

    #[tokio::test]
    async fn test_missing_address() {
        let harness = harness(None);

        let response = buy(&harness, "2", "item=2").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(harness.state.shop.billing.all().unwrap().is_empty());

        let response = buy(
            &harness,
            "2",
            "item=2&address=Gasse%203&postal=8010&city=Graz&country=AT",
        )
        .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_missing_tax_attribute() {
        let harness = harness(None);

        buy(&harness, "1", "item=3").await.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(harness.state.shop.billing.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_payment_provider() {
        let harness = harness(None);

        buy(&harness, "1", "item=1")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(harness.state.shop.billing.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guards() {
        let harness = harness(None);

        // anonymous
        harness
            .server
            .get("/shop/oneclick/buy?item=1&csrf=tok")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // csrf mismatch
        harness
            .server
            .get("/shop/oneclick/buy?item=1&csrf=other")
            .add_header(header(ACCOUNT_HEADER), value("1"))
            .add_header(header(CSRF_HEADER), value("tok"))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // link followed without the platform's csrf header
        harness
            .server
            .get("/shop/oneclick/buy?item=1&csrf=tok")
            .add_header(header(ACCOUNT_HEADER), value("1"))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // no Shop/Create/Buy permission
        buy(&harness, "3", "item=1").await.assert_status(StatusCode::FORBIDDEN);

        // unknown payment type
        buy(&harness, "1", "item=1&payment_types=bitcoin")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

mod downloads {
    use super::*;

    #[tokio::test]
    async fn test_demo_download_is_open() {
        let harness = harness(None);

        let response = harness.server.get("/shop/media/download?item=1&id=11").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"demo bytes");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"demo.txt\""
        );
    }

    #[tokio::test]
    async fn test_purchase_download_after_paid_webhook() {
        let stripe = mock_stripe().await;
        let harness = harness(Some(&stripe.uri()));
        let download = |account: &'static str| {
            harness
                .server
                .get("/shop/media/download?item=1&id=12")
                .add_header(header(ACCOUNT_HEADER), value(account))
        };

        harness
            .server
            .get("/shop/media/download?item=1&id=12")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        download("1").await.assert_status(StatusCode::FORBIDDEN);

        buy(&harness, "1", "item=1").await.assert_status(StatusCode::SEE_OTHER);
        download("1").await.assert_status(StatusCode::FORBIDDEN);

        completed_webhook(&harness, "cs_test_42", "unpaid").await.assert_status_ok();
        download("1").await.assert_status(StatusCode::FORBIDDEN);

        completed_webhook(&harness, "cs_test_42", "paid").await.assert_status_ok();
        let bills = harness.state.shop.billing.all().unwrap();
        assert_eq!(bills[0].status, BillStatus::Archived);

        let response = download("1").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"full bytes");

        download("3").await.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_file() {
        let harness = harness(None);

        harness
            .server
            .get("/shop/media/download?item=1&id=99")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod webhooks {
    use super::*;

    #[tokio::test]
    async fn test_rejects_bad_signature() {
        let stripe = mock_stripe().await;
        let harness = harness(Some(&stripe.uri()));

        harness
            .server
            .post("/webhook/stripe")
            .add_header(header("stripe-signature"), value("t=1,v1=deadbeef"))
            .bytes(Bytes::from_static(b"{}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        harness
            .server
            .post("/webhook/stripe")
            .bytes(Bytes::from_static(b"{}"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let stripe = mock_stripe().await;
        let harness = harness(Some(&stripe.uri()));

        completed_webhook(&harness, "cs_unknown", "paid")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
