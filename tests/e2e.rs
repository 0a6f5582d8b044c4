//! End-to-end tests against a live model.
//!
//! These tests post real bill photos from `./test_cases/` through the router
//! and make live LLM API calls. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bill_gateway::{router, BillExtraction, Gateway, GatewayConfig};
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const ORIGIN: &str = "https://www.satyajeetnigade.in";

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no image at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            println!("       Place a photo of a restaurant bill there to run this test.");
            return;
        }
        p
    }};
}

fn live_app() -> axum::Router {
    let config = GatewayConfig::builder()
        .allowed_origins([ORIGIN])
        .build()
        .expect("valid config");
    let gateway = Gateway::from_config(config).expect("provider configured (GEMINI_API_KEY)");
    router(Arc::new(gateway))
}

#[tokio::test]
async fn test_extract_restaurant_bill() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("restaurant_bill.jpg"));

    let bytes = std::fs::read(&path).expect("read fixture");
    let body = serde_json::json!({
        "image": { "base64Data": STANDARD.encode(&bytes), "mimeType": "image/jpeg" }
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("origin", ORIGIN)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = live_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&bytes);
    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", text);

    let bill: BillExtraction =
        serde_json::from_str(&text).expect("model reply should match the bill schema");
    assert!(!bill.items.is_empty(), "bill should have at least one item");
    assert!(bill.items.iter().all(|i| i.quantity >= 1));
    if !bill.is_reconciled() {
        println!(
            "[restaurant_bill] totals off by {:.2}",
            bill.reconciliation_gap()
        );
    }
}
