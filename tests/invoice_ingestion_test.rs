mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

use common::TestApp;

fn as_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other:?}"),
    }
}

async fn seed_widget(app: &TestApp) -> String {
    let created = app
        .request_json(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Widget",
                "sku": "WID-001",
                "price": 2.50,
                "cost": 1.00,
                "stock": 3,
                "min_stock": 10,
                "supplier": "Acme",
            })),
            StatusCode::CREATED,
        )
        .await;
    created["id"].as_str().expect("product id").to_string()
}

#[tokio::test]
async fn ingestion_restocks_known_lines_and_creates_unknown_ones() {
    let app = TestApp::new().await;
    let widget_id = seed_widget(&app).await;

    let summary = app
        .request_json(
            Method::POST,
            "/api/v1/invoices/ingest",
            Some(json!({
                "items": [
                    { "name": "Widget", "quantity": 4, "unit_cost": 1.25 },
                    { "name": "Grommet", "quantity": 6, "unit_cost": 2.00 },
                ]
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(summary["products_restocked"], 1);
    assert_eq!(summary["products_created"], 1);

    // The known line matched by name: stock incremented, cost basis refreshed.
    let widget = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{widget_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(widget["stock"], 7);
    assert_eq!(widget["in_stock"], true);
    assert_eq!(as_decimal(&widget["cost"]), Decimal::from_str("1.25").unwrap());
    // Selling price is untouched by ingestion.
    assert_eq!(as_decimal(&widget["price"]), Decimal::from_str("2.50").unwrap());

    // The unknown line became a new product under the default supplier.
    let listed = app
        .request_json(Method::GET, "/api/v1/products?per_page=50", None, StatusCode::OK)
        .await;
    let grommet = listed["products"]
        .as_array()
        .expect("products array")
        .iter()
        .find(|p| p["name"] == "Grommet")
        .expect("created product");
    assert_eq!(grommet["stock"], 6);
    assert_eq!(grommet["min_stock"], 0);
    assert_eq!(grommet["supplier"], "Default Supplier");
    assert_eq!(as_decimal(&grommet["cost"]), Decimal::from_str("2.00").unwrap());
    assert_eq!(as_decimal(&grommet["price"]), Decimal::from_str("2.00").unwrap());
    assert!(grommet["sku"].as_str().unwrap().starts_with("GROMMET-"));
}

#[tokio::test]
async fn repeated_ingestion_keeps_matching_by_name() {
    let app = TestApp::new().await;

    app.request_json(
        Method::POST,
        "/api/v1/invoices/ingest",
        Some(json!({
            "items": [{ "name": "Sprocket", "quantity": 5, "unit_cost": 3.00 }]
        })),
        StatusCode::OK,
    )
    .await;

    let summary = app
        .request_json(
            Method::POST,
            "/api/v1/invoices/ingest",
            Some(json!({
                "items": [{ "name": "Sprocket", "quantity": 2, "unit_cost": 3.10 }]
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(summary["products_created"], 0);
    assert_eq!(summary["products_restocked"], 1);

    let listed = app
        .request_json(Method::GET, "/api/v1/products", None, StatusCode::OK)
        .await;
    let products = listed["products"].as_array().unwrap();
    assert_eq!(products.len(), 1, "second invoice must not duplicate the product");
    assert_eq!(products[0]["stock"], 7);
    assert_eq!(
        as_decimal(&products[0]["cost"]),
        Decimal::from_str("3.10").unwrap()
    );
}

#[tokio::test]
async fn empty_invoice_is_rejected() {
    let app = TestApp::new().await;

    app.request_json(
        Method::POST,
        "/api/v1/invoices/ingest",
        Some(json!({ "items": [] })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn invalid_line_rolls_back_the_whole_invoice() {
    let app = TestApp::new().await;
    let widget_id = seed_widget(&app).await;

    // The first line is fine, the second is invalid. Nothing may be applied.
    app.request_json(
        Method::POST,
        "/api/v1/invoices/ingest",
        Some(json!({
            "items": [
                { "name": "Widget", "quantity": 4, "unit_cost": 1.25 },
                { "name": "Bad Line", "quantity": 0, "unit_cost": 1.00 },
            ]
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let widget = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{widget_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(widget["stock"], 3, "partial invoices must not be applied");
    assert_eq!(as_decimal(&widget["cost"]), Decimal::from_str("1.00").unwrap());
}
