mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
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

async fn create_product(
    app: &TestApp,
    name: &str,
    sku: &str,
    price: f64,
    stock: i32,
    min_stock: i32,
    supplier: Option<&str>,
) -> Value {
    app.request_json(
        Method::POST,
        "/api/v1/products",
        Some(json!({
            "name": name,
            "sku": sku,
            "price": price,
            "cost": price / 2.0,
            "stock": stock,
            "min_stock": min_stock,
            "supplier": supplier,
        })),
        StatusCode::CREATED,
    )
    .await
}

fn item_for<'a>(order: &'a Value, product_id: &str) -> &'a Value {
    order["items"]
        .as_array()
        .expect("items array")
        .iter()
        .find(|i| i["product_id"] == product_id)
        .unwrap_or_else(|| panic!("no line item for product {product_id}"))
}

#[tokio::test]
async fn replenishment_creates_one_order_per_supplier() {
    let app = TestApp::new().await;

    // Acme scenario from the reorder rules: A needs 8, B needs 5, C is
    // healthy and must not appear anywhere.
    let a = create_product(&app, "Product A", "SKU-A", 5.00, 2, 10, Some("Acme")).await;
    let b = create_product(&app, "Product B", "SKU-B", 2.00, 0, 5, Some("Acme")).await;
    let c = create_product(&app, "Product C", "SKU-C", 3.00, 20, 5, Some("Acme")).await;
    let e = create_product(&app, "Product E", "SKU-E", 4.00, 1, 3, Some("Globex")).await;

    let orders = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let orders = orders.as_array().expect("orders array");
    assert_eq!(orders.len(), 2, "one order per supplier bucket");

    let acme = orders
        .iter()
        .find(|o| o["supplier"] == "Acme")
        .expect("Acme order");
    let globex = orders
        .iter()
        .find(|o| o["supplier"] == "Globex")
        .expect("Globex order");

    assert_eq!(acme["status"], "pending");
    assert_eq!(acme["items"].as_array().unwrap().len(), 2);

    let item_a = item_for(acme, a["id"].as_str().unwrap());
    assert_eq!(item_a["quantity"], 8);
    assert_eq!(as_decimal(&item_a["cost"]), dec!(5.00));

    let item_b = item_for(acme, b["id"].as_str().unwrap());
    assert_eq!(item_b["quantity"], 5);
    assert_eq!(as_decimal(&item_b["cost"]), dec!(2.00));

    // total = 8 * 5.00 + 5 * 2.00
    assert_eq!(as_decimal(&acme["total"]), dec!(50.00));

    // Globex gets its own order: quantity 2 at price 4.00.
    let item_e = item_for(globex, e["id"].as_str().unwrap());
    assert_eq!(item_e["quantity"], 2);
    assert_eq!(as_decimal(&globex["total"]), dec!(8.00));

    // The healthy product is excluded from every order.
    let c_id = c["id"].as_str().unwrap();
    for order in orders {
        assert!(
            order["items"]
                .as_array()
                .unwrap()
                .iter()
                .all(|i| i["product_id"] != c_id),
            "healthy product must not be reordered"
        );
    }
}

#[tokio::test]
async fn receive_increments_stock_once_and_conflicts_after() {
    let app = TestApp::new().await;

    let a = create_product(&app, "Product A", "SKU-A", 5.00, 2, 10, Some("Acme")).await;
    let b = create_product(&app, "Product B", "SKU-B", 2.00, 0, 5, Some("Acme")).await;

    let orders = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let order_id = orders[0]["id"].as_str().expect("order id").to_string();

    let received = app
        .request_json(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/receive"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(received["status"], "received");

    // Stock is topped up exactly to the threshold and the flag is forced on.
    for (product, expected_stock) in [(&a, 10), (&b, 5)] {
        let id = product["id"].as_str().unwrap();
        let fresh = app
            .request_json(
                Method::GET,
                &format!("/api/v1/products/{id}"),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(fresh["stock"], expected_stock);
        assert_eq!(fresh["in_stock"], true);
    }

    // Receiving again must conflict and leave stock untouched.
    app.request_json(
        Method::POST,
        &format!("/api/v1/purchase-orders/{order_id}/receive"),
        None,
        StatusCode::CONFLICT,
    )
    .await;

    let a_id = a["id"].as_str().unwrap();
    let fresh_a = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{a_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(fresh_a["stock"], 10, "double receive must not double-apply");
}

#[tokio::test]
async fn receive_rejects_a_pending_target_status() {
    let app = TestApp::new().await;

    let a = create_product(&app, "Product A", "SKU-A", 5.00, 2, 10, Some("Acme")).await;
    let a_id = a["id"].as_str().expect("product id");

    let orders = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let order_id = orders[0]["id"].as_str().expect("order id").to_string();

    // A target of `pending` would make the receive repeatable.
    app.request_json(
        Method::POST,
        &format!("/api/v1/purchase-orders/{order_id}/receive"),
        Some(json!({ "status": "pending" })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    // Nothing was applied: the order is still pending and stock untouched.
    let order = app
        .request_json(
            Method::GET,
            &format!("/api/v1/purchase-orders/{order_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(order["status"], "pending");

    let fresh = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{a_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(fresh["stock"], 2);

    // A normal receive still works afterwards, exactly once.
    app.request_json(
        Method::POST,
        &format!("/api/v1/purchase-orders/{order_id}/receive"),
        None,
        StatusCode::OK,
    )
    .await;
    let fresh = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{a_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(fresh["stock"], 10);
}

#[tokio::test]
async fn receive_rolls_back_when_a_referenced_product_is_missing() {
    use sea_orm::{ConnectionTrait, EntityTrait};
    use uuid::Uuid;
    use wholesale_api::entities::product;

    let app = TestApp::new().await;

    let a = create_product(&app, "Product A", "SKU-A", 5.00, 2, 10, Some("Acme")).await;
    let b = create_product(&app, "Product B", "SKU-B", 2.00, 0, 5, Some("Acme")).await;
    let a_id = a["id"].as_str().expect("product id");
    let b_id = Uuid::parse_str(b["id"].as_str().expect("product id")).unwrap();

    let orders = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let order_id = orders[0]["id"].as_str().expect("order id").to_string();

    // Remove one referenced product row out from under the order.
    let db = &*app.state.db;
    db.execute_unprepared("PRAGMA foreign_keys = OFF")
        .await
        .expect("disable fk enforcement");
    product::Entity::delete_by_id(b_id)
        .exec(db)
        .await
        .expect("delete product row");
    db.execute_unprepared("PRAGMA foreign_keys = ON")
        .await
        .expect("re-enable fk enforcement");

    app.request_json(
        Method::POST,
        &format!("/api/v1/purchase-orders/{order_id}/receive"),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;

    // The whole receive rolled back: the surviving product's stock is
    // unchanged and the order is still pending and receivable.
    let fresh = app
        .request_json(
            Method::GET,
            &format!("/api/v1/products/{a_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(fresh["stock"], 2, "partial receives must not be applied");

    let order = app
        .request_json(
            Method::GET,
            &format!("/api/v1/purchase-orders/{order_id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(order["status"], "pending");
}

#[tokio::test]
async fn receive_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    app.request_json(
        Method::POST,
        "/api/v1/purchase-orders/00000000-0000-0000-0000-000000000001/receive",
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn replenish_with_nothing_low_signals_no_replenishment_needed() {
    let app = TestApp::new().await;

    create_product(&app, "Product C", "SKU-C", 3.00, 20, 5, Some("Acme")).await;
    // min_stock = 0 is never eligible since stock cannot go below zero.
    create_product(&app, "Product Z", "SKU-Z", 1.00, 0, 0, Some("Acme")).await;

    let body = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    assert_eq!(body["message"], "All products are sufficiently stocked");

    // And no purchase order rows exist.
    let orders = app
        .request_json(Method::GET, "/api/v1/purchase-orders", None, StatusCode::OK)
        .await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn listing_returns_orders_newest_first() {
    let app = TestApp::new().await;

    create_product(&app, "Product A", "SKU-A", 5.00, 2, 10, Some("Acme")).await;
    let first = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let first_id = first[0]["id"].as_str().unwrap().to_string();

    // Receive the first order, then trigger a second one for another supplier.
    app.request_json(
        Method::POST,
        &format!("/api/v1/purchase-orders/{first_id}/receive"),
        None,
        StatusCode::OK,
    )
    .await;

    create_product(&app, "Product F", "SKU-F", 2.00, 0, 4, Some("Globex")).await;
    let second = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let second_id = second[0]["id"].as_str().unwrap().to_string();

    let listed = app
        .request_json(Method::GET, "/api/v1/purchase-orders", None, StatusCode::OK)
        .await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], second_id.as_str(), "newest first");
    assert_eq!(listed[1]["id"], first_id.as_str());

    // Items come back with their product summaries joined.
    assert_eq!(listed[0]["items"][0]["product"]["sku"], "SKU-F");
}

#[tokio::test]
async fn blank_supplier_collapses_into_default_bucket() {
    let app = TestApp::new().await;

    create_product(&app, "Product G", "SKU-G", 1.50, 0, 2, None).await;
    create_product(&app, "Product H", "SKU-H", 2.50, 1, 3, Some("")).await;

    let orders = app
        .request_json(
            Method::POST,
            "/api/v1/purchase-orders/replenish",
            None,
            StatusCode::CREATED,
        )
        .await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["supplier"], "Default Supplier");
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 2);
}
