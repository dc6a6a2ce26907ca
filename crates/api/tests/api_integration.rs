//! Integration tests for the API server over the in-memory store.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cart_store::{InMemoryCatalog, InMemoryStore, ProductSnapshot};
use common::{Money, ProductId, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    store: InMemoryStore,
    widget: ProductId,
    gadget: ProductId,
}

fn setup() -> TestApp {
    let catalog = InMemoryCatalog::new();
    let widget = ProductId::new();
    let gadget = ProductId::new();
    catalog.insert(ProductSnapshot {
        id: widget,
        name: "Widget".to_string(),
        price: Money::from_cents(1000),
        image_url: Some("/img/widget.jpg".to_string()),
    });
    catalog.insert(ProductSnapshot {
        id: gadget,
        name: "Gadget".to_string(),
        price: Money::from_cents(500),
        image_url: None,
    });

    let store = InMemoryStore::new(catalog.clone());
    let state = api::create_state(store.clone(), catalog);
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        widget,
        gadget,
    }
}

fn request(method: &str, uri: &str, user: Option<UserId>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(api::auth::USER_ID_HEADER, user.to_string());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn add_to_cart(app: &Router, user: UserId, product: ProductId, quantity: i32) {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/cart/items",
            Some(user),
            Some(serde_json::json!({
                "product_id": product.to_string(),
                "quantity": quantity,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let response = t
        .app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let t = setup();

    let response = t
        .app
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cart_requires_authentication() {
    let t = setup();

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/cart", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // malformed user id is treated the same as no user
    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/cart")
                .header(api::auth::USER_ID_HEADER, "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_and_view_cart() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 2).await;
    add_to_cart(&t.app, user, t.gadget, 1).await;

    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(user), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Widget");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["line_total_cents"], 2000);
    assert_eq!(json["total_cents"], 2500);
}

#[tokio::test]
async fn test_add_merges_repeated_product() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 2).await;
    add_to_cart(&t.app, user, t.widget, 3).await;

    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(user), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
}

#[tokio::test]
async fn test_add_rejects_invalid_quantity() {
    let t = setup();
    let user = UserId::new();

    let response = t
        .app
        .oneshot(request(
            "POST",
            "/cart/items",
            Some(user),
            Some(serde_json::json!({
                "product_id": t.widget.to_string(),
                "quantity": 0,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("quantity"));
}

#[tokio::test]
async fn test_add_rejects_unknown_product() {
    let t = setup();
    let user = UserId::new();

    let response = t
        .app
        .oneshot(request(
            "POST",
            "/cart/items",
            Some(user),
            Some(serde_json::json!({
                "product_id": ProductId::new().to_string(),
                "quantity": 1,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 2).await;

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/cart", Some(user), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    let line_id = json["items"][0]["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/cart/items/{line_id}"),
            Some(user),
            Some(serde_json::json!({ "quantity": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);

    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(user), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert!(json["items"].as_array().unwrap().is_empty());
    assert_eq!(json["total_cents"], 0);
}

#[tokio::test]
async fn test_update_does_not_touch_other_users_lines() {
    let t = setup();
    let owner = UserId::new();
    let intruder = UserId::new();

    add_to_cart(&t.app, owner, t.widget, 2).await;

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/cart", Some(owner), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    let line_id = json["items"][0]["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/cart/items/{line_id}"),
            Some(intruder),
            Some(serde_json::json!({ "quantity": 99 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(owner), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_place_order_and_read_it_back() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 2).await;
    add_to_cart(&t.app, user, t.gadget, 1).await;

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some(user),
            Some(serde_json::json!({
                "shipping": {
                    "name": "Ada Lovelace",
                    "address": "12 Analytical Way",
                    "city": "London",
                    "zip": "N1 9GU"
                },
                "payment": {
                    "card_number": "4242424242424242",
                    "exp_date": "12/30",
                    "cvv": "123"
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    let order_id = json["order_id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["total_cents"], 2500);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let line_sum: i64 = items
        .iter()
        .map(|item| item["line_total_cents"].as_i64().unwrap())
        .sum();
    assert_eq!(line_sum, 2500);

    // the cart was drained by the commit
    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(user), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert!(json["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_place_order_works_without_body() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 1).await;

    let response = t
        .app
        .oneshot(request("POST", "/orders", Some(user), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_place_order_on_empty_cart_conflicts() {
    let t = setup();
    let user = UserId::new();

    let response = t
        .app
        .oneshot(request("POST", "/orders", Some(user), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_order_prices_survive_catalog_changes() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 2).await;
    let response = t
        .app
        .clone()
        .oneshot(request("POST", "/orders", Some(user), None))
        .await
        .unwrap();
    let order_id = json_body(response).await["order_id"]
        .as_str()
        .unwrap()
        .to_string();

    t.store.catalog().set_price(t.widget, Money::from_cents(9999));

    let response = t
        .app
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(user),
            None,
        ))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["total_cents"], 2000);
    assert_eq!(json["items"][0]["unit_price_cents"], 1000);
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let t = setup();
    let owner = UserId::new();
    let intruder = UserId::new();

    add_to_cart(&t.app, owner, t.widget, 1).await;
    let response = t
        .app
        .clone()
        .oneshot(request("POST", "/orders", Some(owner), None))
        .await
        .unwrap();
    let order_id = json_body(response).await["order_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(intruder),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .app
        .oneshot(request("GET", "/orders", Some(intruder), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_history_lists_newest_first() {
    let t = setup();
    let user = UserId::new();

    add_to_cart(&t.app, user, t.widget, 1).await;
    t.app
        .clone()
        .oneshot(request("POST", "/orders", Some(user), None))
        .await
        .unwrap();

    add_to_cart(&t.app, user, t.widget, 1).await;
    add_to_cart(&t.app, user, t.gadget, 2).await;
    t.app
        .clone()
        .oneshot(request("POST", "/orders", Some(user), None))
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(request("GET", "/orders", Some(user), None))
        .await
        .unwrap();
    let json = json_body(response).await;
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["item_count"], 2);
    assert_eq!(orders[1]["item_count"], 1);
}

#[tokio::test]
async fn test_product_browsing() {
    let t = setup();

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/products", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let products = json.as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Gadget");

    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/products/{}", t.widget),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["name"], "Widget");
    assert_eq!(json["price_cents"], 1000);

    let response = t
        .app
        .oneshot(request(
            "GET",
            &format!("/products/{}", ProductId::new()),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
