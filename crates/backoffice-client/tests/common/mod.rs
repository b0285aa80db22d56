//! Shared fixtures for client integration tests

#![allow(dead_code, unreachable_pub)]

use backoffice_client::ApiClient;
use backoffice_core::Session;
use serde_json::{Value, json};
use wiremock::MockServer;

/// Token every fixture client authenticates with
pub const TOKEN: &str = "test-token";

/// Start a mock API and a client pointed at it
pub async fn mock_api() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let session = Session::new(TOKEN).unwrap();
    let client = ApiClient::new(server.uri(), session);
    (server, client)
}

/// Order as served by `GET /api/orders`
pub fn order_json(id: &str, created_at: &str, products: &[&str]) -> Value {
    let items: Vec<Value> = products
        .iter()
        .enumerate()
        .map(|(i, product)| json!({ "_id": format!("{id}-i{i}"), "product": product, "quantity": i + 1 }))
        .collect();

    json!({
        "_id": id,
        "createdAt": created_at,
        "status": "pending",
        "user": { "_id": "u1", "name": "Amira" },
        "orderItems": items,
        "totalPrice": 42.0,
        "mobileNumber": "21600000",
        "shippingAddress": { "address": "1 Rue", "city": "Tunis", "postalCode": "1000", "country": "TN" }
    })
}

/// Product as served by `GET /api/products/:id`
pub fn product_json(id: &str, name: &str) -> Value {
    json!({ "_id": id, "name": name, "price": 19.5, "categories": "fouta" })
}
