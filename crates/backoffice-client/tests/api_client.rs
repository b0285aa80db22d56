//! Integration tests for the REST client against a mock API

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]

mod common;

use backoffice_client::{ClientError, NewProduct, ProductUpdate};
use backoffice_core::ProductRef;
use common::{TOKEN, mock_api, order_json, product_json};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_list_orders_sends_bearer_token() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [order_json("o1", "2024-03-01T10:00:00Z", &["p1"])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orders = client.list_orders().await.unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, "o1");
    assert_eq!(
        orders[0].order_items[0].product,
        Some(ProductRef::Pending("p1".to_string()))
    );
}

#[tokio::test]
async fn test_enriched_orders_keep_placeholder_for_failed_lookup() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                order_json("o1", "2024-03-01T10:00:00Z", &["p1", "gone"]),
                order_json("o2", "2024-03-02T10:00:00Z", &["p1"])
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/products/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "product": product_json("p1", "Fouta") } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/products/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let orders = client.fetch_enriched_orders().await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(
        orders[0].order_items[0].product.as_ref().unwrap().display_name(),
        "Fouta"
    );
    assert_eq!(
        orders[0].order_items[1].product,
        Some(ProductRef::Unavailable("gone".to_string()))
    );
    assert_eq!(
        orders[1].order_items[0].product.as_ref().unwrap().display_name(),
        "Fouta"
    );
}

#[tokio::test]
async fn test_order_list_failure_is_reported() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.fetch_enriched_orders().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": [] })))
        .mount(&server)
        .await;

    let err = client.list_orders().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn test_confirm_and_delete_hit_order_resource() {
    let (server, client) = mock_api().await;

    Mock::given(method("PATCH"))
        .and(path("/api/orders/o1"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/orders/o2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.confirm_order("o1").await.unwrap();
    client.delete_order("o2").await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_order_is_not_found() {
    let (server, client) = mock_api().await;

    Mock::given(method("DELETE"))
        .and(path("/api/orders/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.delete_order("nope").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
}

#[tokio::test]
async fn test_product_endpoints() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "documents": [product_json("p1", "Fouta"), product_json("p2", "Chechia")] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/products/p1"))
        .and(body_json(json!({ "name": "Fouta XL", "price": 25.0 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/products"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": { "product": product_json("p3", "Kilim") } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let products = client.list_products().await.unwrap();
    assert_eq!(products.len(), 2);

    client
        .update_product(
            "p1",
            &ProductUpdate {
                name: "Fouta XL".to_string(),
                price: 25.0,
            },
        )
        .await
        .unwrap();

    let created = client
        .create_product(&NewProduct {
            name: "Kilim".to_string(),
            categories: "rugs".to_string(),
            price: 120.0,
            description: "Hand woven".to_string(),
            image_cover: "https://cdn.example.test/kilim.jpg".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "p3");
}

#[tokio::test]
async fn test_reviews_and_stats() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "reviews": [{ "_id": "r1", "product": "p1", "rating": 5, "review": "Lovely" }] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/reviews/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/products/product-stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "category": "fouta", "totalSales": 12, "count": 2, "avgPrice": 18.0 }]
        })))
        .mount(&server)
        .await;

    let reviews = client.list_reviews().await.unwrap();
    assert_eq!(reviews[0].rating, 5);
    client.delete_review("r1").await.unwrap();

    let stats = client.product_stats().await.unwrap();
    assert_eq!(stats[0].category, "fouta");
    assert_eq!(stats[0].avg_price, 18.0);
}

#[tokio::test]
async fn test_reviews_are_joined_with_catalogue() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "reviews": [
                { "_id": "r1", "product": "p1", "rating": 5, "review": "Lovely" },
                { "_id": "r2", "product": "p9", "rating": 2, "review": "Gone" }
            ] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "documents": [product_json("p1", "Fouta")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let joined = client.reviews_with_products().await.unwrap();

    assert_eq!(joined.len(), 2);
    assert_eq!(joined[0].product_label(), "Fouta");
    assert_eq!(joined[1].product_label(), "p9");
}

#[tokio::test]
async fn test_monthly_activity_combines_plans() {
    let (server, client) = mock_api().await;

    Mock::given(method("GET"))
        .and(path("/api/orders/monthly-plan/2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "plan": [{ "month": 2, "numberOfOrders": 4, "productDetails": [] }] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/products/monthly-plan/2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "plan": [{ "month": 2, "numberOfProductsCreated": 3 }] }
        })))
        .mount(&server)
        .await;

    let series = client.monthly_activity(2024).await.unwrap();

    assert_eq!(series.len(), 12);
    assert_eq!(series[1].orders, 4);
    assert_eq!(series[1].products_created, 3);
}

#[tokio::test]
async fn test_logout_posts_to_users_endpoint() {
    let (server, client) = mock_api().await;

    Mock::given(method("POST"))
        .and(path("/api/users/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();
}
