//! HTTP client for communicating with the back-office API

use crate::dashboard::{MonthlyActivity, merge_monthly_activity};
use crate::enrich::{ProductLookup, enrich_orders};
use crate::error::{ClientError, ClientResult};
use crate::reviews::{ReviewedProduct, join_review_products};
use backoffice_core::config::ApiConfig;
use backoffice_core::types::{MonthlyOrders, MonthlyProducts, ProductStat};
use backoffice_core::{Order, Product, Review, Session};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// `{ "data": ... }` wrapper used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Documents<T> {
    documents: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Plan<T> {
    plan: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Reviews {
    reviews: Vec<Review>,
}

/// Product payload, wrapped as `{ product }` by some endpoints
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductPayload {
    Wrapped { product: Product },
    Bare(Product),
}

impl From<ProductPayload> for Product {
    fn from(payload: ProductPayload) -> Self {
        match payload {
            ProductPayload::Wrapped { product } | ProductPayload::Bare(product) => product,
        }
    }
}

/// Editable product fields
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductUpdate {
    /// New name
    pub name: String,
    /// New price
    pub price: f64,
}

/// Fields of a product to create
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Category label
    pub categories: String,
    /// Unit price
    pub price: f64,
    /// Long description
    pub description: String,
    /// Cover image URL
    pub image_cover: String,
}

/// API client for making HTTP requests to the back-office API
///
/// Every request carries the session's bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
    max_concurrent_lookups: usize,
}

impl ApiClient {
    /// Create a new API client with default transport settings
    #[must_use]
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            max_concurrent_lookups: ApiConfig::default().max_concurrent_lookups,
        }
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig, session: Session) -> ClientResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Configuration {
                message: "api.base_url must not be empty".to_string(),
            });
        }

        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            max_concurrent_lookups: config.max_concurrent_lookups.max(1),
        })
    }

    /// Current session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(self.session.token())
    }

    async fn send(request: RequestBuilder, endpoint: &str) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!(endpoint, status = status.as_u16(), "API returned error status");
            return Err(ClientError::from_status(status, endpoint));
        }

        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        request: RequestBuilder,
        endpoint: &str,
    ) -> ClientResult<T> {
        let response = Self::send(request, endpoint).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// List all orders as returned by the API, product ids unresolved
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        let request = self.request(Method::GET, "/api/orders");
        let envelope: Envelope<Vec<Order>> = Self::fetch_json(request, "GET /api/orders").await?;

        debug!(count = envelope.data.len(), "Fetched orders");
        Ok(envelope.data)
    }

    /// List all orders with every order line resolved to product details
    ///
    /// A failed product lookup leaves a placeholder for that line only.
    ///
    /// # Errors
    ///
    /// Returns an error if the order list itself cannot be fetched.
    #[instrument(skip(self))]
    pub async fn fetch_enriched_orders(&self) -> ClientResult<Vec<Order>> {
        let orders = self.list_orders().await?;
        Ok(enrich_orders(self, orders, self.max_concurrent_lookups).await)
    }

    /// Get a single product
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn get_product(&self, product_id: &str) -> ClientResult<Product> {
        let path = format!("/api/products/{}", urlencoding::encode(product_id));
        let request = self.request(Method::GET, &path);
        let envelope: Envelope<ProductPayload> =
            Self::fetch_json(request, "GET /api/products/:id").await?;

        Ok(envelope.data.into())
    }

    /// Mark an order as confirmed
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects it.
    #[instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: &str) -> ClientResult<()> {
        let path = format!("/api/orders/{}", urlencoding::encode(order_id));
        let request = self
            .request(Method::PATCH, &path)
            .json(&serde_json::json!({}));

        Self::send(request, "PATCH /api/orders/:id").await?;
        info!(order_id, "Order confirmed");
        Ok(())
    }

    /// Delete an order
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects it.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        let path = format!("/api/orders/{}", urlencoding::encode(order_id));

        Self::send(self.request(Method::DELETE, &path), "DELETE /api/orders/:id")
            .await?;
        info!(order_id, "Order deleted");
        Ok(())
    }

    /// List catalogue products
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn list_products(&self) -> ClientResult<Vec<Product>> {
        let request = self.request(Method::GET, "/api/products");
        let envelope: Envelope<Documents<Product>> =
            Self::fetch_json(request, "GET /api/products").await?;

        Ok(envelope.data.documents)
    }

    /// Update a product's name and price
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects it.
    pub async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
    ) -> ClientResult<()> {
        let path = format!("/api/products/{}", urlencoding::encode(product_id));
        let request = self.request(Method::PATCH, &path).json(update);

        Self::send(request, "PATCH /api/products/:id").await?;
        Ok(())
    }

    /// Delete a product
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects it.
    pub async fn delete_product(&self, product_id: &str) -> ClientResult<()> {
        let path = format!("/api/products/{}", urlencoding::encode(product_id));

        Self::send(self.request(Method::DELETE, &path), "DELETE /api/products/:id")
            .await?;
        Ok(())
    }

    /// Create a product through the multipart form endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn create_product(&self, product: &NewProduct) -> ClientResult<Product> {
        let form = reqwest::multipart::Form::new()
            .text("name", product.name.clone())
            .text("categories", product.categories.clone())
            .text("price", product.price.to_string())
            .text("description", product.description.clone())
            .text("imageCover", product.image_cover.clone());

        let request = self.request(Method::POST, "/api/products").multipart(form);
        let envelope: Envelope<ProductPayload> =
            Self::fetch_json(request, "POST /api/products").await?;

        Ok(envelope.data.into())
    }

    /// Sales statistics per category
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn product_stats(&self) -> ClientResult<Vec<ProductStat>> {
        let request = self.request(Method::GET, "/api/products/product-stats");
        let envelope: Envelope<Vec<ProductStat>> =
            Self::fetch_json(request, "GET /api/products/product-stats").await?;

        Ok(envelope.data)
    }

    /// Orders placed per month of `year`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn monthly_orders(&self, year: i32) -> ClientResult<Vec<MonthlyOrders>> {
        let path = format!("/api/orders/monthly-plan/{year}");
        let request = self.request(Method::GET, &path);
        let envelope: Envelope<Plan<MonthlyOrders>> =
            Self::fetch_json(request, "GET /api/orders/monthly-plan/:year").await?;

        Ok(envelope.data.plan)
    }

    /// Products created per month of `year`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn monthly_products(&self, year: i32) -> ClientResult<Vec<MonthlyProducts>> {
        let path = format!("/api/products/monthly-plan/{year}");
        let request = self.request(Method::GET, &path);
        let envelope: Envelope<Plan<MonthlyProducts>> =
            Self::fetch_json(request, "GET /api/products/monthly-plan/:year").await?;

        Ok(envelope.data.plan)
    }

    /// Twelve-month dashboard series combining both monthly plans
    ///
    /// # Errors
    ///
    /// Returns an error if either plan cannot be fetched.
    #[instrument(skip(self))]
    pub async fn monthly_activity(&self, year: i32) -> ClientResult<Vec<MonthlyActivity>> {
        let (orders, products) =
            futures::try_join!(self.monthly_orders(year), self.monthly_products(year))?;

        Ok(merge_monthly_activity(orders, &products))
    }

    /// List all reviews
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn list_reviews(&self) -> ClientResult<Vec<Review>> {
        let request = self.request(Method::GET, "/api/reviews");
        let envelope: Envelope<Reviews> = Self::fetch_json(request, "GET /api/reviews").await?;

        Ok(envelope.data.reviews)
    }

    /// List all reviews with their products resolved from the catalogue
    ///
    /// # Errors
    ///
    /// Returns an error if either the reviews or the products cannot be fetched.
    #[instrument(skip(self))]
    pub async fn reviews_with_products(&self) -> ClientResult<Vec<ReviewedProduct>> {
        let (reviews, products) = futures::try_join!(self.list_reviews(), self.list_products())?;

        Ok(join_review_products(reviews, products))
    }

    /// Delete a review
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects it.
    pub async fn delete_review(&self, review_id: &str) -> ClientResult<()> {
        let path = format!("/api/reviews/{}", urlencoding::encode(review_id));

        Self::send(self.request(Method::DELETE, &path), "DELETE /api/reviews/:id")
            .await?;
        Ok(())
    }

    /// End the session on the server
    ///
    /// The client is consumed; a new session means a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API does not acknowledge the logout. The
    /// session is dropped either way.
    #[instrument(skip(self))]
    pub async fn logout(self) -> ClientResult<()> {
        Self::send(
            self.request(Method::POST, "/api/users/logout"),
            "POST /api/users/logout",
        )
        .await?;
        info!("Logged out");
        Ok(())
    }
}

impl ProductLookup for ApiClient {
    async fn lookup_product(&self, product_id: &str) -> ClientResult<Product> {
        self.get_product(product_id).await
    }
}
