//! Core data types for the back office
//!
//! Wire names follow the REST API (`_id`, camelCase fields). Everything the
//! order list does not interpret is kept as pass-through payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Order identifier type
pub type OrderId = String;

/// Product identifier type
pub type ProductId = String;

/// Push message type announcing a freshly placed order
pub const NEW_ORDER: &str = "NEW_ORDER";

/// Order status enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation
    #[default]
    Pending,
    /// Confirmed by staff
    Confirmed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.pad("pending"),
            Self::Confirmed => f.pad("confirmed"),
        }
    }
}

/// User as embedded in orders, reviews and the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserSummary {
    /// User identifier
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role (admin, user, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Shipping address of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Street address
    #[serde(default)]
    pub address: String,
    /// City
    #[serde(default)]
    pub city: String,
    /// Postal code
    #[serde(default)]
    pub postal_code: String,
    /// Country
    #[serde(default)]
    pub country: String,
}

impl fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.address, self.city, self.postal_code, self.country
        )
    }
}

/// A catalogue product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Unit price
    #[serde(default)]
    pub price: f64,

    /// Category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,

    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cover: Option<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Product reference held by an order line
///
/// The orders endpoint only carries product ids; the fetch layer resolves
/// them. A lookup that failed leaves an [`ProductRef::Unavailable`] entry
/// behind instead of failing the whole list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireProductRef")]
pub enum ProductRef {
    /// Not resolved yet
    Pending(ProductId),
    /// Resolved product details
    Resolved(Product),
    /// Lookup failed
    Unavailable(ProductId),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireProductRef {
    Resolved(Product),
    Reference {
        #[serde(rename = "_id", alias = "id")]
        id: ProductId,
    },
    Id(ProductId),
}

impl From<WireProductRef> for ProductRef {
    fn from(wire: WireProductRef) -> Self {
        match wire {
            WireProductRef::Resolved(product) => Self::Resolved(product),
            WireProductRef::Reference { id } | WireProductRef::Id(id) => Self::Pending(id),
        }
    }
}

impl Serialize for ProductRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending(id) | Self::Unavailable(id) => serializer.serialize_str(id),
            Self::Resolved(product) => product.serialize(serializer),
        }
    }
}

impl ProductRef {
    /// Identifier of the referenced product
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Pending(id) | Self::Unavailable(id) => id,
            Self::Resolved(product) => &product.id,
        }
    }

    /// Resolved product, if any
    #[must_use]
    pub const fn product(&self) -> Option<&Product> {
        match self {
            Self::Resolved(product) => Some(product),
            Self::Pending(_) | Self::Unavailable(_) => None,
        }
    }

    /// Name to show for this line
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Resolved(product) => &product.name,
            Self::Pending(_) => "(loading)",
            Self::Unavailable(_) => "(unavailable product)",
        }
    }
}

/// One line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Line identifier
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    /// Ordered product
    #[serde(default)]
    pub product: Option<ProductRef>,

    /// Quantity ordered
    #[serde(default)]
    pub quantity: u32,
}

/// A customer order
///
/// Only `id`, `created_at` and `status` carry meaning for the order list;
/// the remaining fields are display payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,

    /// When the order was placed
    pub created_at: DateTime<Utc>,

    /// Current status
    #[serde(default)]
    pub status: OrderStatus,

    /// Ordering customer
    #[serde(default)]
    pub user: Option<UserSummary>,

    /// Order lines
    #[serde(default)]
    pub order_items: Vec<OrderItem>,

    /// Order total
    #[serde(default)]
    pub total_price: f64,

    /// Contact phone number
    #[serde(default, deserialize_with = "string_or_number")]
    pub mobile_number: Option<String>,

    /// Delivery address
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,

    /// Fields not interpreted by the client
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Order {
    /// Create a bare order, mainly useful for fixtures
    #[must_use]
    pub fn new(id: impl Into<OrderId>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            status: OrderStatus::Pending,
            user: None,
            order_items: Vec::new(),
            total_price: 0.0,
            mobile_number: None,
            shipping_address: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Ids of every product referenced by this order
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.order_items
            .iter()
            .filter_map(|item| item.product.as_ref().map(ProductRef::id))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Kind of a push channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushKind {
    /// A new order was placed
    NewOrder,
    /// Any type this client does not interpret
    Other(String),
}

/// Message delivered by the push channel
///
/// Wire form is `{ "type": string, "order"?: Order }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    /// Message type
    pub kind: PushKind,
    /// Order payload, present for well-formed `NEW_ORDER` messages
    pub order: Option<Order>,
}

#[derive(Deserialize)]
struct RawPushMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    order: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct WirePushMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a Order>,
}

impl PushMessage {
    /// Build a `NEW_ORDER` message
    #[must_use]
    pub const fn new_order(order: Order) -> Self {
        Self {
            kind: PushKind::NewOrder,
            order: Some(order),
        }
    }

    /// Build a message of an arbitrary type without payload
    #[must_use]
    pub fn other(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if kind == NEW_ORDER {
            return Self {
                kind: PushKind::NewOrder,
                order: None,
            };
        }
        Self {
            kind: PushKind::Other(kind),
            order: None,
        }
    }

    /// Parse a text frame from the push channel
    ///
    /// A `NEW_ORDER` frame whose order cannot be decoded still parses; it
    /// just carries no order and is ignored downstream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the frame is not a JSON
    /// object with a string `type` field.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let raw: RawPushMessage = serde_json::from_str(text)?;

        if raw.kind != NEW_ORDER {
            return Ok(Self::other(raw.kind));
        }

        let order = match raw.order {
            Some(value) => match serde_json::from_value::<Order>(value) {
                Ok(order) => Some(order),
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable order in NEW_ORDER message");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            kind: PushKind::NewOrder,
            order,
        })
    }

    /// Serialize to the wire form
    ///
    /// # Errors
    ///
    /// Returns an error if the order payload cannot be serialized.
    pub fn to_json(&self) -> crate::Result<String> {
        let wire = WirePushMessage {
            kind: self.type_name(),
            order: self.order.as_ref(),
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// The wire `type` value
    #[must_use]
    pub fn type_name(&self) -> &str {
        match &self.kind {
            PushKind::NewOrder => NEW_ORDER,
            PushKind::Other(kind) => kind,
        }
    }

    /// The newly arrived order, if this is a usable `NEW_ORDER` message
    #[must_use]
    pub fn arrived_order(&self) -> Option<&Order> {
        match self.kind {
            PushKind::NewOrder => self.order.as_ref(),
            PushKind::Other(_) => None,
        }
    }
}

/// A customer review
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    /// Author, missing for deleted accounts
    #[serde(default)]
    pub user: Option<UserSummary>,

    /// Reviewed product id
    #[serde(default)]
    pub product: Option<ProductId>,

    /// Rating from 1 to 5
    #[serde(default)]
    pub rating: u8,

    /// Review text
    #[serde(default)]
    pub review: String,

    /// When the review was written
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Sales statistics for one product category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductStat {
    /// Category label
    #[serde(default)]
    pub category: String,
    /// Units sold
    #[serde(default)]
    pub total_sales: f64,
    /// Products in the category
    #[serde(default)]
    pub count: u64,
    /// Average price
    #[serde(default)]
    pub avg_price: f64,
}

/// Product sold during a month, as listed in the monthly order plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProductDetail {
    /// Product name
    #[serde(default)]
    pub name: String,
    /// Category label
    #[serde(default)]
    pub categories: Option<String>,
    /// When the order line was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Orders placed in one month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyOrders {
    /// Month number, 1 to 12
    pub month: u32,
    /// Orders placed
    #[serde(default)]
    pub number_of_orders: u64,
    /// Products sold
    #[serde(default)]
    pub product_details: Vec<MonthlyProductDetail>,
}

/// Products created in one month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProducts {
    /// Month number, 1 to 12
    pub month: u32,
    /// Products created
    #[serde(default)]
    pub number_of_products_created: u64,
}

/// Authenticated session threaded through the API client
///
/// Lives from login to logout; nothing reads the token from ambient state.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    token: String,
    #[serde(default)]
    user: Option<UserSummary>,
}

impl Session {
    /// Create a session from a bearer token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if the token is blank.
    pub fn new(token: impl Into<String>) -> crate::Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(crate::Error::validation("token", "must not be empty"));
        }
        Ok(Self { token, user: None })
    }

    /// Attach the signed-in user
    #[must_use]
    pub fn with_user(mut self, user: UserSummary) -> Self {
        self.user = Some(user);
        self
    }

    /// Bearer token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Signed-in user, if known
    #[must_use]
    pub const fn user(&self) -> Option<&UserSummary> {
        self.user.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}
