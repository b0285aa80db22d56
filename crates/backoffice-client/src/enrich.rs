//! Resolve product ids in order lines to product details

use crate::error::ClientResult;
use backoffice_core::{Order, Product, ProductRef};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::{debug, warn};

/// Source of product details
pub trait ProductLookup {
    /// Fetch one product by id
    fn lookup_product(
        &self,
        product_id: &str,
    ) -> impl Future<Output = ClientResult<Product>> + Send;
}

/// Replace every pending product reference with its details
///
/// Each distinct product id is looked up once, with at most `concurrency`
/// lookups in flight. A failed lookup turns only the affected lines into
/// [`ProductRef::Unavailable`]; order and line order are preserved.
pub async fn enrich_orders<L>(lookup: &L, mut orders: Vec<Order>, concurrency: usize) -> Vec<Order>
where
    L: ProductLookup + Sync,
{
    let pending: BTreeSet<String> = orders
        .iter()
        .flat_map(|order| order.order_items.iter())
        .filter_map(|item| match &item.product {
            Some(ProductRef::Pending(id)) => Some(id.clone()),
            _ => None,
        })
        .collect();

    if pending.is_empty() {
        return orders;
    }

    debug!(products = pending.len(), concurrency, "Resolving order products");

    let resolved: HashMap<String, Option<Product>> = stream::iter(pending)
        .map(|product_id| async move {
            let result = lookup.lookup_product(&product_id).await;
            (product_id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .map(|(product_id, result)| match result {
            Ok(product) => (product_id, Some(product)),
            Err(e) => {
                warn!(product_id = %product_id, error = %e, "Product lookup failed");
                (product_id, None)
            }
        })
        .collect()
        .await;

    for item in orders.iter_mut().flat_map(|order| order.order_items.iter_mut()) {
        if let Some(ProductRef::Pending(id)) = &item.product {
            let replacement = match resolved.get(id) {
                Some(Some(product)) => ProductRef::Resolved(product.clone()),
                _ => ProductRef::Unavailable(id.clone()),
            };
            item.product = Some(replacement);
        }
    }

    orders
}
