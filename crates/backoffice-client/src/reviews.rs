//! Reviews joined with the catalogue entries they refer to

use backoffice_core::{Product, Review};
use serde::Serialize;
use std::collections::HashMap;

/// A review with its product resolved from the catalogue
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewedProduct {
    /// The review as returned by the API
    pub review: Review,
    /// Reviewed product, `None` when it is no longer in the catalogue
    pub product: Option<Product>,
}

impl ReviewedProduct {
    /// Product name, or the bare id when the product is gone
    #[must_use]
    pub fn product_label(&self) -> &str {
        match (&self.product, &self.review.product) {
            (Some(product), _) => &product.name,
            (None, Some(id)) => id,
            (None, None) => "-",
        }
    }
}

/// Attach catalogue products to reviews, keeping review order
#[must_use]
pub fn join_review_products(reviews: Vec<Review>, products: Vec<Product>) -> Vec<ReviewedProduct> {
    let catalogue: HashMap<String, Product> = products
        .into_iter()
        .map(|product| (product.id.clone(), product))
        .collect();

    reviews
        .into_iter()
        .map(|review| {
            let product = review
                .product
                .as_ref()
                .and_then(|id| catalogue.get(id).cloned());
            ReviewedProduct { review, product }
        })
        .collect()
}
