//! Plain-text rendering of the orders page for the terminal

use crate::controller::RowState;
use crate::view::{LoadState, PageView};
use backoffice_core::{Order, ProductRef, UserSummary};

/// Navigation label with the unseen count
#[must_use]
pub fn badge(unseen: usize) -> String {
    if unseen == 0 {
        "Orders".to_string()
    } else {
        format!("Orders (new: {unseen})")
    }
}

/// Who is signed in, as shown above the order list
#[must_use]
pub fn operator_line(user: Option<&UserSummary>) -> String {
    match user {
        Some(UserSummary {
            name,
            role: Some(role),
            ..
        }) => format!("Signed in as {name} ({role})"),
        Some(user) => format!("Signed in as {}", user.name),
        None => "No user connected".to_string(),
    }
}

/// Render one page as a table
#[must_use]
pub fn render_orders_page(page: &PageView) -> String {
    let mut out = badge(page.unseen_count);
    if page.page_count > 0 {
        out.push_str(&format!("  page {}/{}", page.page, page.page_count));
    }
    if !page.live {
        out.push_str("  [offline]");
    }
    out.push('\n');

    match &page.load_state {
        LoadState::Loading => {
            out.push_str("Loading orders...\n");
            return out;
        }
        LoadState::Failed(message) => {
            out.push_str(&format!("Error: {message}\n"));
            return out;
        }
        LoadState::Ready => {}
    }

    if page.rows.is_empty() {
        out.push_str("No orders\n");
        return out;
    }

    for (order, state) in &page.rows {
        out.push_str(&render_row(order, *state));
        out.push('\n');
    }
    out
}

fn render_row(order: &Order, state: RowState) -> String {
    let marker = match state {
        RowState::Unseen => '*',
        RowState::Viewed => ' ',
    };
    let customer = order.user.as_ref().map_or("-", |user| user.name.as_str());
    let items = order
        .order_items
        .iter()
        .map(|item| {
            let name = item.product.as_ref().map_or("-", ProductRef::display_name);
            format!("{name} x{}", item.quantity)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let address = order
        .shipping_address
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let total = format!("${:.2}", order.total_price);

    format!(
        "{marker} {:<24} {:<16} {total:>9} {:<9} {} | {} | {} | {}",
        order.id,
        customer,
        order.status,
        items,
        order.mobile_number.as_deref().unwrap_or("-"),
        order.created_at.format("%Y-%m-%d %H:%M"),
        address,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use backoffice_core::{OrderItem, Product};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample_order() -> Order {
        let mut order = Order::new("o1", Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).unwrap());
        order.user = Some(UserSummary {
            name: "Amira".to_string(),
            ..UserSummary::default()
        });
        order.total_price = 42.5;
        order.mobile_number = Some("21600000".to_string());
        order.order_items = vec![
            OrderItem {
                id: "i1".to_string(),
                product: Some(ProductRef::Resolved(Product {
                    id: "p1".to_string(),
                    name: "Fouta".to_string(),
                    price: 21.25,
                    categories: None,
                    description: None,
                    image_cover: None,
                    created_at: None,
                })),
                quantity: 2,
            },
            OrderItem {
                id: "i2".to_string(),
                product: Some(ProductRef::Unavailable("p2".to_string())),
                quantity: 1,
            },
        ];
        order
    }

    fn page(rows: Vec<(Order, RowState)>, load_state: LoadState) -> PageView {
        PageView {
            rows,
            page: 1,
            page_count: 1,
            unseen_count: 1,
            load_state,
            live: true,
        }
    }

    #[test]
    fn test_badge() {
        assert_eq!(badge(0), "Orders");
        assert_eq!(badge(3), "Orders (new: 3)");
    }

    #[test]
    fn test_operator_line() {
        let mut user = UserSummary {
            name: "Amira".to_string(),
            ..UserSummary::default()
        };
        assert_eq!(operator_line(Some(&user)), "Signed in as Amira");

        user.role = Some("admin".to_string());
        assert_eq!(operator_line(Some(&user)), "Signed in as Amira (admin)");
        assert_eq!(operator_line(None), "No user connected");
    }

    #[test]
    fn test_row_shows_order_details() {
        let text = render_orders_page(&page(
            vec![(sample_order(), RowState::Unseen)],
            LoadState::Ready,
        ));
        let row = text.lines().nth(1).unwrap();

        assert!(row.starts_with("* o1"));
        assert!(row.contains("Amira"));
        assert!(row.contains("$42.50"));
        assert!(row.contains("pending"));
        assert!(row.contains("Fouta x2, (unavailable product) x1"));
        assert!(row.contains("2024-03-01 10:05"));
    }

    #[test]
    fn test_header_and_states() {
        let loading = render_orders_page(&page(Vec::new(), LoadState::Loading));
        assert_eq!(loading, "Orders (new: 1)  page 1/1\nLoading orders...\n");

        let failed = render_orders_page(&page(Vec::new(), LoadState::Failed("boom".to_string())));
        assert!(failed.ends_with("Error: boom\n"));

        let mut empty = page(Vec::new(), LoadState::Ready);
        empty.page_count = 0;
        empty.live = false;
        assert_eq!(render_orders_page(&empty), "Orders (new: 1)  [offline]\nNo orders\n");
    }
}
