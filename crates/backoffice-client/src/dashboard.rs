//! Yearly dashboard series built from the monthly plans

use backoffice_core::types::{MonthlyOrders, MonthlyProductDetail, MonthlyProducts};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Activity for one calendar month
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyActivity {
    /// Month number, 1 to 12
    pub month: u32,
    /// English month name
    pub name: &'static str,
    /// Orders placed
    pub orders: u64,
    /// Products created
    pub products_created: u64,
    /// Products sold, oldest first
    pub sold: Vec<MonthlyProductDetail>,
}

impl MonthlyActivity {
    /// Name of the product sold most often this month
    ///
    /// Ties go to the product that was sold first.
    #[must_use]
    pub fn most_ordered(&self) -> Option<&str> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, detail) in self.sold.iter().enumerate() {
            counts.entry(detail.name.as_str()).or_insert((0, position)).0 += 1;
        }

        counts
            .into_iter()
            .max_by_key(|&(_, (count, first))| (count, Reverse(first)))
            .map(|(name, _)| name)
    }
}

/// Combine both monthly plans into a January to December series
///
/// Months absent from the API responses count as zero. Entries with a
/// month outside 1..=12 are ignored.
#[must_use]
pub fn merge_monthly_activity(
    orders: Vec<MonthlyOrders>,
    products: &[MonthlyProducts],
) -> Vec<MonthlyActivity> {
    let mut series: Vec<MonthlyActivity> = (1..=12u32)
        .zip(MONTH_NAMES)
        .map(|(month, name)| MonthlyActivity {
            month,
            name,
            orders: 0,
            products_created: 0,
            sold: Vec::new(),
        })
        .collect();

    for plan in orders {
        if let Some(entry) = slot(&mut series, plan.month) {
            entry.orders += plan.number_of_orders;
            entry.sold.extend(plan.product_details);
        }
    }

    for plan in products {
        if let Some(entry) = slot(&mut series, plan.month) {
            entry.products_created += plan.number_of_products_created;
        }
    }

    for entry in &mut series {
        entry.sold.sort_by_key(|detail| detail.created_at);
    }

    series
}

fn slot(series: &mut [MonthlyActivity], month: u32) -> Option<&mut MonthlyActivity> {
    let index = usize::try_from(month.checked_sub(1)?).ok()?;
    series.get_mut(index)
}
