//! Owner dashboard aggregates.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{Order, OrderState, Price, Product};

/// How an order's revenue is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevenueFormula {
    /// Unit price times quantity, summed over lines.
    #[default]
    PriceTimesQuantity,
    /// Unit price summed over lines, ignoring quantity.
    UnitPriceOnly,
}

impl RevenueFormula {
    #[must_use]
    pub fn order_revenue(self, order: &Order) -> Price {
        match self {
            Self::PriceTimesQuantity => order.total(),
            Self::UnitPriceOnly => order.items.iter().map(|item| item.price).sum(),
        }
    }
}

/// Sales for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: u32,
    pub revenue: Price,
}

/// Number of orders in a given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub state: OrderState,
    pub count: u32,
}

/// Revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: Price,
}

/// Headline numbers and chart series for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_revenue: Price,
    pub order_count: u32,
    pub pending_count: u32,
    pub product_count: u32,
    /// Seven entries ending at `today`, oldest first.
    pub daily_sales: Vec<DailySales>,
    /// One entry per order state, in declaration order.
    pub status_breakdown: Vec<StatusCount>,
}

const DAILY_WINDOW: u32 = 7;

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl DashboardSummary {
    /// Summarize with the default revenue formula.
    #[must_use]
    pub fn from_orders(orders: &[Order], products: &[Product], today: NaiveDate) -> Self {
        Self::with_formula(orders, products, today, RevenueFormula::default())
    }

    #[must_use]
    pub fn with_formula(
        orders: &[Order],
        products: &[Product],
        today: NaiveDate,
        formula: RevenueFormula,
    ) -> Self {
        let total_revenue = orders.iter().map(|o| formula.order_revenue(o)).sum();

        let mut daily_sales: Vec<DailySales> = (0..DAILY_WINDOW)
            .rev()
            .map(|days_back| DailySales {
                date: today - Duration::days(i64::from(days_back)),
                orders: 0,
                revenue: Price::ZERO,
            })
            .collect();
        for order in orders {
            let day = order.created_at.date_naive();
            if let Some(slot) = daily_sales.iter_mut().find(|d| d.date == day) {
                slot.orders += 1;
                slot.revenue = slot.revenue + formula.order_revenue(order);
            }
        }

        let status_breakdown = OrderState::ALL
            .iter()
            .map(|state| StatusCount {
                state: *state,
                count: count(orders.iter().filter(|o| o.state == *state).count()),
            })
            .collect();

        Self {
            total_revenue,
            order_count: count(orders.len()),
            pending_count: count(
                orders
                    .iter()
                    .filter(|o| o.state == OrderState::Pending)
                    .count(),
            ),
            product_count: count(products.len()),
            daily_sales,
            status_breakdown,
        }
    }
}

/// Revenue of orders in `state`, grouped by month, newest month first.
///
/// Only months with at least one matching order appear; at most `limit`
/// months are returned.
#[must_use]
pub fn monthly_revenue(
    orders: &[Order],
    state: OrderState,
    formula: RevenueFormula,
    limit: usize,
) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<(i32, u32), Price> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.state == state) {
        let key = (order.created_at.year(), order.created_at.month());
        let entry = months.entry(key).or_insert(Price::ZERO);
        *entry = *entry + formula.order_revenue(order);
    }

    months
        .into_iter()
        .rev()
        .take(limit)
        .map(|((year, month), revenue)| MonthlyRevenue {
            year,
            month,
            revenue,
        })
        .collect()
}

/// Total revenue of orders in `state`.
#[must_use]
pub fn revenue_in_state(orders: &[Order], state: OrderState, formula: RevenueFormula) -> Price {
    orders
        .iter()
        .filter(|o| o.state == state)
        .map(|o| formula.order_revenue(o))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{LineItem, OrderId, ProductId};

    fn order(y: i32, m: u32, d: u32, state: OrderState, lines: &[(&str, u32)]) -> Order {
        Order {
            id: OrderId::generate(),
            items: lines
                .iter()
                .map(|(price, quantity)| LineItem {
                    product_id: ProductId::generate(),
                    title: "Item".to_owned(),
                    price: price.parse().unwrap(),
                    quantity: *quantity,
                })
                .collect(),
            phone: "1".to_owned(),
            city: "Gondar".to_owned(),
            location: "Center".to_owned(),
            state,
            created_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_revenue_formulas() {
        let o = order(2024, 3, 10, OrderState::Pending, &[("100", 3), ("50", 1)]);
        assert_eq!(
            RevenueFormula::PriceTimesQuantity.order_revenue(&o),
            "350".parse().unwrap()
        );
        assert_eq!(
            RevenueFormula::UnitPriceOnly.order_revenue(&o),
            "150".parse().unwrap()
        );
    }

    #[test]
    fn test_summary_counts_and_breakdown() {
        let orders = vec![
            order(2024, 3, 10, OrderState::Pending, &[("100", 2)]),
            order(2024, 3, 9, OrderState::Delivered, &[("40", 1)]),
            order(2024, 1, 1, OrderState::Pending, &[("10", 1)]),
        ];
        let summary = DashboardSummary::from_orders(&orders, &[], today());

        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.product_count, 0);
        assert_eq!(summary.total_revenue, "250".parse().unwrap());

        assert_eq!(summary.status_breakdown.len(), 4);
        assert_eq!(summary.status_breakdown[0].state, OrderState::Pending);
        assert_eq!(summary.status_breakdown[0].count, 2);
        assert_eq!(summary.status_breakdown[3].state, OrderState::Cancelled);
        assert_eq!(summary.status_breakdown[3].count, 0);
    }

    #[test]
    fn test_daily_sales_window_oldest_first() {
        let orders = vec![
            order(2024, 3, 10, OrderState::Pending, &[("100", 1)]),
            order(2024, 3, 10, OrderState::Pending, &[("20", 2)]),
            order(2024, 3, 4, OrderState::Delivered, &[("5", 1)]),
            order(2024, 3, 3, OrderState::Delivered, &[("999", 1)]),
        ];
        let summary = DashboardSummary::from_orders(&orders, &[], today());

        assert_eq!(summary.daily_sales.len(), 7);
        assert_eq!(
            summary.daily_sales[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert_eq!(summary.daily_sales[0].revenue, "5".parse().unwrap());
        assert_eq!(summary.daily_sales[6].date, today());
        assert_eq!(summary.daily_sales[6].orders, 2);
        assert_eq!(summary.daily_sales[6].revenue, "140".parse().unwrap());
        assert_eq!(summary.daily_sales[3].revenue, Price::ZERO);
    }

    #[test]
    fn test_monthly_revenue_newest_first_and_limited() {
        let orders = vec![
            order(2023, 12, 5, OrderState::Delivered, &[("10", 1)]),
            order(2024, 2, 5, OrderState::Delivered, &[("20", 1)]),
            order(2024, 2, 6, OrderState::Delivered, &[("30", 1)]),
            order(2024, 3, 1, OrderState::Pending, &[("1000", 1)]),
        ];
        let months = monthly_revenue(
            &orders,
            OrderState::Delivered,
            RevenueFormula::default(),
            12,
        );
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 2));
        assert_eq!(months[0].revenue, "50".parse().unwrap());
        assert_eq!((months[1].year, months[1].month), (2023, 12));

        let limited = monthly_revenue(&orders, OrderState::Delivered, RevenueFormula::default(), 1);
        assert_eq!(limited.len(), 1);

        assert_eq!(
            revenue_in_state(&orders, OrderState::Delivered, RevenueFormula::default()),
            "60".parse().unwrap()
        );
    }
}
