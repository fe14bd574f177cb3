use crate::{
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel},
        order_item::{Entity as OrderItemEntity, Model as OrderItemModel},
        user::{Capability, Model as UserModel},
    },
    errors::ServiceError,
    services::authorize,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Top selling product group (by snapshot name + emoji)
#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_name: String,
    pub product_emoji: String,
    pub total_sold: Decimal,
}

/// Sales aggregates over the whole order ledger
#[derive(Debug, Serialize)]
pub struct SalesReport {
    pub total_sales: Decimal,
    pub total_orders: u64,
    pub average_order_value: Decimal,
    pub total_items_sold: Decimal,
    pub last_7_days_sales: Decimal,
    pub top_products: Vec<TopProduct>,
}

/// Read-only reporting over the order ledger.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Builds the sales report as of now.
    pub async fn sales_report(&self, actor: &UserModel) -> Result<SalesReport, ServiceError> {
        self.sales_report_at(actor, Utc::now()).await
    }

    /// Builds the sales report with an explicit "now" for the trailing
    /// 7-day window.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn sales_report_at(
        &self,
        actor: &UserModel,
        now: DateTime<Utc>,
    ) -> Result<SalesReport, ServiceError> {
        authorize(actor, Capability::ViewReports)?;

        let orders = OrderEntity::find().all(&*self.db).await?;
        let items = OrderItemEntity::find().all(&*self.db).await?;

        Ok(build_report(&orders, &items, now))
    }

    /// Sum of order totals in the trailing 7 days only (the dashboard
    /// widget refreshes this more often than the full report).
    pub async fn last_7_days_sales(
        &self,
        actor: &UserModel,
        now: DateTime<Utc>,
    ) -> Result<Decimal, ServiceError> {
        authorize(actor, Capability::ViewReports)?;

        let window_start = now - Duration::days(7);
        let orders = OrderEntity::find()
            .filter(order::Column::OrderDate.gte(window_start))
            .all(&*self.db)
            .await?;

        Ok(orders.iter().map(|o| o.total).sum())
    }
}

fn build_report(
    orders: &[OrderModel],
    items: &[OrderItemModel],
    now: DateTime<Utc>,
) -> SalesReport {
    let total_sales: Decimal = orders.iter().map(|o| o.total).sum();
    let total_orders = orders.len() as u64;

    let average_order_value = if total_orders > 0 {
        (total_sales / Decimal::from(total_orders)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let total_items_sold: Decimal = items.iter().map(|i| i.quantity).sum();

    let window_start = now - Duration::days(7);
    let last_7_days_sales: Decimal = orders
        .iter()
        .filter(|o| o.order_date >= window_start)
        .map(|o| o.total)
        .sum();

    let mut sold_by_product: HashMap<(String, String), Decimal> = HashMap::new();
    for item in items {
        *sold_by_product
            .entry((item.product_name.clone(), item.product_emoji.clone()))
            .or_insert(Decimal::ZERO) += item.quantity;
    }

    let mut top_products: Vec<TopProduct> = sold_by_product
        .into_iter()
        .map(|((product_name, product_emoji), total_sold)| TopProduct {
            product_name,
            product_emoji,
            total_sold,
        })
        .collect();
    top_products.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
    top_products.truncate(10);

    SalesReport {
        total_sales,
        total_orders,
        average_order_value,
        total_items_sold,
        last_7_days_sales,
        top_products,
    }
}
