use crate::{
    entities::{
        cart_item::{self, Entity as CartItemEntity},
        order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
        order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
        product::{self, Entity as ProductEntity},
        user::Model as UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{cart::CartLine, ensure_enabled},
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A completed checkout: the ledger row plus its line snapshots.
#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Checkout service: converts a cart into an immutable order, decrements
/// stock and clears the cart, all inside one transaction. A failure
/// partway leaves no trace (see DESIGN.md on the atomicity decision).
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Converts the user's cart into a completed order.
    ///
    /// Fails on an empty cart with no state change. Each product's stock
    /// is decremented with a single conditional statement guarded by
    /// `stock >= quantity`; a guard miss aborts the whole transaction with
    /// an insufficient-stock error, which both preserves the stock ≥ 0
    /// invariant and never loses a concurrent stock update.
    #[instrument(skip(self, actor), fields(user = %actor.username))]
    pub async fn checkout(&self, actor: &UserModel) -> Result<CheckoutOutcome, ServiceError> {
        ensure_enabled(actor)?;

        let txn = self.db.begin().await?;

        let rows = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .find_also_related(ProductEntity)
            .all(&txn)
            .await?;

        let lines: Vec<CartLine> = rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|product| CartLine { item, product }))
            .collect();

        if lines.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let (total, item_count) = order_totals(&lines);

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(Some(actor.id)),
            user_name: Set(actor.snapshot_name().to_string()),
            total: Set(total),
            item_count: Set(item_count),
            status: Set(OrderStatus::Completed),
            ..Default::default()
        };
        let order = order.insert(&txn).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let snapshot = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(Some(line.product.id)),
                product_name: Set(line.product.name.clone()),
                product_emoji: Set(line.product.emoji.clone()),
                price: Set(line.product.price),
                quantity: Set(line.item.quantity),
                is_sold_by_weight: Set(line.product.is_sold_by_weight),
            };
            items.push(snapshot.insert(&txn).await?);

            let decremented = ProductEntity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.item.quantity),
                )
                .filter(product::Column::Id.eq(line.product.id))
                .filter(product::Column::Stock.gte(line.item.quantity))
                .exec(&txn)
                .await?;

            if decremented.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} no longer has {} {} in stock",
                    line.product.name,
                    line.item.quantity,
                    line.product.unit_label()
                )));
            }
        }

        CartItemEntity::delete_many()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CheckoutCompleted {
                user_id: actor.id,
                order_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderCompleted(order_id))
            .await;

        info!(
            order_id = %order_id,
            total = %order.total,
            item_count = order.item_count,
            "Checkout completed"
        );

        Ok(CheckoutOutcome { order, items })
    }

    /// Lists orders visible to the actor: stock managers see the whole
    /// ledger, everyone else only their own orders.
    #[instrument(skip(self, actor), fields(user = %actor.username))]
    pub async fn list_orders(&self, actor: &UserModel) -> Result<Vec<OrderModel>, ServiceError> {
        ensure_enabled(actor)?;

        let mut query = OrderEntity::find().order_by_desc(order::Column::OrderDate);
        if !actor.can_manage_stock() {
            query = query.filter(order::Column::UserId.eq(actor.id));
        }

        Ok(query.all(&*self.db).await?)
    }

    /// Fetches one order, applying the same visibility rule as listing.
    pub async fn get_order(
        &self,
        actor: &UserModel,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        ensure_enabled(actor)?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !actor.can_manage_stock() && order.user_id != Some(actor.id) {
            // Hidden orders are indistinguishable from missing ones.
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        Ok(order)
    }

    /// Fetches the line snapshots of an order the actor may see.
    pub async fn get_order_items(
        &self,
        actor: &UserModel,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        self.get_order(actor, order_id).await?;

        Ok(OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }
}

/// Order totals from cart lines: sum of live item totals and the sum of
/// truncated-to-integer quantities (a fractional-weight item counts as its
/// integer part, not its weight).
fn order_totals(lines: &[CartLine]) -> (Decimal, i32) {
    let total: Decimal = lines.iter().map(CartLine::item_total).sum();
    let item_count: i32 = lines
        .iter()
        .map(|line| line.item.quantity.trunc().to_i32().unwrap_or(0))
        .sum();
    (total.round_dp(2), item_count)
}
