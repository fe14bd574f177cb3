use crate::{
    entities::{
        cart_item::{self, Entity as CartItemEntity, Model as CartItemModel},
        product::{Entity as ProductEntity, Model as ProductModel},
        user::Model as UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::ensure_enabled,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A cart row joined with its live product.
///
/// Totals always use the live price; nothing is snapshotted until
/// checkout.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub item: CartItemModel,
    pub product: ProductModel,
}

impl CartLine {
    pub fn item_total(&self) -> Decimal {
        self.product.price * self.item.quantity
    }
}

/// Shopping cart service: pending selections per user, mutable until
/// checkout clears them.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the user's cart, merging into the existing row
    /// for the same product if there is one.
    ///
    /// A merge that would exceed the product's current stock fails with an
    /// insufficient-stock error. Stock is only checked here, never
    /// reserved; a concurrent stock change can still win.
    #[instrument(skip(self, actor), fields(user = %actor.username, product_id = %product_id, quantity = %quantity))]
    pub async fn add_item(
        &self,
        actor: &UserModel,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<CartItemModel, ServiceError> {
        ensure_enabled(actor)?;

        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        let quantity = quantity.round_dp(3);

        let txn = self.db.begin().await?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let item = if let Some(item) = existing {
            let new_quantity = item.quantity + quantity;
            if new_quantity > product.stock {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} has only {} {} in stock",
                    product.name,
                    product.stock,
                    product.unit_label()
                )));
            }

            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(new_quantity);
            active.update(&txn).await?
        } else {
            let row = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(actor.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                ..Default::default()
            };
            row.insert(&txn).await?
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id: actor.id,
                product_id,
            })
            .await;

        info!(quantity = %item.quantity, "Cart item added");
        Ok(item)
    }

    /// Sets the quantity of a cart row; zero or less removes the row.
    /// The new quantity is re-checked against current stock.
    #[instrument(skip(self, actor), fields(user = %actor.username, product_id = %product_id, quantity = %quantity))]
    pub async fn update_item_quantity(
        &self,
        actor: &UserModel,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        ensure_enabled(actor)?;

        if quantity <= Decimal::ZERO {
            self.remove_item(actor, product_id).await?;
            return Ok(None);
        }
        let quantity = quantity.round_dp(3);

        let txn = self.db.begin().await?;

        let item = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not in the cart", product_id))
            })?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if quantity > product.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "{} has only {} {} in stock",
                product.name,
                product.stock,
                product.unit_label()
            )));
        }

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(quantity);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        Ok(Some(updated))
    }

    /// Removes a product from the user's cart.
    #[instrument(skip(self, actor), fields(user = %actor.username, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        actor: &UserModel,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        ensure_enabled(actor)?;

        let deleted = CartItemEntity::delete_many()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id: actor.id,
                product_id,
            })
            .await;

        Ok(())
    }

    /// Returns the user's cart rows joined with their live products.
    #[instrument(skip(self, actor), fields(user = %actor.username))]
    pub async fn get_cart(&self, actor: &UserModel) -> Result<Vec<CartLine>, ServiceError> {
        ensure_enabled(actor)?;

        let rows = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(actor.id))
            .find_also_related(ProductEntity)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (item, product) in rows {
            match product {
                Some(product) => lines.push(CartLine { item, product }),
                None => {
                    // Orphaned row; nothing to price it against.
                    warn!(item_id = %item.id, "Cart row references a missing product, skipping");
                }
            }
        }

        Ok(lines)
    }

    /// Sum of item totals over the user's cart at live prices.
    pub async fn cart_total(&self, actor: &UserModel) -> Result<Decimal, ServiceError> {
        let lines = self.get_cart(actor).await?;
        Ok(lines.iter().map(CartLine::item_total).sum())
    }
}
