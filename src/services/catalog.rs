use crate::{
    entities::{
        product::{self, Entity as ProductEntity, Model as ProductModel},
        restock_record::{self, Entity as RestockRecordEntity, Model as RestockRecordModel},
        user::{Capability, Model as UserModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::authorize,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Concurrent restocks on the same product race on the stock compare-and-
/// swap; each loser re-reads and retries up to this many times.
const RESTOCK_CAS_ATTEMPTS: u32 = 3;

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[serde(default = "default_emoji")]
    pub emoji: String,

    pub barcode: Option<String>,

    pub price: Decimal,

    #[serde(default)]
    pub stock: Decimal,

    #[serde(default)]
    pub is_sold_by_weight: bool,
}

fn default_emoji() -> String {
    "🍬".to_string()
}

/// Input for updating a product. Stock is deliberately absent: the stock
/// column only moves through checkout and restock.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub is_sold_by_weight: Option<bool>,
}

/// Catalog service: product listing and maintenance plus the restock
/// action with its audit trail.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists products ordered by name, optionally narrowed by a
    /// case-insensitive substring match over name or barcode.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let mut query = ProductEntity::find().order_by_asc(product::Column::Name);

        if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim().to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Name,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Barcode,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        Ok(query.all(&*self.db).await?)
    }

    /// Fetches one product by id.
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Creates a product. Requires the manage-stock capability.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username, name = %input.name))]
    pub async fn create_product(
        &self,
        actor: &UserModel,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        authorize(actor, Capability::ManageStock)?;
        input.validate()?;
        validate_price(input.price)?;
        if input.stock < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }

        let product_id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            emoji: Set(input.emoji),
            barcode: Set(input.barcode),
            price: Set(input.price),
            stock: Set(input.stock.round_dp(3)),
            is_sold_by_weight: Set(input.is_sold_by_weight),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!(product_id = %product_id, "Product created");
        Ok(created)
    }

    /// Updates product fields other than stock.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username, product_id = %product_id))]
    pub async fn update_product(
        &self,
        actor: &UserModel,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        authorize(actor, Capability::ManageStock)?;
        input.validate()?;
        if let Some(price) = input.price {
            validate_price(price)?;
        }

        let product = self.get_product(product_id).await?;

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(emoji) = input.emoji {
            active.emoji = Set(emoji);
        }
        if let Some(barcode) = input.barcode {
            active.barcode = Set(Some(barcode));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(flag) = input.is_sold_by_weight {
            active.is_sold_by_weight = Set(flag);
        }

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        Ok(updated)
    }

    /// Adds stock to a product and writes the audit record.
    ///
    /// The stock write is a compare-and-swap conditional update so
    /// concurrent restocks and checkouts never lose an increment; the
    /// audit row commits in the same transaction as the winning swap, so
    /// `stock_before`/`stock_after` always match what actually happened.
    #[instrument(skip(self, actor), fields(actor = %actor.username, product_id = %product_id, quantity = %quantity))]
    pub async fn restock(
        &self,
        actor: &UserModel,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<RestockRecordModel, ServiceError> {
        authorize(actor, Capability::Restock)?;

        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        let quantity = quantity.round_dp(3);

        for attempt in 1..=RESTOCK_CAS_ATTEMPTS {
            let product = self.get_product(product_id).await?;
            let stock_before = product.stock;
            let stock_after = stock_before + quantity;

            let txn = self.db.begin().await?;

            let swapped = ProductEntity::update_many()
                .col_expr(product::Column::Stock, Expr::value(stock_after))
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::Id.eq(product_id))
                .filter(product::Column::Stock.eq(stock_before))
                .exec(&txn)
                .await?;

            if swapped.rows_affected == 0 {
                // Lost the swap to a concurrent writer; re-read and retry.
                txn.rollback().await?;
                warn!(
                    product_id = %product_id,
                    attempt,
                    "Restock lost a concurrent stock update, retrying"
                );
                continue;
            }

            let record = restock_record::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(Some(product.id)),
                product_name: Set(product.name.clone()),
                product_emoji: Set(product.emoji.clone()),
                quantity_added: Set(quantity),
                stock_before: Set(stock_before),
                stock_after: Set(stock_after),
                user_id: Set(Some(actor.id)),
                user_name: Set(actor.snapshot_name().to_string()),
                ..Default::default()
            };
            let record = record.insert(&txn).await?;

            txn.commit().await?;

            self.event_sender
                .send_or_log(Event::ProductRestocked {
                    product_id,
                    quantity_added: quantity,
                    stock_after,
                })
                .await;

            info!(
                product_id = %product_id,
                stock_before = %stock_before,
                stock_after = %stock_after,
                "Product restocked"
            );
            return Ok(record);
        }

        Err(ServiceError::Conflict(format!(
            "Product {} is being restocked concurrently, please retry",
            product_id
        )))
    }

    /// Lists the restock audit trail, newest first.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn list_restock_records(
        &self,
        actor: &UserModel,
    ) -> Result<Vec<RestockRecordModel>, ServiceError> {
        authorize(actor, Capability::Restock)?;

        Ok(RestockRecordEntity::find()
            .order_by_desc(restock_record::Column::RestockDate)
            .all(&*self.db)
            .await?)
    }
}

fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
