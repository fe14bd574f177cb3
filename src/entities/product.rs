use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Product entity.
///
/// `stock` is the single mutable quantity of record: it only changes
/// through checkout (decrement) and restock (increment).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Emoji shown next to the product name
    pub emoji: String,

    /// Barcode, an optional lookup key
    #[sea_orm(nullable)]
    pub barcode: Option<String>,

    /// Unit price, strictly positive
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,

    /// Quantity on hand; fractional to 3 decimals for weighed goods
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub stock: Decimal,

    /// Sold by weight (KGS) instead of by piece (PCS)
    pub is_sold_by_weight: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::restock_record::Entity")]
    RestockRecords,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::restock_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RestockRecords.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

impl Model {
    /// Unit label for quantity display.
    pub fn unit_label(&self) -> &'static str {
        if self.is_sold_by_weight {
            "KGS"
        } else {
            "PCS"
        }
    }
}
