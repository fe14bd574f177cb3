use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit row written once per restock action, never edited.
///
/// Invariant: `stock_after = stock_before + quantity_added`. Product and
/// acting-user fields are snapshots; the id columns are nullable
/// back-references for lookup only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restock_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,

    pub product_name: String,
    pub product_emoji: String,

    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub quantity_added: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub stock_before: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub stock_after: Decimal,

    #[sea_orm(nullable)]
    pub user_id: Option<Uuid>,

    /// Acting user's display name at restock time
    pub user_name: String,

    pub restock_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.restock_date {
                active_model.restock_date = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
