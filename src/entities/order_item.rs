use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item of a completed order.
///
/// Product name, emoji, price and weight flag are snapshots taken at
/// checkout so later product edits never alter history. `product_id` is a
/// nullable back-reference for lookup only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub order_id: Uuid,

    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,

    pub product_name: String,
    pub product_emoji: String,

    /// Price at order time
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub quantity: Decimal,

    pub is_sold_by_weight: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn item_total(&self) -> Decimal {
        self.price * self.quantity
    }

    pub fn unit_label(&self) -> &'static str {
        if self.is_sold_by_weight {
            "KGS"
        } else {
            "PCS"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn item_total_is_price_times_quantity() {
        let item = Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: None,
            product_name: "Donut".to_string(),
            product_emoji: "🍩".to_string(),
            price: dec!(2.49),
            quantity: dec!(3.000),
            is_sold_by_weight: false,
        };

        assert_eq!(item.item_total(), dec!(7.47));
        assert_eq!(item.unit_label(), "PCS");
    }
}
