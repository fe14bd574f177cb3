use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Daily attendance entry with payroll hours.
///
/// At most one record exists per (user, date); the storage layer carries a
/// unique index on the pair as the last-resort guard behind the service's
/// duplicate pre-check.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Employee's display name at record time
    pub user_name: String,

    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub regular_hours: Decimal,

    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub overtime_hours: Decimal,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub daily_pay: Decimal,

    #[sea_orm(nullable)]
    pub check_in_time: Option<NaiveTime>,

    #[sea_orm(nullable)]
    pub check_out_time: Option<NaiveTime>,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
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
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}

/// Attendance status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "Present")]
    Present,
    #[sea_orm(string_value = "Absent")]
    Absent,
}

impl Model {
    /// Regular plus overtime hours.
    pub fn total_hours(&self) -> Decimal {
        self.regular_hours + self.overtime_hours
    }

    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}
