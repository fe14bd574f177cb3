use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account entity for the user directory.
///
/// Accounts are soft-disabled (`is_enabled`) rather than deleted so that
/// order and audit snapshots keep a live back-reference for lookups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login name, unique across the directory
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: String,

    /// Display name used for snapshots on orders, attendance and audit rows
    pub name: String,

    /// Hex digest of the account password (verification seam only)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub monthly_salary: Decimal,

    pub is_enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
    #[sea_orm(has_many = "super::restock_record::Entity")]
    RestockRecords,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
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

/// Ordered privilege tiers. Higher tiers inherit every capability of the
/// tiers below them; the only strictly-Developer privilege is seeing
/// Developer accounts in user listings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "Developer")]
    Developer,
    #[sea_orm(string_value = "Admin")]
    Admin,
    #[sea_orm(string_value = "Moderator")]
    Moderator,
    #[sea_orm(string_value = "User")]
    User,
}

/// A named permission derived from role tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageUsers,
    ManageStock,
    UseAttendanceTracker,
    Restock,
    ViewReports,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ManageUsers => "manage-users",
            Capability::ManageStock => "manage-stock",
            Capability::UseAttendanceTracker => "attendance-tracker",
            Capability::Restock => "restock",
            Capability::ViewReports => "view-reports",
        };
        f.write_str(name)
    }
}

impl Role {
    /// Numeric privilege rank; higher means more privileged.
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Moderator => 1,
            Role::Admin => 2,
            Role::Developer => 3,
        }
    }

    /// Capability set per role. Adding a capability or a role is a
    /// one-line edit to this table.
    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Developer | Role::Admin => &[
                ManageUsers,
                ManageStock,
                UseAttendanceTracker,
                Restock,
                ViewReports,
            ],
            Role::Moderator => &[ManageStock, UseAttendanceTracker, Restock],
            Role::User => &[],
        }
    }

    pub fn grants(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl Model {
    /// Name recorded on denormalized snapshots: display name when present,
    /// username otherwise.
    pub fn snapshot_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    pub fn can_manage_users(&self) -> bool {
        self.can(Capability::ManageUsers)
    }

    pub fn can_manage_stock(&self) -> bool {
        self.can(Capability::ManageStock)
    }

    pub fn can_use_attendance_tracker(&self) -> bool {
        self.can(Capability::UseAttendanceTracker)
    }

    pub fn can_restock(&self) -> bool {
        self.can(Capability::Restock)
    }

    pub fn can_view_reports(&self) -> bool {
        self.can(Capability::ViewReports)
    }
}
