use crate::{
    entities::{
        attendance_record::{
            self, AttendanceStatus, Entity as AttendanceRecordEntity,
            Model as AttendanceRecordModel,
        },
        user::{self, Capability, Entity as UserEntity, Model as UserModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::authorize,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Input for recording a day of attendance
#[derive(Debug, Deserialize)]
pub struct CreateAttendanceInput {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub regular_hours: Decimal,
    #[serde(default)]
    pub overtime_hours: Decimal,
    #[serde(default)]
    pub daily_pay: Decimal,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

/// Per-user aggregates over one calendar month
#[derive(Debug, Serialize)]
pub struct MonthlyAttendanceSummary {
    pub user_id: Uuid,
    pub user_name: String,
    pub present_days: u32,
    pub absent_days: u32,
    pub total_hours: Decimal,
    pub total_pay: Decimal,
}

/// Attendance log service: daily presence records with payroll hours and
/// the monthly summary.
#[derive(Clone)]
pub struct AttendanceService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AttendanceService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records attendance for a user and date.
    ///
    /// The (user, date) pair is checked before writing so the caller gets
    /// a friendly conflict message; the storage unique index stays the
    /// real guard. When a concurrent insert wins the race between check
    /// and write, the constraint violation maps to the very same conflict
    /// error.
    #[instrument(skip(self, actor, input), fields(actor = %actor.username, user_id = %input.user_id, date = %input.date))]
    pub async fn create(
        &self,
        actor: &UserModel,
        input: CreateAttendanceInput,
    ) -> Result<AttendanceRecordModel, ServiceError> {
        authorize(actor, Capability::UseAttendanceTracker)?;

        // The duplicate check comes before any other validation: a repeat
        // submission must read as "already recorded", not "bad input".
        let existing = AttendanceRecordEntity::find()
            .filter(attendance_record::Column::UserId.eq(input.user_id))
            .filter(attendance_record::Column::Date.eq(input.date))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            warn!("Duplicate attendance record rejected by pre-check");
            return Err(ServiceError::Conflict(conflict_message(input.date)));
        }

        if input.regular_hours < Decimal::ZERO || input.overtime_hours < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Hours cannot be negative".to_string(),
            ));
        }
        if input.daily_pay < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Daily pay cannot be negative".to_string(),
            ));
        }

        let employee = UserEntity::find_by_id(input.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", input.user_id)))?;

        let record = attendance_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(employee.id),
            user_name: Set(employee.snapshot_name().to_string()),
            date: Set(input.date),
            status: Set(input.status),
            regular_hours: Set(input.regular_hours),
            overtime_hours: Set(input.overtime_hours),
            daily_pay: Set(input.daily_pay),
            check_in_time: Set(input.check_in_time),
            check_out_time: Set(input.check_out_time),
            notes: Set(input.notes),
            ..Default::default()
        };

        let created = match record.insert(&*self.db).await {
            Ok(model) => model,
            Err(err) => {
                // A concurrent insert won the race between check and write;
                // the caller must not be able to tell the two paths apart.
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    warn!("Duplicate attendance record rejected by unique constraint");
                    return Err(ServiceError::Conflict(conflict_message(input.date)));
                }
                return Err(ServiceError::DatabaseError(err));
            }
        };

        self.event_sender
            .send_or_log(Event::AttendanceRecorded {
                user_id: created.user_id,
                date: created.date,
            })
            .await;

        info!(record_id = %created.id, "Attendance recorded");
        Ok(created)
    }

    /// Lists attendance records, newest date first, optionally for one user.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn list(
        &self,
        actor: &UserModel,
        user_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceRecordModel>, ServiceError> {
        authorize(actor, Capability::UseAttendanceTracker)?;

        let mut query =
            AttendanceRecordEntity::find().order_by_desc(attendance_record::Column::Date);
        if let Some(user_id) = user_id {
            query = query.filter(attendance_record::Column::UserId.eq(user_id));
        }

        Ok(query.all(&*self.db).await?)
    }

    /// Aggregates one calendar month per enabled user. Users with no
    /// records that month still appear, with all-zero aggregates.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub async fn monthly_summary(
        &self,
        actor: &UserModel,
        year: i32,
        month: u32,
    ) -> Result<Vec<MonthlyAttendanceSummary>, ServiceError> {
        authorize(actor, Capability::UseAttendanceTracker)?;

        let (month_start, month_end) = month_bounds(year, month).ok_or_else(|| {
            ServiceError::ValidationError(format!("Invalid month: {}-{:02}", year, month))
        })?;

        let users = UserEntity::find()
            .filter(user::Column::IsEnabled.eq(true))
            .order_by_asc(user::Column::Username)
            .all(&*self.db)
            .await?;

        let records = AttendanceRecordEntity::find()
            .filter(attendance_record::Column::Date.gte(month_start))
            .filter(attendance_record::Column::Date.lt(month_end))
            .all(&*self.db)
            .await?;

        let mut by_user: HashMap<Uuid, Vec<&AttendanceRecordModel>> = HashMap::new();
        for record in &records {
            by_user.entry(record.user_id).or_default().push(record);
        }

        let summaries = users
            .iter()
            .map(|user| {
                let user_records = by_user.get(&user.id).map(Vec::as_slice).unwrap_or(&[]);

                let present_days = user_records.iter().filter(|r| r.is_present()).count() as u32;
                let absent_days = user_records.len() as u32 - present_days;
                let total_hours = user_records.iter().map(|r| r.total_hours()).sum();
                let total_pay = user_records.iter().map(|r| r.daily_pay).sum();

                MonthlyAttendanceSummary {
                    user_id: user.id,
                    user_name: user.snapshot_name().to_string(),
                    present_days,
                    absent_days,
                    total_hours,
                    total_pay,
                }
            })
            .collect();

        Ok(summaries)
    }
}

fn conflict_message(date: NaiveDate) -> String {
    format!(
        "Attendance record already exists for this employee on {}",
        date
    )
}

/// Half-open [first day, first day of next month) range for a year-month.
fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}
