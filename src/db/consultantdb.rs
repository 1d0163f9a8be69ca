// db/consultantdb.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::consultantmodel::{Consultant, ConsultantService, Holiday, WorkingHour};

/// One row of a working-hours replacement set, already validated by the
/// schedule service.
#[derive(Debug, Clone)]
pub struct WorkingHourEntry {
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[async_trait]
pub trait ConsultantExt {
    async fn get_consultant(&self, consultant_id: Uuid) -> Result<Option<Consultant>, Error>;

    async fn get_consultant_by_user(&self, user_id: Uuid) -> Result<Option<Consultant>, Error>;

    async fn get_consultant_service(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ConsultantService>, Error>;

    /// Locks the consultant row for the duration of the transaction. Every
    /// booking write path acquires this lock first, which serializes all
    /// booking attempts for one consultant.
    async fn lock_consultant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
    ) -> Result<Option<Consultant>, Error>;

    async fn get_working_hours(&self, consultant_id: Uuid) -> Result<Vec<WorkingHour>, Error>;

    async fn get_active_working_hours_for_day(
        &self,
        consultant_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<WorkingHour>, Error>;

    async fn replace_working_hours(
        &self,
        consultant_id: Uuid,
        entries: &[WorkingHourEntry],
    ) -> Result<Vec<WorkingHour>, Error>;

    async fn is_holiday(&self, consultant_id: Uuid, date: NaiveDate) -> Result<bool, Error>;

    async fn get_holidays(&self, consultant_id: Uuid) -> Result<Vec<Holiday>, Error>;

    async fn replace_holidays(
        &self,
        consultant_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<Vec<Holiday>, Error>;
}

const CONSULTANT_COLUMNS: &str = r#"id, user_id, headline, hourly_rate, buffer_after_minutes,
    default_method, rating_avg, ratings_count, deleted_at, created_at, updated_at"#;

#[async_trait]
impl ConsultantExt for DBClient {
    async fn get_consultant(&self, consultant_id: Uuid) -> Result<Option<Consultant>, Error> {
        sqlx::query_as::<_, Consultant>(&format!(
            r#"SELECT {CONSULTANT_COLUMNS} FROM consultants WHERE id = $1 AND deleted_at IS NULL"#
        ))
        .bind(consultant_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_consultant_by_user(&self, user_id: Uuid) -> Result<Option<Consultant>, Error> {
        sqlx::query_as::<_, Consultant>(&format!(
            r#"SELECT {CONSULTANT_COLUMNS} FROM consultants WHERE user_id = $1 AND deleted_at IS NULL"#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_consultant_service(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ConsultantService>, Error> {
        sqlx::query_as::<_, ConsultantService>(
            r#"
            SELECT id, consultant_id, title, price, duration_minutes, buffer_after_minutes,
                   method, rating_avg, ratings_count, deleted_at, created_at, updated_at
            FROM consultant_services
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn lock_consultant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
    ) -> Result<Option<Consultant>, Error> {
        sqlx::query_as::<_, Consultant>(&format!(
            r#"SELECT {CONSULTANT_COLUMNS} FROM consultants
               WHERE id = $1 AND deleted_at IS NULL
               FOR UPDATE"#
        ))
        .bind(consultant_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn get_working_hours(&self, consultant_id: Uuid) -> Result<Vec<WorkingHour>, Error> {
        sqlx::query_as::<_, WorkingHour>(
            r#"
            SELECT id, consultant_id, day_of_week, start_time, end_time, is_active, created_at
            FROM working_hours
            WHERE consultant_id = $1
            ORDER BY day_of_week, start_time
            "#,
        )
        .bind(consultant_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_active_working_hours_for_day(
        &self,
        consultant_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<WorkingHour>, Error> {
        sqlx::query_as::<_, WorkingHour>(
            r#"
            SELECT id, consultant_id, day_of_week, start_time, end_time, is_active, created_at
            FROM working_hours
            WHERE consultant_id = $1 AND day_of_week = $2 AND is_active = true
            ORDER BY start_time
            "#,
        )
        .bind(consultant_id)
        .bind(day_of_week)
        .fetch_all(&self.pool)
        .await
    }

    async fn replace_working_hours(
        &self,
        consultant_id: Uuid,
        entries: &[WorkingHourEntry],
    ) -> Result<Vec<WorkingHour>, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM working_hours WHERE consultant_id = $1")
            .bind(consultant_id)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query_as::<_, WorkingHour>(
                r#"
                INSERT INTO working_hours (consultant_id, day_of_week, start_time, end_time, is_active)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, consultant_id, day_of_week, start_time, end_time, is_active, created_at
                "#,
            )
            .bind(consultant_id)
            .bind(entry.day_of_week)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.is_active)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn is_holiday(&self, consultant_id: Uuid, date: NaiveDate) -> Result<bool, Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM holidays
            WHERE consultant_id = $1 AND holiday_date = $2
            "#,
        )
        .bind(consultant_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn get_holidays(&self, consultant_id: Uuid) -> Result<Vec<Holiday>, Error> {
        sqlx::query_as::<_, Holiday>(
            r#"
            SELECT id, consultant_id, holiday_date, created_at
            FROM holidays
            WHERE consultant_id = $1
            ORDER BY holiday_date
            "#,
        )
        .bind(consultant_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn replace_holidays(
        &self,
        consultant_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<Vec<Holiday>, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM holidays WHERE consultant_id = $1")
            .bind(consultant_id)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(dates.len());
        for date in dates {
            let row = sqlx::query_as::<_, Holiday>(
                r#"
                INSERT INTO holidays (consultant_id, holiday_date)
                VALUES ($1, $2)
                ON CONFLICT (consultant_id, holiday_date) DO NOTHING
                RETURNING id, consultant_id, holiday_date, created_at
                "#,
            )
            .bind(consultant_id)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some(row) = row {
                saved.push(row);
            }
        }

        tx.commit().await?;
        Ok(saved)
    }
}
