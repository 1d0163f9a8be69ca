// service/schedule_service.rs
//
// Write paths for working hours and holidays. The non-overlap invariant
// is checked here, across the whole submitted set including inactive
// rows, before anything is persisted.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    db::{
        consultantdb::{ConsultantExt, WorkingHourEntry},
        db::DBClient,
    },
    dtos::scheduledtos::WorkingHourDto,
    models::consultantmodel::{Holiday, WorkingHour},
    service::error::ServiceError,
};

/// Pairwise overlap check within each day, over active AND inactive rows:
/// an inactive interval still reserves its place in the set.
pub fn validate_working_hours(hours: &[WorkingHourDto]) -> Result<(), ServiceError> {
    for entry in hours {
        if !(0..=6).contains(&entry.day_of_week) {
            return Err(ServiceError::Validation(
                "Day of week must be 0 (Sunday) to 6 (Saturday)".to_string(),
            ));
        }
        if entry.start_time >= entry.end_time {
            return Err(ServiceError::Validation(
                "Working-hour start must be before its end".to_string(),
            ));
        }
    }

    for (i, a) in hours.iter().enumerate() {
        for b in &hours[i + 1..] {
            if a.day_of_week == b.day_of_week
                && a.start_time < b.end_time
                && b.start_time < a.end_time
            {
                return Err(ServiceError::Validation(format!(
                    "Working-hour intervals overlap on day {}",
                    a.day_of_week
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ScheduleService {
    db_client: Arc<DBClient>,
}

impl ScheduleService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn get_working_hours(
        &self,
        consultant_id: Uuid,
    ) -> Result<Vec<WorkingHour>, ServiceError> {
        Ok(self.db_client.get_working_hours(consultant_id).await?)
    }

    pub async fn replace_working_hours(
        &self,
        consultant_id: Uuid,
        hours: &[WorkingHourDto],
    ) -> Result<Vec<WorkingHour>, ServiceError> {
        validate_working_hours(hours)?;

        let entries: Vec<WorkingHourEntry> = hours
            .iter()
            .map(|h| WorkingHourEntry {
                day_of_week: h.day_of_week,
                start_time: h.start_time,
                end_time: h.end_time,
                is_active: h.is_active,
            })
            .collect();

        let saved = self
            .db_client
            .replace_working_hours(consultant_id, &entries)
            .await?;
        tracing::info!(
            "Replaced working hours for consultant {} ({} intervals)",
            consultant_id,
            saved.len()
        );
        Ok(saved)
    }

    pub async fn get_holidays(&self, consultant_id: Uuid) -> Result<Vec<Holiday>, ServiceError> {
        Ok(self.db_client.get_holidays(consultant_id).await?)
    }

    /// Bulk replace; every date must be today or later.
    pub async fn replace_holidays(
        &self,
        consultant_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<Vec<Holiday>, ServiceError> {
        let today = Utc::now().date_naive();
        if let Some(past) = dates.iter().find(|d| **d < today) {
            return Err(ServiceError::Validation(format!(
                "Holiday {} is in the past",
                past
            )));
        }

        let saved = self.db_client.replace_holidays(consultant_id, dates).await?;
        tracing::info!(
            "Replaced holidays for consultant {} ({} dates)",
            consultant_id,
            saved.len()
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn dto(day: i16, start: (u32, u32), end: (u32, u32), active: bool) -> WorkingHourDto {
        WorkingHourDto {
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            is_active: active,
        }
    }

    #[test]
    fn disjoint_intervals_pass() {
        let hours = vec![
            dto(1, (9, 0), (12, 0), true),
            dto(1, (13, 0), (17, 0), true),
            dto(2, (9, 0), (17, 0), true),
        ];
        assert!(validate_working_hours(&hours).is_ok());
    }

    #[test]
    fn adjacent_intervals_do_not_overlap() {
        let hours = vec![dto(1, (9, 0), (12, 0), true), dto(1, (12, 0), (15, 0), true)];
        assert!(validate_working_hours(&hours).is_ok());
    }

    #[test]
    fn overlap_is_rejected_even_when_one_side_is_inactive() {
        let hours = vec![
            dto(1, (9, 0), (12, 0), true),
            dto(1, (11, 0), (14, 0), false),
        ];
        assert!(validate_working_hours(&hours).is_err());
    }

    #[test]
    fn same_interval_on_different_days_passes() {
        let hours = vec![dto(1, (9, 0), (12, 0), true), dto(2, (9, 0), (12, 0), true)];
        assert!(validate_working_hours(&hours).is_ok());
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let hours = vec![dto(1, (12, 0), (9, 0), true)];
        assert!(validate_working_hours(&hours).is_err());
    }
}
