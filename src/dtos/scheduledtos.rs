use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkingHourDto {
    #[validate(range(min = 0, max = 6, message = "Day of week must be 0 (Sunday) to 6 (Saturday)"))]
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceWorkingHoursDto {
    pub hours: Vec<WorkingHourDto>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceHolidaysDto {
    pub dates: Vec<NaiveDate>,
}
