use serde::{Deserialize, Serialize};

use time::Date;

use super::date::serialize_record_date;
use super::history::MealHistory;
use super::repo_types::DailyRecord;

/// Body of `POST /diet/save`.
#[derive(Debug, Deserialize)]
pub struct SaveDietRequest {
    pub date: String, // "2024-01-15"
    #[serde(rename = "type")]
    pub slot: String,
    pub food: String,
    pub calories: i64,
    #[serde(default)]
    pub timestamp: Option<i64>, // epoch millis
}

#[derive(Debug, Deserialize)]
pub struct DietRecordQuery {
    pub date: String,
}

/// Snapshot of a daily record as clients read it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietRecordResponse {
    #[serde(serialize_with = "serialize_record_date")]
    pub record_date: Date,
    #[serde(rename = "caloriesM")]
    pub calories_morning: i64,
    #[serde(rename = "caloriesL")]
    pub calories_lunch: i64,
    #[serde(rename = "caloriesD")]
    pub calories_dinner: i64,
    pub total_calories: i64,
    pub meal_details: MealHistory,
}

impl From<DailyRecord> for DietRecordResponse {
    fn from(r: DailyRecord) -> Self {
        Self {
            record_date: r.record_date,
            calories_morning: r.calories_morning,
            calories_lunch: r.calories_lunch,
            calories_dinner: r.calories_dinner,
            total_calories: r.total_calories(),
            meal_details: r.meal_history,
        }
    }
}
