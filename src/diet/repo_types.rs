use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use super::history::{MealHistory, MealSlot};
use crate::error::DietError;

/// Identity of a daily record: one per user per calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub user_idx: i64,
    pub date: Date,
}

impl RecordKey {
    pub fn new(user_idx: i64, date: Date) -> Self {
        Self { user_idx, date }
    }
}

/// Aggregate of one user's food intake for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub id: Uuid,
    pub user_idx: i64,
    pub record_date: Date,
    pub calories_morning: i64,
    pub calories_lunch: i64,
    pub calories_dinner: i64,
    pub meal_history: MealHistory,
    /// Bumped by every stored write; 0 means never stored.
    pub version: i64,
}

impl DailyRecord {
    /// Zeroed, unsaved record returned by reads that find nothing.
    pub fn blank(key: RecordKey) -> Self {
        Self {
            id: Uuid::nil(),
            user_idx: key.user_idx,
            record_date: key.date,
            calories_morning: 0,
            calories_lunch: 0,
            calories_dinner: 0,
            meal_history: MealHistory::default(),
            version: 0,
        }
    }

    pub fn calories(&self, slot: MealSlot) -> i64 {
        match slot {
            MealSlot::Morning => self.calories_morning,
            MealSlot::Lunch => self.calories_lunch,
            MealSlot::Dinner => self.calories_dinner,
        }
    }

    pub fn calories_mut(&mut self, slot: MealSlot) -> &mut i64 {
        match slot {
            MealSlot::Morning => &mut self.calories_morning,
            MealSlot::Lunch => &mut self.calories_lunch,
            MealSlot::Dinner => &mut self.calories_dinner,
        }
    }

    pub fn total_calories(&self) -> i64 {
        self.calories_morning
            .saturating_add(self.calories_lunch)
            .saturating_add(self.calories_dinner)
    }

    /// Every slot accumulator equals the sum of that slot's entries.
    pub fn is_consistent(&self) -> bool {
        MealSlot::ALL
            .iter()
            .all(|&slot| self.meal_history.slot_total(slot) == Some(self.calories(slot)))
    }
}

#[cfg(test)]
impl DailyRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.user_idx, self.record_date)
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }
}

#[derive(Debug, FromRow)]
pub struct DailyRecordRow {
    pub id: Uuid,
    pub customer_idx: i64,
    pub record_date: Date,
    pub calories_morning: Option<i64>,
    pub calories_lunch: Option<i64>,
    pub calories_dinner: Option<i64>,
    pub meal_details: Option<serde_json::Value>,
    pub version: i64,
}

impl TryFrom<DailyRecordRow> for DailyRecord {
    type Error = DietError;

    fn try_from(r: DailyRecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_idx: r.customer_idx,
            record_date: r.record_date,
            calories_morning: r.calories_morning.unwrap_or(0),
            calories_lunch: r.calories_lunch.unwrap_or(0),
            calories_dinner: r.calories_dinner.unwrap_or(0),
            meal_history: MealHistory::from_stored(r.meal_details.unwrap_or_default())?,
            version: r.version,
        })
    }
}
