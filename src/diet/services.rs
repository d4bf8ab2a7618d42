use time::{Date, OffsetDateTime};
use tracing::{debug, error, info, instrument, warn};

use super::date::parse_record_date;
use super::dto::SaveDietRequest;
use super::history::{MealEntry, MealSlot};
use super::repo_types::{DailyRecord, RecordKey};
use crate::error::DietError;
use crate::state::AppState;

/// A validated entry waiting to be merged into a day's record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub slot: MealSlot,
    pub entry: MealEntry,
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Checks slot and entry without touching storage.
pub fn validate_meal(
    slot: &str,
    food: &str,
    calories: i64,
    timestamp: Option<i64>,
) -> Result<NewMeal, DietError> {
    let slot: MealSlot = slot.parse()?;

    let food = food.trim();
    if food.is_empty() {
        return Err(DietError::InvalidEntry("food name must not be empty"));
    }
    if calories < 0 {
        return Err(DietError::InvalidEntry("calories must not be negative"));
    }

    let timestamp = timestamp.unwrap_or_else(now_millis);
    Ok(NewMeal {
        slot,
        entry: MealEntry::new(food, calories, timestamp),
    })
}

/// Returns `record` with the slot accumulator raised and the entry appended.
pub fn apply_meal(record: &DailyRecord, meal: &NewMeal) -> Result<DailyRecord, DietError> {
    let total = record
        .calories(meal.slot)
        .checked_add(meal.entry.calories)
        .ok_or(DietError::InvalidEntry("calorie total out of range"))?;

    let mut next = record.clone();
    *next.calories_mut(meal.slot) = total;
    next.meal_history = record.meal_history.with_entry(meal.slot, meal.entry.clone());
    Ok(next)
}

async fn locate_or_create_key(st: &AppState, key: RecordKey) -> Result<DailyRecord, DietError> {
    if let Some(record) = st.records.find(&key).await? {
        return Ok(record);
    }
    let record = st.records.insert_if_absent(&key).await?;
    debug!(user_idx = key.user_idx, date = %key.date, id = %record.id, "daily record located");
    Ok(record)
}

/// Returns the day's record, creating a zeroed one when none exists.
#[instrument(skip(st))]
pub async fn locate_or_create(
    st: &AppState,
    customer_id: &str,
    date: Date,
) -> Result<DailyRecord, DietError> {
    let user_idx = st.users.resolve(customer_id).await?;
    locate_or_create_key(st, RecordKey::new(user_idx, date)).await
}

/// Adds one meal to the day's record.
///
/// The read-modify-write is serialized per record and retried on version
/// conflicts up to the configured attempt count.
#[instrument(skip(st))]
pub async fn record_meal(
    st: &AppState,
    customer_id: &str,
    date: Date,
    slot: &str,
    food: &str,
    calories: i64,
    timestamp: Option<i64>,
) -> Result<DailyRecord, DietError> {
    let meal = validate_meal(slot, food, calories, timestamp)?;

    let user_idx = st.users.resolve(customer_id).await?;
    let key = RecordKey::new(user_idx, date);
    let _guard = st.locks.acquire(key).await;

    let attempts = st.config.diet.merge_retries.max(1);
    for attempt in 1..=attempts {
        let current = locate_or_create_key(st, key).await?;
        let next = apply_meal(&current, &meal)?;
        debug_assert!(!current.is_consistent() || next.is_consistent());

        match st.records.update(&next).await {
            Ok(saved) => {
                info!(
                    user_idx,
                    date = %date,
                    slot = %meal.slot,
                    food = %meal.entry.food,
                    calories = meal.entry.calories,
                    "meal recorded"
                );
                return Ok(saved);
            }
            Err(DietError::MergeConflict) => {
                warn!(user_idx, date = %date, attempt, "daily record changed underneath, retrying");
            }
            Err(e) => {
                error!(error = %e, user_idx, date = %date, "saving daily record failed");
                return Err(e);
            }
        }
    }

    error!(user_idx, date = %date, attempts, "giving up on daily record after conflicts");
    Err(DietError::RetriesExhausted { attempts })
}

/// Reads the day's record without writing; a zeroed record when none exists.
#[instrument(skip(st))]
pub async fn fetch(st: &AppState, customer_id: &str, date: Date) -> Result<DailyRecord, DietError> {
    let user_idx = st.users.resolve(customer_id).await?;
    let key = RecordKey::new(user_idx, date);
    Ok(st
        .records
        .find(&key)
        .await?
        .unwrap_or_else(|| DailyRecord::blank(key)))
}

pub async fn save_diet_record(
    st: &AppState,
    customer_id: &str,
    req: &SaveDietRequest,
) -> Result<DailyRecord, DietError> {
    let date = parse_record_date(&req.date)?;
    record_meal(
        st,
        customer_id,
        date,
        &req.slot,
        &req.food,
        req.calories,
        req.timestamp,
    )
    .await
}

pub async fn get_diet_record(
    st: &AppState,
    customer_id: &str,
    date: &str,
) -> Result<DailyRecord, DietError> {
    let date = parse_record_date(date)?;
    fetch(st, customer_id, date).await
}
