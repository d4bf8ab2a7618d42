use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{DailyRecord, DailyRecordRow, RecordKey};
use crate::error::DietError;

/// Durable home of daily records.
///
/// `insert_if_absent` is the atomic half of get-or-create, `update` is a
/// compare-and-swap on `DailyRecord::version`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(&self, key: &RecordKey) -> Result<Option<DailyRecord>, DietError>;

    /// Stores a zeroed record for `key`, or returns the one already there.
    async fn insert_if_absent(&self, key: &RecordKey) -> Result<DailyRecord, DietError>;

    /// Writes accumulators and history together if the stored version still
    /// equals `record.version`; fails with `MergeConflict` otherwise.
    async fn update(&self, record: &DailyRecord) -> Result<DailyRecord, DietError>;
}

#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<DailyRecord>, DietError> {
        let row = sqlx::query_as::<_, DailyRecordRow>(
            r#"
            SELECT id, customer_idx, record_date, calories_morning, calories_lunch,
                   calories_dinner, meal_details, version
              FROM diet_records
             WHERE customer_idx = $1 AND record_date = $2
            "#,
        )
        .bind(key.user_idx)
        .bind(key.date)
        .fetch_optional(&self.db)
        .await?;

        row.map(DailyRecord::try_from).transpose()
    }

    async fn insert_if_absent(&self, key: &RecordKey) -> Result<DailyRecord, DietError> {
        let inserted = sqlx::query_as::<_, DailyRecordRow>(
            r#"
            INSERT INTO diet_records (id, customer_idx, record_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_idx, record_date) DO NOTHING
            RETURNING id, customer_idx, record_date, calories_morning, calories_lunch,
                      calories_dinner, meal_details, version
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.user_idx)
        .bind(key.date)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            tracing::info!(user_idx = key.user_idx, date = %key.date, "daily record created");
            return DailyRecord::try_from(row);
        }

        // lost the race; the winner's row is visible now
        let existing = sqlx::query_as::<_, DailyRecordRow>(
            r#"
            SELECT id, customer_idx, record_date, calories_morning, calories_lunch,
                   calories_dinner, meal_details, version
              FROM diet_records
             WHERE customer_idx = $1 AND record_date = $2
            "#,
        )
        .bind(key.user_idx)
        .bind(key.date)
        .fetch_one(&self.db)
        .await?;

        DailyRecord::try_from(existing)
    }

    async fn update(&self, record: &DailyRecord) -> Result<DailyRecord, DietError> {
        let details = record.meal_history.to_stored()?;

        let row = sqlx::query_as::<_, DailyRecordRow>(
            r#"
            UPDATE diet_records
               SET calories_morning = $3,
                   calories_lunch = $4,
                   calories_dinner = $5,
                   meal_details = $6,
                   version = version + 1,
                   updated_at = now()
             WHERE id = $1 AND version = $2
            RETURNING id, customer_idx, record_date, calories_morning, calories_lunch,
                      calories_dinner, meal_details, version
            "#,
        )
        .bind(record.id)
        .bind(record.version)
        .bind(record.calories_morning)
        .bind(record.calories_lunch)
        .bind(record.calories_dinner)
        .bind(details)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => DailyRecord::try_from(row),
            None => Err(DietError::MergeConflict),
        }
    }
}
