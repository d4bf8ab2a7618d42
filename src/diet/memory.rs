use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use uuid::Uuid;

use super::history::MealHistory;
use super::repo::RecordStore;
use super::repo_types::{DailyRecord, RecordKey};
use crate::error::DietError;

/// In-process `RecordStore` with the same insert/CAS semantics as Postgres.
///
/// History goes through its stored JSON form on every write so document
/// round-tripping is exercised. Conflicts and outages can be injected.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<HashMap<RecordKey, DailyRecord>>,
    forced_conflicts: AtomicU32,
    offline: AtomicBool,
    writes: AtomicU32,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Makes the next `n` updates fail as if another writer got there first.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts and successful updates so far.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn put_raw(&self, record: DailyRecord) {
        self.rows.lock().unwrap().insert(record.key(), record);
    }

    fn check_online(&self) -> Result<(), DietError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DietError::StorageUnavailable(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

fn through_storage(history: &MealHistory) -> Result<MealHistory, DietError> {
    let text = serde_json::to_string(&history.to_stored()?)?;
    MealHistory::from_stored(serde_json::Value::String(text))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<DailyRecord>, DietError> {
        self.check_online()?;
        Ok(self.rows.lock().unwrap().get(key).cloned())
    }

    async fn insert_if_absent(&self, key: &RecordKey) -> Result<DailyRecord, DietError> {
        self.check_online()?;
        let mut rows = self.rows.lock().unwrap();
        let record = rows.entry(*key).or_insert_with(|| {
            self.writes.fetch_add(1, Ordering::SeqCst);
            DailyRecord {
                id: Uuid::new_v4(),
                version: 1,
                ..DailyRecord::blank(*key)
            }
        });
        Ok(record.clone())
    }

    async fn update(&self, record: &DailyRecord) -> Result<DailyRecord, DietError> {
        self.check_online()?;
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(DietError::MergeConflict);
        }

        let mut rows = self.rows.lock().unwrap();
        let stored = rows
            .get_mut(&record.key())
            .filter(|r| r.id == record.id && r.version == record.version)
            .ok_or(DietError::MergeConflict)?;

        *stored = DailyRecord {
            meal_history: through_storage(&record.meal_history)?,
            version: record.version + 1,
            ..record.clone()
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }
}
