use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DietError;

/// Meal period a food entry is logged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Morning,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Morning, MealSlot::Lunch, MealSlot::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            MealSlot::Morning => "morning",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = DietError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(MealSlot::Morning),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            _ => Err(DietError::InvalidSlot(s.to_string())),
        }
    }
}

/// One logged food item. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub food: String,
    pub calories: i64,
    pub timestamp: i64, // epoch millis
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MealEntry {
    pub fn new(food: impl Into<String>, calories: i64, timestamp: i64) -> Self {
        Self {
            food: food.into(),
            calories,
            timestamp,
            extra: Map::new(),
        }
    }
}

/// An element of a slot list as found in storage.
///
/// Elements that do not decode as a `MealEntry` (older layouts, other
/// producers) are carried as raw JSON and written back as they were read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Entry(MealEntry),
    Raw(Value),
}

impl StoredEntry {
    /// Calories this element contributes to its slot, 0 when unreadable.
    pub fn calories(&self) -> i64 {
        match self {
            StoredEntry::Entry(e) => e.calories,
            StoredEntry::Raw(v) => v.get("calories").and_then(Value::as_i64).unwrap_or(0),
        }
    }

    #[cfg(test)]
    pub fn entry(&self) -> Option<&MealEntry> {
        match self {
            StoredEntry::Entry(e) => Some(e),
            StoredEntry::Raw(_) => None,
        }
    }

    #[cfg(test)]
    pub fn food(&self) -> Option<&str> {
        match self {
            StoredEntry::Entry(e) => Some(&e.food),
            StoredEntry::Raw(v) => v.get("food").and_then(Value::as_str),
        }
    }
}

impl From<MealEntry> for StoredEntry {
    fn from(e: MealEntry) -> Self {
        StoredEntry::Entry(e)
    }
}

/// Per-day meal history document, grouped by slot.
///
/// Keys this type does not know about are kept in `extra` and written back
/// verbatim. Slot lists stored under another spelling of a slot name
/// (`"Morning"`) are folded into the canonical list when read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealHistory {
    #[serde(default)]
    pub morning: Vec<StoredEntry>,
    #[serde(default)]
    pub lunch: Vec<StoredEntry>,
    #[serde(default)]
    pub dinner: Vec<StoredEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MealHistory {
    /// Decodes the stored column. Text-encoded documents and empty values are accepted.
    pub fn from_stored(value: Value) -> Result<Self, DietError> {
        let history: Self = match value {
            Value::Null => return Ok(Self::default()),
            Value::String(text) if text.trim().is_empty() => return Ok(Self::default()),
            Value::String(text) => serde_json::from_str(&text)?,
            other => serde_json::from_value(other)?,
        };
        Ok(history.fold_slot_spellings())
    }

    pub fn to_stored(&self) -> Result<Value, DietError> {
        Ok(serde_json::to_value(self)?)
    }

    fn fold_slot_spellings(mut self) -> Self {
        let variants: Vec<String> = self
            .extra
            .iter()
            .filter(|(key, value)| value.is_array() && slot_for_key(key).is_some())
            .map(|(key, _)| key.clone())
            .collect();

        for key in variants {
            let (Some(slot), Some(Value::Array(items))) = (slot_for_key(&key), self.extra.remove(&key))
            else {
                continue;
            };
            let list = self.entries_mut(slot);
            list.extend(items.into_iter().map(|item| {
                serde_json::from_value(item.clone()).unwrap_or(StoredEntry::Raw(item))
            }));
        }
        self
    }

    pub fn entries(&self, slot: MealSlot) -> &[StoredEntry] {
        match slot {
            MealSlot::Morning => &self.morning,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
        }
    }

    fn entries_mut(&mut self, slot: MealSlot) -> &mut Vec<StoredEntry> {
        match slot {
            MealSlot::Morning => &mut self.morning,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Dinner => &mut self.dinner,
        }
    }

    /// Returns a copy of this document with `entry` appended under `slot`.
    pub fn with_entry(&self, slot: MealSlot, entry: MealEntry) -> Self {
        let mut next = self.clone();
        next.entries_mut(slot).push(entry.into());
        next
    }

    /// `None` when the sum does not fit.
    pub fn slot_total(&self, slot: MealSlot) -> Option<i64> {
        self.entries(slot)
            .iter()
            .try_fold(0i64, |acc, e| acc.checked_add(e.calories()))
    }
}

// Exact case-insensitive match only; padded keys stay foreign.
fn slot_for_key(key: &str) -> Option<MealSlot> {
    MealSlot::ALL
        .into_iter()
        .find(|slot| key.eq_ignore_ascii_case(slot.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slot_parsing_is_case_insensitive_and_closed() {
        assert_eq!("morning".parse::<MealSlot>().unwrap(), MealSlot::Morning);
        assert_eq!("Lunch".parse::<MealSlot>().unwrap(), MealSlot::Lunch);
        assert_eq!(" DINNER ".parse::<MealSlot>().unwrap(), MealSlot::Dinner);

        for bad in ["brunch", "", "snack", "morning2"] {
            match bad.parse::<MealSlot>() {
                Err(DietError::InvalidSlot(s)) => assert_eq!(s, bad),
                other => panic!("expected InvalidSlot for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_stored_values_decode_to_empty_history() {
        assert_eq!(MealHistory::from_stored(Value::Null).unwrap(), MealHistory::default());
        assert_eq!(
            MealHistory::from_stored(json!("")).unwrap(),
            MealHistory::default()
        );
        assert_eq!(
            MealHistory::from_stored(json!("{}")).unwrap(),
            MealHistory::default()
        );
        assert_eq!(MealHistory::from_stored(json!({})).unwrap(), MealHistory::default());
    }

    #[test]
    fn unknown_keys_survive_a_read_modify_write() {
        let stored = json!({
            "morning": [
                {"food": "toast", "calories": 120, "timestamp": 1, "source": "camera"}
            ],
            "snack": [{"food": "apple", "calories": 80, "timestamp": 2}],
            "note": "kept"
        });

        let history = MealHistory::from_stored(stored).unwrap();
        assert_eq!(history.morning[0].entry().unwrap().extra["source"], json!("camera"));

        let next = history.with_entry(MealSlot::Lunch, MealEntry::new("rice", 400, 3));
        let written = next.to_stored().unwrap();

        assert_eq!(
            written["snack"],
            json!([{"food": "apple", "calories": 80, "timestamp": 2}])
        );
        assert_eq!(written["note"], json!("kept"));
        assert_eq!(written["morning"][0]["source"], json!("camera"));
        assert_eq!(
            written["lunch"],
            json!([{"food": "rice", "calories": 400, "timestamp": 3}])
        );
    }

    #[test]
    fn older_entry_shapes_are_written_back_verbatim() {
        let legacy = [
            json!({"food": "old", "kcal": 10}),
            json!({"food": "stringly", "calories": 10, "timestamp": "1700000000000"}),
            json!({"food": "nulled", "calories": 10, "timestamp": null}),
            json!({"food": "no-time", "calories": 25}),
            json!("just a note"),
        ];
        let stored = json!({ "dinner": legacy.clone() });

        let history = MealHistory::from_stored(stored).unwrap();
        assert!(history.dinner.iter().all(|e| e.entry().is_none()));
        assert_eq!(history.slot_total(MealSlot::Dinner), Some(45));

        let next = history.with_entry(MealSlot::Dinner, MealEntry::new("soup", 150, 9));
        let written = next.to_stored().unwrap();
        let dinner = written["dinner"].as_array().unwrap();
        assert_eq!(&dinner[..legacy.len()], &legacy[..]);
        assert_eq!(
            dinner[legacy.len()],
            json!({"food": "soup", "calories": 150, "timestamp": 9})
        );
    }

    #[test]
    fn capitalized_slot_keys_fold_into_canonical_lists() {
        let stored = json!({
            "morning": [{"food": "egg", "calories": 80, "timestamp": 1}],
            "Morning": [{"food": "toast", "calories": 120, "timestamp": 2}],
            "DINNER": [{"food": "legacy", "kcal": 5}],
            "Snack": [{"food": "apple", "calories": 50, "timestamp": 3}],
            " lunch": [{"food": "padded", "calories": 1, "timestamp": 4}],
            "Lunch": "not a list"
        });

        let history = MealHistory::from_stored(stored).unwrap();
        let morning: Vec<_> = history.morning.iter().map(|e| e.food().unwrap()).collect();
        assert_eq!(morning, ["egg", "toast"]);
        assert_eq!(history.slot_total(MealSlot::Morning), Some(200));
        assert_eq!(history.dinner.len(), 1);

        let written = history.to_stored().unwrap();
        assert!(written.get("Morning").is_none());
        assert!(written.get("DINNER").is_none());
        assert_eq!(written["Snack"][0]["food"], "apple");
        assert_eq!(written[" lunch"][0]["food"], "padded");
        assert_eq!(written["Lunch"], "not a list");
    }

    #[test]
    fn text_encoded_documents_are_accepted() {
        let text = r#"{"dinner":[{"food":"soup","calories":150,"timestamp":10}]}"#;
        let history = MealHistory::from_stored(Value::String(text.into())).unwrap();
        assert_eq!(history.dinner, vec![StoredEntry::from(MealEntry::new("soup", 150, 10))]);
    }

    #[test]
    fn malformed_documents_are_reported() {
        let err = MealHistory::from_stored(json!("{not json")).unwrap_err();
        assert!(matches!(err, DietError::CorruptHistory(_)));

        let err = MealHistory::from_stored(json!({"morning": "oops"})).unwrap_err();
        assert!(matches!(err, DietError::CorruptHistory(_)));
    }

    #[test]
    fn with_entry_appends_in_order_and_leaves_source_untouched() {
        let base = MealHistory::default().with_entry(MealSlot::Dinner, MealEntry::new("a", 1, 1));
        let next = base
            .with_entry(MealSlot::Dinner, MealEntry::new("b", 2, 2))
            .with_entry(MealSlot::Morning, MealEntry::new("c", 3, 3));

        assert_eq!(base.dinner.len(), 1);
        let foods: Vec<_> = next.dinner.iter().map(|e| e.food().unwrap()).collect();
        assert_eq!(foods, ["a", "b"]);
        assert_eq!(next.slot_total(MealSlot::Dinner), Some(3));
        assert_eq!(next.slot_total(MealSlot::Morning), Some(3));
        assert_eq!(next.slot_total(MealSlot::Lunch), Some(0));
    }

    #[test]
    fn slot_total_detects_overflow() {
        let history = MealHistory::default()
            .with_entry(MealSlot::Lunch, MealEntry::new("a", i64::MAX, 1))
            .with_entry(MealSlot::Lunch, MealEntry::new("b", 1, 2));
        assert_eq!(history.slot_total(MealSlot::Lunch), None);
    }
}
