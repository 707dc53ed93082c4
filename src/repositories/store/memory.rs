use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{StoreClient, StoreError};

/// In-process store keyed by table name. Rows are plain JSON objects and an
/// `id` is assigned on insert when the record carries none, mirroring what
/// the hosted store does.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn find_one(
        &self,
        table: &str,
        filter: (&str, &str),
    ) -> Result<Option<Value>, StoreError> {
        let (column, value) = filter;
        let tables = self.tables.lock()?;
        let row = tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row_matches(row, column, value)))
            .cloned();

        Ok(row)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let mut record = record;
        if record.get("id").is_none() {
            if let Some(fields) = record.as_object_mut() {
                fields.insert(
                    "id".to_string(),
                    Value::String(Uuid::new_v4().hyphenated().to_string()),
                );
            }
        }

        let mut tables = self.tables.lock()?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    async fn update(
        &self,
        table: &str,
        filter: (&str, &str),
        patch: Value,
    ) -> Result<(), StoreError> {
        let (column, value) = filter;
        let mut tables = self.tables.lock()?;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| row_matches(row, column, value)) {
                merge(row, &patch);
            }
        }

        Ok(())
    }
}

fn row_matches(row: &Value, column: &str, value: &str) -> bool {
    row.get(column).and_then(Value::as_str) == Some(value)
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Some(fields), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in changes {
            fields.insert(key.clone(), value.clone());
        }
    }
}

/// [`PoisonError`] keeps the guard and is not `Send`, so only its string
/// representation crosses into [`StoreError`].
#[derive(Debug, thiserror::Error)]
#[error("poisoned store lock: {0}")]
pub struct PoisonedLock(String);

impl<T> From<PoisonError<T>> for StoreError {
    fn from(err: PoisonError<T>) -> Self {
        StoreError::Adapter(Box::new(PoisonedLock(err.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use speculoos::prelude::*;

    #[tokio::test]
    async fn insert_assigns_an_id() {
        let store = MemoryStore::default();

        let row = store
            .insert("referrals", json!({"referred_email": "a@b.com"}))
            .await
            .unwrap();

        let id = row["id"].as_str().unwrap();
        assert!(!id.is_empty());

        let found = store
            .find_one("referrals", ("referred_email", "a@b.com"))
            .await
            .unwrap();
        assert_that!(found).is_some();
    }

    #[tokio::test]
    async fn find_one_misses_on_empty_table() {
        let store = MemoryStore::default();

        let found = store.find_one("profiles", ("id", "R1")).await.unwrap();
        assert_that!(found).is_none();
    }

    #[tokio::test]
    async fn update_merges_patch_into_matching_rows() {
        let store = MemoryStore::default();
        store
            .insert("profiles", json!({"id": "R1", "referral_points": 5}))
            .await
            .unwrap();

        store
            .update("profiles", ("id", "R1"), json!({"referral_points": 15}))
            .await
            .unwrap();

        let row = store
            .find_one("profiles", ("id", "R1"))
            .await
            .unwrap()
            .unwrap();
        assert_that!(row["referral_points"].as_i64()).is_some().is_equal_to(15);
    }
}
