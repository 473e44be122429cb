use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::models::{GlyphLibrary, ScheduleRecord, StrokeRecord};
use crate::review::CompletedReview;
use crate::schedule::ScheduleCollection;
use crate::schedule_item::ScheduleItem;

// Import logging macros
use crate::{log_schedule, log_store_operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Items,
    Strokes,
    Reviews,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Items => "items",
            RecordKind::Strokes => "strokes",
            RecordKind::Reviews => "reviews",
        };
        f.write_str(name)
    }
}

/// Bulk storage collaborator. Implementations own persistence and retries;
/// their errors reach callers unchanged inside `EngineError::Store`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_all(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>>;

    async fn put(&self, kind: RecordKind, records: Vec<Value>) -> anyhow::Result<()>;
}

/// Everything one synchronization hands over, as parsed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBatch {
    #[serde(default)]
    pub items: Vec<ScheduleRecord>,
    #[serde(default)]
    pub strokes: Vec<StrokeRecord>,
    #[serde(default)]
    pub reviews: Vec<CompletedReview>,
}

/// Write a batch kind by kind (strokes, items, reviews), stopping at the
/// first failure.
pub async fn put_batch(store: &dyn ContentStore, batch: ContentBatch) -> Result<()> {
    put_records(store, RecordKind::Strokes, &batch.strokes).await?;
    put_records(store, RecordKind::Items, &batch.items).await?;
    put_records(store, RecordKind::Reviews, &batch.reviews).await?;
    Ok(())
}

pub async fn save_review(store: &dyn ContentStore, review: &CompletedReview) -> Result<()> {
    put_records(store, RecordKind::Reviews, std::slice::from_ref(review)).await
}

pub async fn save_schedule(store: &dyn ContentStore, schedule: &ScheduleCollection) -> Result<()> {
    put_records(store, RecordKind::Items, &schedule.records()).await
}

pub async fn load_glyphs(store: &dyn ContentStore) -> Result<GlyphLibrary> {
    let records: Vec<StrokeRecord> = get_records(store, RecordKind::Strokes).await?;
    GlyphLibrary::from_records(records)
}

/// Load schedule items and reference strokes, in that order.
pub async fn load_all(store: &dyn ContentStore, schedule: &mut ScheduleCollection) -> Result<GlyphLibrary> {
    schedule.load_all(store).await?;
    load_glyphs(store).await
}

impl ScheduleCollection {
    /// Replace the collection's contents with the stored items. Records are
    /// validated first, so a bad load keeps the current contents.
    pub async fn load_all(&mut self, store: &dyn ContentStore) -> Result<usize> {
        let records: Vec<ScheduleRecord> = get_records(store, RecordKind::Items).await?;
        let items = records
            .into_iter()
            .map(ScheduleItem::from_record)
            .collect::<Result<Vec<_>>>()?;
        self.reset();
        let count = self.insert_items(items);
        log_schedule!(loaded, count = count);
        Ok(count)
    }
}

async fn get_records<T: for<'de> Deserialize<'de>>(store: &dyn ContentStore, kind: RecordKind) -> Result<Vec<T>> {
    let raw = store.get_all(kind).await.inspect_err(|e| {
        log_store_operation!(error, "get_all", kind = kind, error = e);
    })?;
    let count = raw.len();
    let records = raw
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()?;
    log_store_operation!(debug, "get_all", kind = kind, count = count);
    Ok(records)
}

async fn put_records<T: Serialize>(store: &dyn ContentStore, kind: RecordKind, records: &[T]) -> Result<()> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let count = values.len();
    store.put(kind, values).await.inspect_err(|e| {
        log_store_operation!(error, "put", kind = kind, error = e);
    })?;
    log_store_operation!(debug, "put", kind = kind, count = count);
    Ok(())
}

/// In-process store. Records carrying a string `id` replace earlier records
/// with the same id; others are appended.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<RecordKind, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, kind: RecordKind) -> usize {
        self.records.read().await.get(&kind).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_all(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>> {
        Ok(self.records.read().await.get(&kind).cloned().unwrap_or_default())
    }

    async fn put(&self, kind: RecordKind, records: Vec<Value>) -> anyhow::Result<()> {
        let mut store = self.records.write().await;
        let stored = store.entry(kind).or_default();
        for record in records {
            let existing = record
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| stored.iter().position(|r| r.get("id").and_then(Value::as_str) == Some(id)));
            match existing {
                Some(i) => stored[i] = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulePolicy;
    use crate::errors::EngineError;
    use crate::geometry::Point;
    use serde_json::json;

    fn stroke(id: &str, base: &str, order: u32) -> StrokeRecord {
        StrokeRecord {
            id: id.to_string(),
            base: base.to_string(),
            order,
            points: vec![Point::new(0.0, order as f64 * 10.0), Point::new(100.0, order as f64 * 10.0)],
        }
    }

    fn item(id: &str) -> ScheduleRecord {
        serde_json::from_value(json!({ "id": id, "vocabIds": ["v1"] })).unwrap()
    }

    struct FailingStore {
        failing: RecordKind,
        inner: MemoryStore,
    }

    #[async_trait]
    impl ContentStore for FailingStore {
        async fn get_all(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>> {
            if kind == self.failing {
                anyhow::bail!("{} unavailable", kind);
            }
            self.inner.get_all(kind).await
        }

        async fn put(&self, kind: RecordKind, records: Vec<Value>) -> anyhow::Result<()> {
            if kind == self.failing {
                anyhow::bail!("{} unavailable", kind);
            }
            self.inner.put(kind, records).await
        }
    }

    #[tokio::test]
    async fn test_put_batch_then_load_all() {
        let store = MemoryStore::new();
        let batch = ContentBatch {
            items: vec![item("alice-zh-一-0-rune-simp"), item("alice-zh-二-0-rune-simp")],
            strokes: vec![stroke("er-1", "二", 0), stroke("er-2", "二", 1), stroke("yi-1", "一", 0)],
            reviews: vec![],
        };
        put_batch(&store, batch).await.unwrap();

        let mut schedule = ScheduleCollection::new(SchedulePolicy::default());
        let glyphs = load_all(&store, &mut schedule).await.unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs.get("二").unwrap().stroke_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_upserts_by_id() {
        let store = MemoryStore::new();
        store
            .put(RecordKind::Items, vec![json!({"id": "a", "v": 1}), json!({"id": "b", "v": 1})])
            .await
            .unwrap();
        store.put(RecordKind::Items, vec![json!({"id": "a", "v": 2})]).await.unwrap();

        let all = store.get_all(RecordKind::Items).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["v"], 2);
        assert_eq!(store.count(RecordKind::Reviews).await, 0);
    }

    #[tokio::test]
    async fn test_put_batch_stops_at_first_failure() {
        let store = FailingStore {
            failing: RecordKind::Items,
            inner: MemoryStore::new(),
        };
        let batch = ContentBatch {
            items: vec![item("alice-zh-一-0-rune-simp")],
            strokes: vec![stroke("yi-1", "一", 0)],
            reviews: vec![],
        };

        let result = put_batch(&store, batch).await;
        assert!(matches!(result, Err(EngineError::Store(ref e)) if e.to_string() == "items unavailable"));
        assert_eq!(store.inner.count(RecordKind::Strokes).await, 1);
        assert_eq!(store.inner.count(RecordKind::Reviews).await, 0);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_schedule_untouched() {
        let store = FailingStore {
            failing: RecordKind::Items,
            inner: MemoryStore::new(),
        };
        let mut schedule = ScheduleCollection::new(SchedulePolicy::default());
        schedule.insert(vec![item("alice-zh-一-0-rune-simp")]).unwrap();

        assert!(schedule.load_all(&store).await.is_err());
        assert_eq!(schedule.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_record_leaves_schedule_untouched() {
        let store = MemoryStore::new();
        store
            .put(
                RecordKind::Items,
                vec![json!({
                    "id": "alice-zh-二-0-rune-simp",
                    "vocabIds": ["v1"],
                    "last": 1_700_000_000,
                    "interval": 600.0,
                    "reviews": 1,
                    "successes": 2
                })],
            )
            .await
            .unwrap();
        let mut schedule = ScheduleCollection::new(SchedulePolicy::default());
        schedule.insert(vec![item("alice-zh-一-0-rune-simp")]).unwrap();

        assert!(matches!(
            schedule.load_all(&store).await,
            Err(EngineError::InvariantViolation(_))
        ));
        assert_eq!(schedule.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_record_is_a_serialization_error() {
        let store = MemoryStore::new();
        store
            .put(RecordKind::Items, vec![json!({"id": 7})])
            .await
            .unwrap();
        let mut schedule = ScheduleCollection::default();
        assert!(matches!(
            schedule.load_all(&store).await,
            Err(EngineError::Serialization(_))
        ));
    }
}
