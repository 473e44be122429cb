use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::SchedulePolicy;
use crate::errors::{EngineError, ErrorContext, Result};
use crate::models::{ItemKey, Language, Part, ScheduleRecord, is_kana};
use crate::review::CompletedReview;
use crate::schedule_item::ScheduleItem;
use crate::study_session::{ActiveFilters, StudySession};

// Import logging macros
use crate::log_schedule;

/// All schedule items of the active user, ordered by readiness.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCollection {
    items: Vec<ScheduleItem>,
    positions: HashMap<ItemKey, usize>,
    policy: SchedulePolicy,
    sorted_at: Option<DateTime<Utc>>,
}

impl ScheduleCollection {
    pub fn new(policy: SchedulePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in their current order.
    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn get(&self, key: &ItemKey) -> Option<&ScheduleItem> {
        self.positions.get(key).map(|&i| &self.items[i])
    }

    /// Timestamp of the last sort pass, if the order is still current.
    pub fn sorted_at(&self) -> Option<DateTime<Utc>> {
        self.sorted_at
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.positions.clear();
        self.sorted_at = None;
    }

    /// Upsert stored records by id. Every record is validated before any is
    /// applied, so a bad batch leaves the collection untouched.
    pub fn insert(&mut self, records: Vec<ScheduleRecord>) -> Result<usize> {
        let items = records
            .into_iter()
            .map(ScheduleItem::from_record)
            .collect::<Result<Vec<_>>>()?;
        Ok(self.insert_items(items))
    }

    pub fn insert_items(&mut self, items: Vec<ScheduleItem>) -> usize {
        let count = items.len();
        for item in items {
            match self.positions.get(item.key()) {
                Some(&i) => self.items[i] = item,
                None => {
                    self.positions.insert(item.key().clone(), self.items.len());
                    self.items.push(item);
                }
            }
        }
        self.sorted_at = None;
        count
    }

    /// Snapshot for the content store.
    pub fn records(&self) -> Vec<ScheduleRecord> {
        self.items.iter().map(ScheduleItem::to_record).collect()
    }

    /// Items with vocabulary whose part and style pass `filters`.
    pub fn active(&self, filters: &ActiveFilters) -> Vec<&ScheduleItem> {
        self.items
            .iter()
            .filter(|item| item.is_active() && filters.allows(item))
            .collect()
    }

    pub fn active_count(&self, filters: &ActiveFilters) -> usize {
        self.active(filters).len()
    }

    /// Active items due within the policy's slack after `at`. New items carry
    /// the maximal readiness and are therefore always due.
    pub fn due(&self, at: DateTime<Utc>, filters: &ActiveFilters) -> Vec<&ScheduleItem> {
        let horizon = at + Duration::seconds(self.policy.due_slack_secs);
        self.active(filters)
            .into_iter()
            .filter(|item| item.is_due(horizon))
            .collect()
    }

    pub fn due_count(&self, at: DateTime<Utc>, filters: &ActiveFilters) -> usize {
        self.due(at, filters).len()
    }

    /// Active items that were never reviewed.
    pub fn new_items(&self, filters: &ActiveFilters) -> Vec<&ScheduleItem> {
        self.active(filters)
            .into_iter()
            .filter(|item| item.is_new())
            .collect()
    }

    pub fn new_count(&self, filters: &ActiveFilters) -> usize {
        self.new_items(filters).len()
    }

    /// Stable sort by descending readiness, every readiness evaluated once at `at`.
    pub fn sort(&mut self, at: DateTime<Utc>) {
        let mut ranked: Vec<(f64, ScheduleItem)> = self
            .items
            .drain(..)
            .map(|item| (item.readiness(at), item))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        self.items = ranked.into_iter().map(|(_, item)| item).collect();
        self.positions = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key().clone(), i))
            .collect();
        self.sorted_at = Some(at);
    }

    /// Next item to study at `at`, or `None` when nothing is eligible.
    ///
    /// Walks the readiness order skipping inactive and filtered items, bases
    /// already shown this session, language exclusions and, once the
    /// session's quota is used up, new items. `skip` passes over that many
    /// otherwise eligible items. Items hit by a language exclusion are
    /// deactivated on the way.
    pub fn get_next(&mut self, at: DateTime<Utc>, skip: usize, session: &StudySession) -> Option<&ScheduleItem> {
        self.sort(at);

        let mut remaining = skip;
        let mut chosen = None;
        let mut excluded = Vec::new();

        for (i, item) in self.items.iter().enumerate() {
            if !item.is_active() || !session.filters().allows(item) {
                continue;
            }
            if session.has_base(item.base()) {
                continue;
            }
            if is_excluded(item) {
                excluded.push(i);
                continue;
            }
            if item.is_new() && !session.accepts_new_items() {
                continue;
            }
            if remaining > 0 {
                remaining -= 1;
                continue;
            }
            chosen = Some(i);
            break;
        }

        for i in excluded {
            self.items[i].deactivate();
            log_schedule!(deactivated, item = self.items[i].key(), "kana reading");
        }

        match chosen {
            Some(i) => {
                let item = &self.items[i];
                log_schedule!(selected, item = item.key(), readiness = item.readiness(at), skipped = skip);
                Some(item)
            }
            None => {
                log_schedule!(exhausted, candidates = self.items.len());
                None
            }
        }
    }

    /// Apply a finished review to its item and return the updated item.
    pub fn record_outcome(&mut self, review: &CompletedReview) -> Result<&ScheduleItem> {
        let key = review.item();
        let index = *self.positions.get(key).ok_or_else(|| {
            EngineError::NotFound(format!("schedule item '{}'", key)).log_with_context(
                ErrorContext::new("record_outcome", "schedule_item").with_id(&key.to_string()),
            )
        })?;

        let transition = self.items[index]
            .record_outcome(review.succeeded(), review.completed_at(), &self.policy)
            .map_err(|e| {
                e.log_with_context(ErrorContext::new("record_outcome", "schedule_item").with_id(&key.to_string()))
            })?;
        self.sorted_at = None;

        log_schedule!(transition, item = key, success = transition.success, interval = transition.interval);
        Ok(&self.items[index])
    }

    /// Dump the first `limit` items with their readiness at debug level.
    pub fn log_schedule(&mut self, at: DateTime<Utc>, limit: usize) {
        self.sort(at);
        for item in self.items.iter().take(limit) {
            log_schedule!(readiness, item = item.key(), readiness = item.readiness(at));
        }
    }
}

/// Language-specific rules that keep an item out of study entirely.
fn is_excluded(item: &ScheduleItem) -> bool {
    match (item.language(), item.part()) {
        (Language::Japanese, Part::Reading) => is_kana(item.base()),
        (Language::Japanese, Part::Writing | Part::Tone | Part::Definition) => false,
        (Language::Chinese, _) => false,
    }
}
