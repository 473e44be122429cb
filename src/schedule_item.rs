use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::SchedulePolicy;
use crate::errors::{EngineError, Result};
use crate::models::{ItemKey, Language, Part, ScheduleRecord, Style};

/// Readiness reported for items that were never reviewed. Larger than any
/// ratio a reviewed item can produce.
pub const NEW_ITEM_READINESS: f64 = f64::INFINITY;

/// What a recorded outcome did to an item's spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub success: bool,
    pub previous_interval: f64,
    pub interval: f64,
    pub next: DateTime<Utc>,
}

/// One reviewable (character, part, style) unit with its spaced-repetition state.
///
/// Spacing fields are private: `record_outcome` is the only way to change
/// them, and `next` is always derived from `last + interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItem {
    key: ItemKey,
    interval: f64,
    last: Option<DateTime<Utc>>,
    reviews: u32,
    successes: u32,
    vocab_ids: Vec<String>,
    section_ids: Vec<String>,
    vocab_list_ids: Vec<String>,
}

impl ScheduleItem {
    /// A never-reviewed item.
    pub fn new(key: ItemKey, vocab_ids: Vec<String>) -> Self {
        Self {
            key,
            interval: 0.0,
            last: None,
            reviews: 0,
            successes: 0,
            vocab_ids,
            section_ids: Vec::new(),
            vocab_list_ids: Vec::new(),
        }
    }

    /// Rebuild an item from a stored record, enforcing the scheduling invariants.
    ///
    /// A zero `last` marks the item as new and its interval is discarded.
    /// The stored `next` is ignored and recomputed.
    pub fn from_record(record: ScheduleRecord) -> Result<Self> {
        if record.successes > record.reviews {
            return Err(EngineError::InvariantViolation(format!(
                "item {} has {} successes but only {} reviews",
                record.id, record.successes, record.reviews
            )));
        }

        let last = if record.last == 0 {
            None
        } else {
            let timestamp = Utc.timestamp_opt(record.last, 0).single().ok_or_else(|| {
                EngineError::Validation(format!("item {} has invalid timestamp {}", record.id, record.last))
            })?;
            Some(timestamp)
        };

        let interval = match last {
            None => 0.0,
            Some(last) if record.interval.is_finite() && record.interval > 0.0 => {
                if offset(last, record.interval).is_none() {
                    return Err(EngineError::Validation(format!(
                        "item {} has interval {}s past the representable time range",
                        record.id, record.interval
                    )));
                }
                record.interval
            }
            Some(_) => {
                return Err(EngineError::InvariantViolation(format!(
                    "reviewed item {} has non-positive interval {}",
                    record.id, record.interval
                )));
            }
        };

        Ok(Self {
            key: record.id,
            interval,
            last,
            reviews: record.reviews,
            successes: record.successes,
            vocab_ids: record.vocab_ids,
            section_ids: record.section_ids,
            vocab_list_ids: record.vocab_list_ids,
        })
    }

    pub fn to_record(&self) -> ScheduleRecord {
        ScheduleRecord {
            id: self.key.clone(),
            interval: self.interval,
            last: self.last.map(|t| t.timestamp()).unwrap_or(0),
            next: self.next().map(|t| t.timestamp()).unwrap_or(0),
            reviews: self.reviews,
            successes: self.successes,
            vocab_ids: self.vocab_ids.clone(),
            section_ids: self.section_ids.clone(),
            vocab_list_ids: self.vocab_list_ids.clone(),
        }
    }

    pub fn with_sections(mut self, section_ids: Vec<String>, vocab_list_ids: Vec<String>) -> Self {
        self.section_ids = section_ids;
        self.vocab_list_ids = vocab_list_ids;
        self
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn base(&self) -> &str {
        &self.key.base
    }

    pub fn part(&self) -> Part {
        self.key.part
    }

    pub fn style(&self) -> Style {
        self.key.style
    }

    pub fn language(&self) -> Language {
        self.key.language
    }

    /// Current spacing in seconds; zero for new items.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.last.and_then(|last| offset(last, self.interval))
    }

    pub fn reviews(&self) -> u32 {
        self.reviews
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn vocab_ids(&self) -> &[String] {
        &self.vocab_ids
    }

    pub fn section_ids(&self) -> &[String] {
        &self.section_ids
    }

    pub fn vocab_list_ids(&self) -> &[String] {
        &self.vocab_list_ids
    }

    pub fn is_new(&self) -> bool {
        self.last.is_none()
    }

    /// Items without vocabulary references are excluded from study.
    pub fn is_active(&self) -> bool {
        !self.vocab_ids.is_empty()
    }

    /// Elapsed time since the last review divided by the interval.
    pub fn readiness(&self, at: DateTime<Utc>) -> f64 {
        match self.last {
            None => NEW_ITEM_READINESS,
            Some(last) => {
                let elapsed = (at - last).num_milliseconds() as f64 / 1000.0;
                elapsed / self.interval
            }
        }
    }

    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.readiness(at) >= 1.0
    }

    /// Clear vocabulary references so the item drops out of study.
    pub fn deactivate(&mut self) {
        self.vocab_ids.clear();
    }

    /// Fold a review outcome into the item's spacing.
    ///
    /// Success grows the interval by the policy's growth factor (never below
    /// the minimum interval); failure resets it to the failure interval.
    /// Either way `last` becomes `at`.
    pub fn record_outcome(
        &mut self,
        success: bool,
        at: DateTime<Utc>,
        policy: &SchedulePolicy,
    ) -> Result<Transition> {
        if let Some(last) = self.last {
            if at < last {
                return Err(EngineError::InvariantViolation(format!(
                    "outcome for {} at {} precedes last review at {}",
                    self.key, at, last
                )));
            }
        }

        let previous_interval = self.interval;
        let interval = if success {
            (previous_interval * policy.growth_factor)
                .max(policy.minimum_interval_secs)
                .min(policy.maximum_interval_secs)
        } else {
            policy.failure_interval_secs
        };
        let next = offset(at, interval).ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "interval {}s for {} runs past the representable time range",
                interval, self.key
            ))
        })?;

        self.reviews += 1;
        if success {
            self.successes += 1;
        }
        self.interval = interval;
        self.last = Some(at);

        Ok(Transition {
            success,
            previous_interval,
            interval,
            next,
        })
    }
}

/// `from + value` seconds, or `None` when the result is not a valid timestamp.
fn offset(from: DateTime<Utc>, value: f64) -> Option<DateTime<Utc>> {
    let millis = (value * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    from.checked_add_signed(Duration::try_milliseconds(millis as i64)?)
}
