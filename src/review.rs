use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ReviewPolicy;
use crate::errors::{EngineError, Result};
use crate::models::ItemKey;
use crate::recognition::RecognitionSession;

/// Outcome of one presentation while it is still in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    id: Uuid,
    item: ItemKey,
    started_at: DateTime<Utc>,
    first_input_at: Option<DateTime<Utc>>,
    outcomes: Vec<bool>,
}

impl ReviewRecord {
    pub fn begin(item: ItemKey, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item,
            started_at,
            first_input_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn item(&self) -> &ItemKey {
        &self.item
    }

    /// Mark the first user interaction; later calls are ignored.
    pub fn note_input(&mut self, at: DateTime<Utc>) {
        if self.first_input_at.is_none() {
            self.first_input_at = Some(at);
        }
    }

    /// Add one judged unit (a stroke, a reading, a tone...).
    pub fn record_unit(&mut self, passed: bool) {
        self.outcomes.push(passed);
    }

    /// Add one unit per stroke of a finished recognition session.
    pub fn record_recognition(&mut self, session: &RecognitionSession) -> Result<()> {
        if !session.is_complete() {
            return Err(EngineError::InvariantViolation(format!(
                "recognition for {} stopped at stroke {} of {}",
                self.item,
                session.current_index(),
                session.stroke_count()
            )));
        }
        self.outcomes.extend(session.stroke_outcomes());
        Ok(())
    }

    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    /// Seal the record. Time spent is capped by the policy limits and the
    /// review succeeds when failed units stay within the allowed ratio.
    pub fn complete(self, completed_at: DateTime<Utc>, policy: &ReviewPolicy) -> Result<CompletedReview> {
        if self.outcomes.is_empty() {
            return Err(EngineError::Validation(format!(
                "review of {} has no judged units",
                self.item
            )));
        }
        if completed_at < self.started_at {
            return Err(EngineError::InvariantViolation(format!(
                "review of {} completed before it started",
                self.item
            )));
        }

        let review_limit = Duration::seconds(policy.review_time_limit_secs);
        let thinking_limit = Duration::seconds(policy.thinking_time_limit_secs);

        let review_time = (completed_at - self.started_at).min(review_limit);
        let thinking_time = (self.first_input_at.unwrap_or(completed_at) - self.started_at)
            .max(Duration::zero())
            .min(thinking_limit);

        let failed = self.outcomes.iter().filter(|passed| !**passed).count();
        let allowed = (self.outcomes.len() as f64 * policy.allowed_failure_ratio).floor() as usize;

        Ok(CompletedReview {
            id: self.id,
            item: self.item,
            started_at: self.started_at,
            completed_at,
            review_time_ms: review_time.num_milliseconds(),
            thinking_time_ms: thinking_time.num_milliseconds(),
            success: failed <= allowed,
            outcomes: self.outcomes,
        })
    }
}

/// A sealed review; its outcome is the only input to a schedule transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReview {
    id: Uuid,
    item: ItemKey,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    review_time_ms: i64,
    thinking_time_ms: i64,
    outcomes: Vec<bool>,
    success: bool,
}

impl CompletedReview {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn item(&self) -> &ItemKey {
        &self.item
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn review_time(&self) -> Duration {
        Duration::milliseconds(self.review_time_ms)
    }

    pub fn thinking_time(&self) -> Duration {
        Duration::milliseconds(self.thinking_time_ms)
    }
}
