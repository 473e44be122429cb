use std::collections::HashSet;

use crate::models::{ItemKey, Part, Style};
use crate::schedule_item::ScheduleItem;

/// Which parts and styles the user currently studies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilters {
    parts: HashSet<Part>,
    styles: HashSet<Style>,
}

impl ActiveFilters {
    pub fn new(parts: impl IntoIterator<Item = Part>, styles: impl IntoIterator<Item = Style>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
            styles: styles.into_iter().collect(),
        }
    }

    /// Every part, both Chinese script variants.
    pub fn all() -> Self {
        Self::new(Part::ALL, [Style::Simplified, Style::Traditional])
    }

    pub fn allows_part(&self, part: Part) -> bool {
        self.parts.contains(&part)
    }

    pub fn allows_style(&self, style: Style) -> bool {
        self.styles.contains(&style)
    }

    /// Part must be enabled; style only matters for languages with script variants.
    pub fn allows(&self, item: &ScheduleItem) -> bool {
        self.allows_part(item.part()) && (!item.language().has_styles() || self.allows_style(item.style()))
    }
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self::all()
    }
}

/// Items and bases presented so far in the current study session.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    bases: HashSet<String>,
    presented: Vec<ItemKey>,
}

impl SessionHistory {
    pub fn has_base(&self, base: &str) -> bool {
        self.bases.contains(base)
    }

    pub fn record(&mut self, key: &ItemKey) {
        self.bases.insert(key.base.clone());
        self.presented.push(key.clone());
    }

    pub fn presented(&self) -> &[ItemKey] {
        &self.presented
    }

    pub fn clear(&mut self) {
        self.bases.clear();
        self.presented.clear();
    }
}

/// Explicit study context handed to the selector: filters, anti-repetition
/// history and new-item pacing.
#[derive(Debug, Clone, Default)]
pub struct StudySession {
    filters: ActiveFilters,
    history: SessionHistory,
    new_item_limit: Option<usize>,
    new_items_presented: usize,
}

impl StudySession {
    pub fn new(filters: ActiveFilters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    /// Cap how many never-reviewed items one session may introduce.
    pub fn with_new_item_limit(mut self, limit: usize) -> Self {
        self.new_item_limit = Some(limit);
        self
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: ActiveFilters) {
        self.filters = filters;
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn has_base(&self, base: &str) -> bool {
        self.history.has_base(base)
    }

    pub fn new_items_presented(&self) -> usize {
        self.new_items_presented
    }

    /// Whether another new item may still be introduced this session.
    pub fn accepts_new_items(&self) -> bool {
        self.new_item_limit
            .map(|limit| self.new_items_presented < limit)
            .unwrap_or(true)
    }

    /// Note that `item` was shown to the user.
    pub fn mark_presented(&mut self, item: &ScheduleItem) {
        if item.is_new() {
            self.new_items_presented += 1;
        }
        self.history.record(item.key());
    }

    /// Forget presented bases so they become eligible again.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
