//! Retention policy: source name to maximum record age in days.

use crate::types::Timestamp;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetentionPolicy {
    max_age_days: BTreeMap<String, u32>,
}

impl RetentionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>, max_age_days: u32) -> Self {
        self.set(source, max_age_days);
        self
    }

    pub fn set(&mut self, source: impl Into<String>, max_age_days: u32) {
        self.max_age_days.insert(source.into(), max_age_days);
    }

    pub fn max_age_days(&self, source: &str) -> Option<u32> {
        self.max_age_days.get(source).copied()
    }

    /// Sources in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.max_age_days.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.max_age_days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_age_days.is_empty()
    }

    /// Records created before the returned instant are eligible for deletion.
    pub fn cutoff(now: Timestamp, max_age_days: u32) -> Timestamp {
        now - Duration::days(i64::from(max_age_days))
    }
}

impl From<BTreeMap<String, u32>> for RetentionPolicy {
    fn from(max_age_days: BTreeMap<String, u32>) -> Self {
        Self { max_age_days }
    }
}
