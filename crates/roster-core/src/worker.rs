use crate::day::{BAR_CLOSE_HOUR, BAR_OPEN_HOUR, DayOfWeek};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const WORKER_COLORS: [&str; 12] = [
    "#F59E0B", "#10B981", "#3B82F6", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
    "#6366F1", "#84CC16", "#06B6D4", "#A855F7",
];

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_color() -> String {
    WORKER_COLORS[0].to_string()
}

/// Per-day limits layered on top of a worker's general availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayConstraint {
    /// Last hour the worker may be scheduled on that day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hour: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_hours: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    pub possible_start: u8,
    pub possible_end: u8,
    pub preferred_start: u8,
    pub preferred_end: u8,
    pub preferred_days_count: u8,
    #[serde(default)]
    pub preferred_days: Vec<DayOfWeek>,
    #[serde(default)]
    pub unavailable_days: Vec<DayOfWeek>,
    #[serde(default)]
    pub is_flexible: bool,
    #[serde(default)]
    pub constraints: BTreeMap<DayOfWeek, DayConstraint>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            possible_start: BAR_OPEN_HOUR,
            possible_end: BAR_CLOSE_HOUR,
            preferred_start: 8,
            preferred_end: 16,
            preferred_days_count: 5,
            preferred_days: Vec::new(),
            unavailable_days: Vec::new(),
            is_flexible: false,
            constraints: BTreeMap::new(),
            tag_ids: Vec::new(),
        }
    }

    pub fn with_availability(mut self, start: u8, end: u8) -> Self {
        self.possible_start = start;
        self.possible_end = end;
        self
    }

    pub fn with_preference(mut self, start: u8, end: u8, days_count: u8) -> Self {
        self.preferred_start = start;
        self.preferred_end = end;
        self.preferred_days_count = days_count;
        self
    }

    /// Pulls the preferred window inside the possible window and the weekly
    /// day target into `1..=7`.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.preferred_start = self.preferred_start.max(self.possible_start);
        self.preferred_end = self.preferred_end.min(self.possible_end);
        if self.preferred_end < self.preferred_start {
            self.preferred_end = self.preferred_start;
        }
        self.preferred_days_count = self.preferred_days_count.clamp(1, 7);
        self.preferred_days.sort();
        self.preferred_days.dedup();
        self.unavailable_days.sort();
        self.unavailable_days.dedup();
        self.tag_ids.sort();
        self.tag_ids.dedup();
    }

    pub fn is_available(&self, day: DayOfWeek, hour: u8) -> bool {
        if self.unavailable_days.contains(&day) {
            return false;
        }
        if hour < self.possible_start || hour > self.possible_end {
            return false;
        }
        match self.constraints.get(&day).and_then(|c| c.max_hour) {
            Some(max_hour) => hour <= max_hour,
            None => true,
        }
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }

    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

/// Named role a worker can carry, shown with its colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: default_color(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_preferences_into_availability() {
        let mut worker = Worker::new("  Sarah ")
            .with_availability(10, 18)
            .with_preference(6, 22, 9);
        worker.normalize();
        assert_eq!(worker.name, "Sarah");
        assert_eq!(worker.preferred_start, 10);
        assert_eq!(worker.preferred_end, 18);
        assert_eq!(worker.preferred_days_count, 7);
    }

    #[test]
    fn availability_respects_day_constraints() {
        let mut worker = Worker::new("Sam").with_availability(8, 20);
        worker.unavailable_days.push(DayOfWeek::Sunday);
        worker.constraints.insert(
            DayOfWeek::Friday,
            DayConstraint {
                max_hour: Some(14),
                max_total_hours: None,
            },
        );
        assert!(worker.is_available(DayOfWeek::Monday, 19));
        assert!(!worker.is_available(DayOfWeek::Monday, 7));
        assert!(!worker.is_available(DayOfWeek::Sunday, 12));
        assert!(worker.is_available(DayOfWeek::Friday, 14));
        assert!(!worker.is_available(DayOfWeek::Friday, 15));
    }

    #[test]
    fn worker_json_uses_camel_case() {
        let worker = Worker::new("Ana");
        let json = serde_json::to_value(&worker).unwrap();
        assert!(json.get("possibleStart").is_some());
        assert!(json.get("preferredDaysCount").is_some());
        assert!(json.get("tagIds").is_some());
    }

    #[test]
    fn legacy_worker_documents_still_load() {
        let raw = r#"{"id":"w1","name":"Old","possibleStart":4,"possibleEnd":20,
            "preferredStart":8,"preferredEnd":16,"preferredDaysCount":5,"constraints":{}}"#;
        let worker: Worker = serde_json::from_str(raw).unwrap();
        assert!(worker.tag_ids.is_empty());
        assert!(worker.unavailable_days.is_empty());
    }
}
