use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const BAR_OPEN_HOUR: u8 = 4;
pub const BAR_CLOSE_HOUR: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

pub const DAYS: [DayOfWeek; 7] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
    DayOfWeek::Sunday,
];

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    pub fn short(&self) -> &'static str {
        &self.as_str()[..3]
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDayError(String);

impl fmt::Display for ParseDayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown day '{}'", self.0)
    }
}

impl std::error::Error for ParseDayError {}

impl FromStr for DayOfWeek {
    type Err = ParseDayError;

    /// Accepts full names and three-letter abbreviations, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DAYS.iter()
            .copied()
            .find(|day| {
                let name = day.as_str().to_ascii_lowercase();
                name == needle || (needle.len() == 3 && name.starts_with(&needle))
            })
            .ok_or_else(|| ParseDayError(s.to_string()))
    }
}

/// Opening window of a single day. Both ends are inclusive hour slots; a
/// `close` earlier than `open` runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub open: u8,
    pub close: u8,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            open: BAR_OPEN_HOUR,
            close: BAR_CLOSE_HOUR,
        }
    }
}

impl OperatingHours {
    pub fn new(open: u8, close: u8) -> Self {
        Self { open, close }
    }

    pub fn is_valid(&self) -> bool {
        self.open < 24 && self.close < 24
    }

    pub fn wraps_midnight(&self) -> bool {
        self.close < self.open
    }

    pub fn hours(&self) -> Vec<u8> {
        if self.wraps_midnight() {
            (self.open..24).chain(0..=self.close).collect()
        } else {
            (self.open..=self.close).collect()
        }
    }

    pub fn contains(&self, hour: u8) -> bool {
        if hour >= 24 {
            return false;
        }
        if self.wraps_midnight() {
            hour >= self.open || hour <= self.close
        } else {
            hour >= self.open && hour <= self.close
        }
    }
}

/// Operating hours for the whole week. Days without an explicit entry use the
/// default window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyHours(BTreeMap<DayOfWeek, OperatingHours>);

impl Default for WeeklyHours {
    fn default() -> Self {
        Self(
            DAYS.iter()
                .map(|day| (*day, OperatingHours::default()))
                .collect(),
        )
    }
}

impl WeeklyHours {
    pub fn uniform(hours: OperatingHours) -> Self {
        Self(DAYS.iter().map(|day| (*day, hours)).collect())
    }

    pub fn get(&self, day: DayOfWeek) -> OperatingHours {
        self.0.get(&day).copied().unwrap_or_default()
    }

    pub fn set(&mut self, day: DayOfWeek, hours: OperatingHours) {
        self.0.insert(day, hours);
    }

    pub fn hours_for_day(&self, day: DayOfWeek) -> Vec<u8> {
        self.get(day).hours()
    }

    pub fn is_open(&self, day: DayOfWeek, hour: u8) -> bool {
        self.get(day).contains(hour)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayOfWeek, OperatingHours)> + '_ {
        DAYS.iter().map(move |day| (*day, self.get(*day)))
    }
}

pub fn format_hour(hour: u8) -> String {
    let h = hour % 24;
    let ampm = if h >= 12 { "PM" } else { "AM" };
    let h12 = if h % 12 == 0 { 12 } else { h % 12 };
    format!("{h12} {ampm}")
}
