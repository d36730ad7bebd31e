//! Roster generation is delegated to an external model. This module defines
//! the seam ([`ScheduleGenerator`]), the prompt, and the parsing of whatever
//! text comes back.

use crate::bar::{Bar, ScheduleEntry, StaffingRequirement};
use crate::day::{DayOfWeek, WeeklyHours};
use crate::worker::Worker;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;

#[cfg(feature = "llm")]
pub mod gemini;
pub mod prompt;

#[cfg(feature = "llm")]
pub use gemini::GeminiGenerator;
pub use prompt::build_prompt;

/// Everything the generator is told about one bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub workers: Vec<Worker>,
    pub requirements: Vec<StaffingRequirement>,
    pub operating_hours: WeeklyHours,
}

impl GenerationRequest {
    pub fn from_bar(bar: &Bar) -> Self {
        Self {
            workers: bar.workers.clone(),
            requirements: bar.requirements.clone(),
            operating_hours: bar.operating_hours.clone(),
        }
    }
}

#[derive(Debug)]
pub enum GenerationError {
    MissingApiKey,
    Encode(String),
    Transport(String),
    Api { status: u16, body: String },
    Parse(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::MissingApiKey => {
                write!(f, "no API key configured for the schedule generator")
            }
            GenerationError::Encode(msg) => write!(f, "failed to build prompt: {msg}"),
            GenerationError::Transport(msg) => write!(f, "generator request failed: {msg}"),
            GenerationError::Api { status, body } => {
                write!(f, "generator returned HTTP {status}: {body}")
            }
            GenerationError::Parse(msg) => write!(f, "unusable generator output: {msg}"),
        }
    }
}

impl std::error::Error for GenerationError {}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Produces a weekly roster for a bar. The output is taken as-is apart from
/// dropping entries for unknown workers.
pub trait ScheduleGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = GenerationResult<Vec<ScheduleEntry>>> + Send;
}

/// Parses model output into entries. Blank output means an empty roster.
pub fn parse_entries(text: &str) -> GenerationResult<Vec<ScheduleEntry>> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|err| GenerationError::Parse(format!("invalid JSON: {err}")))?;
    let Value::Array(items) = value else {
        return Err(GenerationError::Parse("expected a JSON array".into()));
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_entry(idx, item))
        .collect()
}

fn parse_entry(idx: usize, item: &Value) -> GenerationResult<ScheduleEntry> {
    let field = |name: &str| {
        item.get(name)
            .ok_or_else(|| GenerationError::Parse(format!("entry #{idx} is missing '{name}'")))
    };
    let worker_id = field("workerId")?
        .as_str()
        .ok_or_else(|| GenerationError::Parse(format!("entry #{idx} has a non-string workerId")))?
        .to_string();
    let day = field("day")?
        .as_str()
        .ok_or_else(|| GenerationError::Parse(format!("entry #{idx} has a non-string day")))?
        .parse::<DayOfWeek>()
        .map_err(|err| GenerationError::Parse(format!("entry #{idx}: {err}")))?;
    let hour = parse_hour(field("hour")?)
        .ok_or_else(|| GenerationError::Parse(format!("entry #{idx} has an invalid hour")))?;
    Ok(ScheduleEntry {
        worker_id,
        day,
        hour,
    })
}

fn parse_hour(value: &Value) -> Option<u8> {
    if let Some(hour) = value.as_u64() {
        return u8::try_from(hour).ok();
    }
    let hour = value.as_f64()?;
    if hour.fract() != 0.0 || hour < 0.0 || hour > f64::from(u8::MAX) {
        return None;
    }
    Some(hour as u8)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
