use crate::worker::{Tag, Worker};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct WorkerValidationError {
    message: String,
}

impl WorkerValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for WorkerValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkerValidationError {}

fn check_hour(worker: &Worker, field: &str, hour: u8) -> Result<(), WorkerValidationError> {
    if hour > 23 {
        return Err(WorkerValidationError::new(format!(
            "worker '{}' has invalid {field} {hour} (must be 0-23)",
            worker.name
        )));
    }
    Ok(())
}

pub fn validate_worker(worker: &Worker) -> Result<(), WorkerValidationError> {
    if worker.id.trim().is_empty() {
        return Err(WorkerValidationError::new("worker id must not be empty"));
    }
    if worker.name.trim().is_empty() {
        return Err(WorkerValidationError::new(format!(
            "worker {} requires a name",
            worker.id
        )));
    }

    check_hour(worker, "possibleStart", worker.possible_start)?;
    check_hour(worker, "possibleEnd", worker.possible_end)?;
    check_hour(worker, "preferredStart", worker.preferred_start)?;
    check_hour(worker, "preferredEnd", worker.preferred_end)?;

    if worker.possible_start > worker.possible_end {
        return Err(WorkerValidationError::new(format!(
            "worker '{}' availability starts at {} after it ends at {}",
            worker.name, worker.possible_start, worker.possible_end
        )));
    }
    if worker.preferred_start < worker.possible_start || worker.preferred_end > worker.possible_end
    {
        return Err(WorkerValidationError::new(format!(
            "worker '{}' preferred window {}-{} lies outside availability {}-{}",
            worker.name,
            worker.preferred_start,
            worker.preferred_end,
            worker.possible_start,
            worker.possible_end
        )));
    }
    if !(1..=7).contains(&worker.preferred_days_count) {
        return Err(WorkerValidationError::new(format!(
            "worker '{}' preferredDaysCount {} must be between 1 and 7",
            worker.name, worker.preferred_days_count
        )));
    }

    if let Some(day) = worker
        .preferred_days
        .iter()
        .find(|day| worker.unavailable_days.contains(day))
    {
        return Err(WorkerValidationError::new(format!(
            "worker '{}' lists {day} as both preferred and unavailable",
            worker.name
        )));
    }

    for (day, constraint) in &worker.constraints {
        if let Some(max_hour) = constraint.max_hour {
            if max_hour > 23 {
                return Err(WorkerValidationError::new(format!(
                    "worker '{}' has invalid maxHour {max_hour} on {day}",
                    worker.name
                )));
            }
        }
        if let Some(total) = constraint.max_total_hours {
            if total > 24 {
                return Err(WorkerValidationError::new(format!(
                    "worker '{}' has invalid maxTotalHours {total} on {day}",
                    worker.name
                )));
            }
        }
    }

    Ok(())
}

pub fn validate_worker_tags(worker: &Worker, tags: &[Tag]) -> Result<(), WorkerValidationError> {
    for tag_id in &worker.tag_ids {
        if !tags.iter().any(|tag| &tag.id == tag_id) {
            return Err(WorkerValidationError::new(format!(
                "worker '{}' references unknown tag {tag_id}",
                worker.name
            )));
        }
    }
    Ok(())
}

pub fn validate_worker_collection(workers: &[Worker]) -> Result<(), WorkerValidationError> {
    let mut seen_ids = HashSet::with_capacity(workers.len());
    for worker in workers {
        if !seen_ids.insert(worker.id.as_str()) {
            return Err(WorkerValidationError::new(format!(
                "duplicate worker id {}",
                worker.id
            )));
        }
        validate_worker(worker)?;
    }
    Ok(())
}

pub fn validate_tag(tag: &Tag) -> Result<(), WorkerValidationError> {
    if tag.name.trim().is_empty() {
        return Err(WorkerValidationError::new("tag requires a name"));
    }
    if tag.color.trim().is_empty() {
        return Err(WorkerValidationError::new(format!(
            "tag '{}' requires a colour",
            tag.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::DayOfWeek;

    #[test]
    fn rejects_inverted_availability() {
        let worker = Worker::new("Kim").with_availability(18, 10);
        assert!(validate_worker(&worker).is_err());
    }

    #[test]
    fn rejects_conflicting_day_lists() {
        let mut worker = Worker::new("Kim");
        worker.preferred_days.push(DayOfWeek::Tuesday);
        worker.unavailable_days.push(DayOfWeek::Tuesday);
        let err = validate_worker(&worker).unwrap_err();
        assert!(err.to_string().contains("Tuesday"));
    }

    #[test]
    fn detects_duplicate_ids() {
        let a = Worker::new("A");
        let mut b = Worker::new("B");
        b.id = a.id.clone();
        assert!(validate_worker_collection(&[a, b]).is_err());
    }

    #[test]
    fn unknown_tag_reference_is_rejected() {
        let mut worker = Worker::new("Lee");
        worker.tag_ids.push("missing".into());
        assert!(validate_worker_tags(&worker, &[]).is_err());
    }
}
