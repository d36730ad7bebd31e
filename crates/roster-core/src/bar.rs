use crate::day::{DAYS, DayOfWeek, OperatingHours, WeeklyHours};
use crate::worker::{Tag, Worker, new_id};
use crate::worker_validation::{self, WorkerValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

pub const DEFAULT_PHOTO_URL: &str =
    "https://images.unsplash.com/photo-1514362545857-3bc16c4c7d1b?w=800&q=80";

/// Headcount needed in one day/hour slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffingRequirement {
    pub day: DayOfWeek,
    pub hour: u8,
    pub needed_count: u32,
    /// Workers that must be part of the slot's crew.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory_worker_ids: Vec<String>,
}

impl StaffingRequirement {
    pub fn new(day: DayOfWeek, hour: u8, needed_count: u32) -> Self {
        Self {
            day,
            hour,
            needed_count,
            mandatory_worker_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub worker_id: String,
    pub day: DayOfWeek,
    pub hour: u8,
}

impl ScheduleEntry {
    pub fn new(worker_id: impl Into<String>, day: DayOfWeek, hour: u8) -> Self {
        Self {
            worker_id: worker_id.into(),
            day,
            hour,
        }
    }
}

/// Needed against assigned headcount for one operating slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCoverage {
    pub day: DayOfWeek,
    pub hour: u8,
    pub needed: u32,
    pub assigned: u32,
    pub missing: u32,
}

#[derive(Debug, Clone)]
pub enum RosterError {
    BarNotFound(String),
    WorkerNotFound(String),
    TagNotFound(String),
    DuplicateId(String),
    NoBarSelected,
    NoWorkers,
    OutsideOperatingHours { day: DayOfWeek, hour: u8 },
    Invalid(String),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::BarNotFound(id) => write!(f, "bar {id} not found"),
            RosterError::WorkerNotFound(id) => write!(f, "worker {id} not found"),
            RosterError::TagNotFound(id) => write!(f, "tag {id} not found"),
            RosterError::DuplicateId(id) => write!(f, "id {id} already exists"),
            RosterError::NoBarSelected => write!(f, "no bar selected"),
            RosterError::NoWorkers => write!(f, "bar has no staff to schedule"),
            RosterError::OutsideOperatingHours { day, hour } => {
                write!(f, "{day} {hour}:00 is outside operating hours")
            }
            RosterError::Invalid(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RosterError {}

impl From<WorkerValidationError> for RosterError {
    fn from(value: WorkerValidationError) -> Self {
        RosterError::Invalid(value.to_string())
    }
}

pub type RosterResult<T> = Result<T, RosterError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub operating_hours: WeeklyHours,
    #[serde(default)]
    pub workers: Vec<Worker>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub requirements: Vec<StaffingRequirement>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

impl Bar {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
    ) -> RosterResult<Self> {
        let bar = Self {
            id: new_id(),
            name: name.into().trim().to_string(),
            address: address.into().trim().to_string(),
            city: city.into().trim().to_string(),
            photo_url: DEFAULT_PHOTO_URL.to_string(),
            operating_hours: WeeklyHours::default(),
            workers: Vec::new(),
            tags: Vec::new(),
            requirements: Vec::new(),
            schedule: Vec::new(),
        };
        bar.validate()?;
        Ok(bar)
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.photo_url = url.trim().to_string();
        }
        self
    }

    pub fn with_operating_hours(mut self, hours: WeeklyHours) -> Self {
        self.operating_hours = hours;
        self
    }

    pub fn validate(&self) -> RosterResult<()> {
        if self.name.trim().is_empty() {
            return Err(RosterError::Invalid("bar name is required".into()));
        }
        if self.address.trim().is_empty() {
            return Err(RosterError::Invalid("bar address is required".into()));
        }
        if self.city.trim().is_empty() {
            return Err(RosterError::Invalid("bar city is required".into()));
        }
        for (day, hours) in self.operating_hours.iter() {
            if !hours.is_valid() {
                return Err(RosterError::Invalid(format!(
                    "invalid operating hours on {day}: {}-{}",
                    hours.open, hours.close
                )));
            }
        }
        worker_validation::validate_worker_collection(&self.workers)?;
        for tag in &self.tags {
            worker_validation::validate_tag(tag)?;
        }
        for worker in &self.workers {
            worker_validation::validate_worker_tags(worker, &self.tags)?;
        }
        self.validate_requirements()
    }

    /// Every requirement sits in an open slot, stays within the worker count,
    /// and names only existing workers as mandatory.
    fn validate_requirements(&self) -> RosterResult<()> {
        let cap = self.workers.len() as u32;
        for requirement in &self.requirements {
            let (day, hour) = (requirement.day, requirement.hour);
            if !self.operating_hours.is_open(day, hour) {
                return Err(RosterError::OutsideOperatingHours { day, hour });
            }
            if requirement.needed_count > cap {
                return Err(RosterError::Invalid(format!(
                    "{day} {hour}:00 needs {} workers but the bar has {cap}",
                    requirement.needed_count
                )));
            }
            if let Some(missing) = requirement
                .mandatory_worker_ids
                .iter()
                .find(|id| self.worker(id).is_none())
            {
                return Err(RosterError::WorkerNotFound(missing.clone()));
            }
            if requirement.mandatory_worker_ids.len() > requirement.needed_count as usize {
                return Err(RosterError::Invalid(format!(
                    "{} mandatory workers exceed the {} needed on {day} {hour}:00",
                    requirement.mandatory_worker_ids.len(),
                    requirement.needed_count
                )));
            }
        }
        Ok(())
    }

    pub fn worker(&self, worker_id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == worker_id)
    }

    pub fn tag(&self, tag_id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag_id)
    }

    pub fn find_worker_by_name(&self, name: &str) -> Option<&Worker> {
        self.workers
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn find_tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn add_worker(&mut self, mut worker: Worker) -> RosterResult<&Worker> {
        worker.normalize();
        worker_validation::validate_worker(&worker)?;
        worker_validation::validate_worker_tags(&worker, &self.tags)?;
        if self.worker(&worker.id).is_some() {
            return Err(RosterError::DuplicateId(worker.id));
        }
        info!(bar = %self.id, worker = %worker.id, name = %worker.name, "worker added");
        self.workers.push(worker);
        Ok(&self.workers[self.workers.len() - 1])
    }

    pub fn update_worker(&mut self, mut worker: Worker) -> RosterResult<()> {
        worker.normalize();
        worker_validation::validate_worker(&worker)?;
        worker_validation::validate_worker_tags(&worker, &self.tags)?;
        let slot = self
            .workers
            .iter_mut()
            .find(|w| w.id == worker.id)
            .ok_or_else(|| RosterError::WorkerNotFound(worker.id.clone()))?;
        debug!(worker = %worker.id, "worker updated");
        *slot = worker;
        Ok(())
    }

    /// Removes the worker together with their shifts and mandatory slots.
    /// Headcounts are re-capped to the remaining staff.
    pub fn remove_worker(&mut self, worker_id: &str) -> RosterResult<Worker> {
        let idx = self
            .workers
            .iter()
            .position(|w| w.id == worker_id)
            .ok_or_else(|| RosterError::WorkerNotFound(worker_id.to_string()))?;
        let removed = self.workers.remove(idx);
        self.schedule.retain(|entry| entry.worker_id != worker_id);
        let cap = self.workers.len() as u32;
        for requirement in &mut self.requirements {
            requirement
                .mandatory_worker_ids
                .retain(|id| id != worker_id);
            requirement.needed_count = requirement.needed_count.min(cap);
            requirement
                .mandatory_worker_ids
                .truncate(requirement.needed_count as usize);
        }
        info!(bar = %self.id, worker = %worker_id, "worker removed");
        Ok(removed)
    }

    pub fn add_tag(&mut self, tag: Tag) -> RosterResult<&Tag> {
        worker_validation::validate_tag(&tag)?;
        if self.tag(&tag.id).is_some() {
            return Err(RosterError::DuplicateId(tag.id));
        }
        debug!(bar = %self.id, tag = %tag.id, name = %tag.name, "tag added");
        self.tags.push(tag);
        Ok(&self.tags[self.tags.len() - 1])
    }

    pub fn update_tag(&mut self, tag: Tag) -> RosterResult<()> {
        worker_validation::validate_tag(&tag)?;
        let slot = self
            .tags
            .iter_mut()
            .find(|t| t.id == tag.id)
            .ok_or_else(|| RosterError::TagNotFound(tag.id.clone()))?;
        *slot = tag;
        Ok(())
    }

    pub fn remove_tag(&mut self, tag_id: &str) -> RosterResult<Tag> {
        let idx = self
            .tags
            .iter()
            .position(|t| t.id == tag_id)
            .ok_or_else(|| RosterError::TagNotFound(tag_id.to_string()))?;
        let removed = self.tags.remove(idx);
        for worker in &mut self.workers {
            worker.tag_ids.retain(|id| id != tag_id);
        }
        debug!(bar = %self.id, tag = %tag_id, "tag removed");
        Ok(removed)
    }

    pub fn assign_tag(&mut self, worker_id: &str, tag_id: &str) -> RosterResult<()> {
        if self.tag(tag_id).is_none() {
            return Err(RosterError::TagNotFound(tag_id.to_string()));
        }
        let worker = self
            .workers
            .iter_mut()
            .find(|w| w.id == worker_id)
            .ok_or_else(|| RosterError::WorkerNotFound(worker_id.to_string()))?;
        if !worker.has_tag(tag_id) {
            worker.tag_ids.push(tag_id.to_string());
        }
        Ok(())
    }

    pub fn unassign_tag(&mut self, worker_id: &str, tag_id: &str) -> RosterResult<()> {
        let worker = self
            .workers
            .iter_mut()
            .find(|w| w.id == worker_id)
            .ok_or_else(|| RosterError::WorkerNotFound(worker_id.to_string()))?;
        worker.tag_ids.retain(|id| id != tag_id);
        Ok(())
    }

    pub fn requirement(&self, day: DayOfWeek, hour: u8) -> u32 {
        self.find_requirement(day, hour)
            .map(|r| r.needed_count)
            .unwrap_or(0)
    }

    pub fn find_requirement(&self, day: DayOfWeek, hour: u8) -> Option<&StaffingRequirement> {
        self.requirements
            .iter()
            .find(|r| r.day == day && r.hour == hour)
    }

    /// Upserts the slot's headcount, capped at the number of workers.
    /// Returns the stored count.
    pub fn set_requirement(&mut self, day: DayOfWeek, hour: u8, count: u32) -> RosterResult<u32> {
        if !self.operating_hours.is_open(day, hour) {
            return Err(RosterError::OutsideOperatingHours { day, hour });
        }
        let cap = self.workers.len() as u32;
        let count = count.min(cap);
        match self
            .requirements
            .iter_mut()
            .find(|r| r.day == day && r.hour == hour)
        {
            Some(existing) => {
                existing.needed_count = count;
                existing.mandatory_worker_ids.truncate(count as usize);
            }
            None => self
                .requirements
                .push(StaffingRequirement::new(day, hour, count)),
        }
        debug!(bar = %self.id, %day, hour, count, "requirement set");
        Ok(count)
    }

    pub fn increment_requirement(&mut self, day: DayOfWeek, hour: u8) -> RosterResult<u32> {
        let current = self.requirement(day, hour);
        self.set_requirement(day, hour, current.saturating_add(1))
    }

    pub fn decrement_requirement(&mut self, day: DayOfWeek, hour: u8) -> RosterResult<u32> {
        let current = self.requirement(day, hour);
        self.set_requirement(day, hour, current.saturating_sub(1))
    }

    /// Bumps `hour` on every day that is open at that hour.
    pub fn increment_hour(&mut self, hour: u8) -> RosterResult<()> {
        for day in DAYS {
            if self.operating_hours.is_open(day, hour) {
                self.increment_requirement(day, hour)?;
            }
        }
        Ok(())
    }

    /// Bumps every operating hour of `day`.
    pub fn increment_day(&mut self, day: DayOfWeek) -> RosterResult<()> {
        for hour in self.operating_hours.hours_for_day(day) {
            self.increment_requirement(day, hour)?;
        }
        Ok(())
    }

    pub fn set_mandatory_workers(
        &mut self,
        day: DayOfWeek,
        hour: u8,
        worker_ids: Vec<String>,
    ) -> RosterResult<()> {
        if let Some(missing) = worker_ids.iter().find(|id| self.worker(id).is_none()) {
            return Err(RosterError::WorkerNotFound(missing.clone()));
        }
        let requirement = self
            .requirements
            .iter_mut()
            .find(|r| r.day == day && r.hour == hour)
            .ok_or_else(|| {
                RosterError::Invalid(format!("no requirement set for {day} {hour}:00"))
            })?;
        if worker_ids.len() > requirement.needed_count as usize {
            return Err(RosterError::Invalid(format!(
                "{} mandatory workers exceed the {} needed on {day} {hour}:00",
                worker_ids.len(),
                requirement.needed_count
            )));
        }
        requirement.mandatory_worker_ids = worker_ids;
        Ok(())
    }

    pub fn set_operating_hours(&mut self, day: DayOfWeek, hours: OperatingHours) -> RosterResult<()> {
        if !hours.is_valid() {
            return Err(RosterError::Invalid(format!(
                "invalid operating hours on {day}: {}-{}",
                hours.open, hours.close
            )));
        }
        self.operating_hours.set(day, hours);
        let before = self.requirements.len();
        self.requirements
            .retain(|r| r.day != day || hours.contains(r.hour));
        let dropped = before - self.requirements.len();
        if dropped > 0 {
            debug!(bar = %self.id, %day, dropped, "requirements outside new hours dropped");
        }
        Ok(())
    }

    /// Stores generator output. Entries naming unknown workers or impossible
    /// hours are dropped; everything else is kept verbatim.
    pub fn replace_schedule(&mut self, entries: Vec<ScheduleEntry>) -> usize {
        let total = entries.len();
        let kept: Vec<ScheduleEntry> = entries
            .into_iter()
            .filter(|entry| {
                let known = self.worker(&entry.worker_id).is_some();
                if !known {
                    warn!(bar = %self.id, worker = %entry.worker_id, "dropping entry for unknown worker");
                }
                if entry.hour > 23 {
                    warn!(bar = %self.id, hour = entry.hour, "dropping entry with invalid hour");
                }
                known && entry.hour <= 23
            })
            .collect();
        info!(bar = %self.id, kept = kept.len(), dropped = total - kept.len(), "schedule replaced");
        self.schedule = kept;
        self.schedule.len()
    }

    pub fn clear_schedule(&mut self) {
        self.schedule.clear();
    }

    pub fn staff_for_slot(&self, day: DayOfWeek, hour: u8) -> Vec<&Worker> {
        self.schedule
            .iter()
            .filter(|entry| entry.day == day && entry.hour == hour)
            .filter_map(|entry| self.worker(&entry.worker_id))
            .collect()
    }

    pub fn coverage(&self) -> Vec<SlotCoverage> {
        let mut slots = Vec::new();
        for (day, hours) in self.operating_hours.iter() {
            for hour in hours.hours() {
                let needed = self.requirement(day, hour);
                let assigned = self.staff_for_slot(day, hour).len() as u32;
                slots.push(SlotCoverage {
                    day,
                    hour,
                    needed,
                    assigned,
                    missing: needed.saturating_sub(assigned),
                });
            }
        }
        slots
    }

    pub fn understaffed_slots(&self) -> Vec<SlotCoverage> {
        self.coverage()
            .into_iter()
            .filter(|slot| slot.missing > 0)
            .collect()
    }

    pub fn hours_for_worker(&self, worker_id: &str) -> usize {
        self.schedule
            .iter()
            .filter(|entry| entry.worker_id == worker_id)
            .count()
    }
}
