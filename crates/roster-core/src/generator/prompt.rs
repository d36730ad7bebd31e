use super::{GenerationError, GenerationRequest, GenerationResult};
use crate::day::format_hour;
use std::fmt::Write;

const RULES: &str = "\
SCHEDULING RULES (PRIORITY ORDER):
1. HARD CONSTRAINT: Workers MUST NOT work outside their \"possibleStart\" to \"possibleEnd\" range.
2. HARD CONSTRAINT: Staffing requirements MUST be met exactly if possible. Workers listed in \"mandatoryWorkerIds\" MUST be part of that slot.
3. HARD CONSTRAINT: Workers MUST NOT work on their \"unavailableDays\".
4. HARD CONSTRAINT: Respect per-day \"constraints\" (\"maxHour\" is the last hour that day, \"maxTotalHours\" caps hours that day).
5. HARD CONSTRAINT: Only schedule hours when the bar is open.
6. PREFERENCE: Try to assign workers to work their \"preferredDaysCount\" total days per week, favouring their \"preferredDays\".
7. PREFERENCE: Try to keep shifts within \"preferredStart\" and \"preferredEnd\". Workers marked \"isFlexible\" may be stretched first.
8. EFFICIENCY: Shifts should be contiguous (no split shifts).
9. BALANCE: Distribute evening/early shifts fairly.";

/// Renders the natural-language instruction sent to the model.
pub fn build_prompt(request: &GenerationRequest) -> GenerationResult<String> {
    let workers = serde_json::to_string_pretty(&request.workers)
        .map_err(|err| GenerationError::Encode(err.to_string()))?;
    let requirements = serde_json::to_string_pretty(&request.requirements)
        .map_err(|err| GenerationError::Encode(err.to_string()))?;

    let mut hours = String::new();
    for (day, window) in request.operating_hours.iter() {
        // Writing to a String cannot fail.
        let _ = writeln!(
            hours,
            "- {day}: {} ({}) to {} ({})",
            format_hour(window.open),
            window.open,
            format_hour(window.close),
            window.close
        );
    }

    Ok(format!(
        "You are an expert workforce scheduler. Create an hourly staff schedule for a bar.\n\
         \n\
         BAR HOURS (inclusive hour slots, a close earlier than open runs past midnight):\n\
         {hours}\n\
         WORKERS:\n\
         {workers}\n\
         \n\
         STAFFING REQUIREMENTS (How many people needed per hour per day):\n\
         {requirements}\n\
         \n\
         {RULES}\n\
         \n\
         Output a valid JSON array of ScheduleEntry objects, each shaped \
         {{\"workerId\": string, \"day\": \"Monday\"..\"Sunday\", \"hour\": number}}.\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::StaffingRequirement;
    use crate::day::{DayOfWeek, OperatingHours, WeeklyHours};
    use crate::worker::Worker;

    fn request() -> GenerationRequest {
        let mut hours = WeeklyHours::default();
        hours.set(DayOfWeek::Saturday, OperatingHours::new(18, 2));
        GenerationRequest {
            workers: vec![Worker::new("Sarah Jenkins")],
            requirements: vec![StaffingRequirement::new(DayOfWeek::Monday, 10, 2)],
            operating_hours: hours,
        }
    }

    #[test]
    fn prompt_embeds_workers_and_requirements_as_json() {
        let prompt = build_prompt(&request()).unwrap();
        assert!(prompt.contains("\"name\": \"Sarah Jenkins\""));
        assert!(prompt.contains("\"neededCount\": 2"));
        assert!(prompt.contains("\"possibleStart\": 4"));
    }

    #[test]
    fn prompt_lists_each_day_window() {
        let prompt = build_prompt(&request()).unwrap();
        assert!(prompt.contains("- Monday: 4 AM (4) to 8 PM (20)"));
        assert!(prompt.contains("- Saturday: 6 PM (18) to 2 AM (2)"));
    }

    #[test]
    fn rules_are_ordered_hard_before_soft() {
        let prompt = build_prompt(&request()).unwrap();
        let hard = prompt.find("HARD CONSTRAINT").unwrap();
        let soft = prompt.find("PREFERENCE").unwrap();
        assert!(hard < soft);
        assert!(prompt.trim_end().ends_with("\"hour\": number}."));
    }
}
