use crate::bar::Bar;
use crate::day::DAYS;
use crate::persistence::{PersistenceError, PersistenceResult};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const CSV_HEADER: [&str; 3] = ["Day", "Hour", "Worker Name"];

#[derive(Debug, Serialize)]
struct RosterCsvRecord<'a> {
    day: &'a str,
    hour: String,
    worker_name: &'a str,
}

fn ensure_schedule(bar: &Bar) -> PersistenceResult<()> {
    if bar.schedule.is_empty() {
        return Err(PersistenceError::InvalidData(format!(
            "bar '{}' has no schedule to export",
            bar.name
        )));
    }
    Ok(())
}

/// `{bar name}_schedule.csv`, with path separators replaced and control
/// characters removed so the name is a single file in the working directory.
pub fn export_file_name(bar: &Bar) -> String {
    let stem: String = bar
        .name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{stem}_schedule.csv")
}

/// Writes the roster as `Day,Hour,Worker Name` rows: days in week order,
/// hours in opening order, and slot entries in schedule order. Entries for
/// removed workers or closed hours are left out.
pub fn write_schedule_csv<W: Write>(bar: &Bar, writer: W) -> PersistenceResult<usize> {
    ensure_schedule(bar)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    let mut rows = 0;
    for day in DAYS {
        for hour in bar.operating_hours.hours_for_day(day) {
            for worker in bar.staff_for_slot(day, hour) {
                csv_writer.serialize(RosterCsvRecord {
                    day: day.as_str(),
                    hour: format!("{hour}:00"),
                    worker_name: &worker.name,
                })?;
                rows += 1;
            }
        }
    }
    csv_writer.flush()?;
    Ok(rows)
}

pub fn schedule_csv_string(bar: &Bar) -> PersistenceResult<String> {
    let mut buffer = Vec::new();
    write_schedule_csv(bar, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(bar: &Bar, path: P) -> PersistenceResult<usize> {
    ensure_schedule(bar)?;
    let file = File::create(path)?;
    write_schedule_csv(bar, file)
}
