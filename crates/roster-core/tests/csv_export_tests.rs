use bar_roster::{
    Bar, DayOfWeek, OperatingHours, ScheduleEntry, Worker, export_file_name, save_schedule_to_csv,
    schedule_csv_string,
};
use tempfile::TempDir;

fn rostered_bar() -> Bar {
    let mut bar = Bar::new("Blue Door", "5 Harbour Way", "Cork").unwrap();
    let ana = bar.add_worker(Worker::new("Ana")).unwrap().id.clone();
    let ben = bar.add_worker(Worker::new("Ben")).unwrap().id.clone();
    bar.replace_schedule(vec![
        ScheduleEntry::new(ben.clone(), DayOfWeek::Tuesday, 9),
        ScheduleEntry::new(ana.clone(), DayOfWeek::Monday, 14),
        ScheduleEntry::new(ben.clone(), DayOfWeek::Monday, 14),
        ScheduleEntry::new(ana.clone(), DayOfWeek::Monday, 8),
    ]);
    bar
}

#[test]
fn rows_follow_week_then_hour_order() {
    let csv = schedule_csv_string(&rostered_bar()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Day,Hour,Worker Name",
            "Monday,8:00,Ana",
            "Monday,14:00,Ana",
            "Monday,14:00,Ben",
            "Tuesday,9:00,Ben",
        ]
    );
}

#[test]
fn after_midnight_hours_follow_the_evening() {
    let mut bar = rostered_bar();
    bar.set_operating_hours(DayOfWeek::Monday, OperatingHours::new(20, 2))
        .unwrap();
    let ana = bar.find_worker_by_name("Ana").unwrap().id.clone();
    bar.replace_schedule(vec![
        ScheduleEntry::new(ana.clone(), DayOfWeek::Monday, 1),
        ScheduleEntry::new(ana.clone(), DayOfWeek::Monday, 22),
        // Outside the new window, so not exported.
        ScheduleEntry::new(ana.clone(), DayOfWeek::Monday, 12),
    ]);

    let csv = schedule_csv_string(&bar).unwrap();
    let lines: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(lines, vec!["Monday,22:00,Ana", "Monday,1:00,Ana"]);
}

#[test]
fn names_with_commas_are_quoted() {
    let mut bar = Bar::new("Quotes", "1 St", "Town").unwrap();
    let id = bar
        .add_worker(Worker::new("Smith, Jo"))
        .unwrap()
        .id
        .clone();
    bar.replace_schedule(vec![ScheduleEntry::new(id, DayOfWeek::Sunday, 10)]);

    let csv = schedule_csv_string(&bar).unwrap();
    assert!(csv.contains("Sunday,10:00,\"Smith, Jo\""));
}

#[test]
fn empty_schedule_is_not_exported() {
    let bar = Bar::new("Quiet", "2 St", "Town").unwrap();
    assert!(schedule_csv_string(&bar).is_err());
}

#[test]
fn file_export_uses_bar_name() {
    let bar = rostered_bar();
    assert_eq!(export_file_name(&bar), "Blue Door_schedule.csv");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join(export_file_name(&bar));
    let rows = save_schedule_to_csv(&bar, &path).unwrap();
    assert_eq!(rows, 4);
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("Day,Hour,Worker Name\n"));
}

#[test]
fn file_name_strips_path_separators_and_control_characters() {
    let mut bar = rostered_bar();
    bar.name = "Up/Down\\Bar\nTwo".into();
    assert_eq!(export_file_name(&bar), "Up_Down_BarTwo_schedule.csv");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join(export_file_name(&bar));
    assert_eq!(save_schedule_to_csv(&bar, &path).unwrap(), 4);
    assert!(path.exists());
}
