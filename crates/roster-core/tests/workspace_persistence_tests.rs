use bar_roster::workspace::bars_key;
use bar_roster::{
    Bar, DayOfWeek, FileStore, KeyValueStore, OperatingHours, ScheduleEntry, Tag, Worker, Workspace,
};
use tempfile::TempDir;

fn sample_bar() -> Bar {
    let mut bar = Bar::new("Night Owl", "22 Canal Rd", "Leeds").unwrap();
    bar.set_operating_hours(DayOfWeek::Saturday, OperatingHours::new(18, 2))
        .unwrap();
    let tag_id = bar.add_tag(Tag::new("Door")).unwrap().id.clone();
    let worker_id = bar
        .add_worker(Worker::new("Dana").with_availability(6, 23))
        .unwrap()
        .id
        .clone();
    bar.assign_tag(&worker_id, &tag_id).unwrap();
    bar.set_requirement(DayOfWeek::Saturday, 1, 1).unwrap();
    bar.replace_schedule(vec![ScheduleEntry::new(
        worker_id.clone(),
        DayOfWeek::Monday,
        9,
    )]);
    bar
}

fn assert_round_trip<S: KeyValueStore>(store: &S) {
    let mut workspace = Workspace::empty("user-1");
    let bar_id = workspace.add_bar(sample_bar()).unwrap().id.clone();
    workspace.save(store).unwrap();
    assert!(workspace.last_saved().is_some());

    let reloaded = Workspace::load(store, "user-1").unwrap();
    assert_eq!(reloaded.bars(), workspace.bars());
    let bar = reloaded.bar(&bar_id).unwrap();
    assert_eq!(
        bar.operating_hours.get(DayOfWeek::Saturday),
        OperatingHours::new(18, 2)
    );
    assert_eq!(bar.requirement(DayOfWeek::Saturday, 1), 1);
    assert_eq!(bar.workers[0].tag_ids.len(), 1);

    // Other users never see this workspace.
    assert!(Workspace::load(store, "user-2").unwrap().bars().is_empty());
}

#[test]
fn file_store_round_trips_workspace() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    assert_round_trip(&store);
    assert!(dir.path().join("bar_shift_master_user_user-1_bars.json").exists());
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_round_trips_workspace() {
    let dir = TempDir::new().unwrap();
    let store = bar_roster::SqliteStore::new(dir.path().join("roster.db")).unwrap();
    assert_round_trip(&store);

    // A second connection to the same file sees the saved document.
    let reopened = bar_roster::SqliteStore::new(dir.path().join("roster.db")).unwrap();
    assert_eq!(Workspace::load(&reopened, "user-1").unwrap().bars().len(), 1);
}

#[test]
fn stored_document_uses_camel_case_fields() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let mut workspace = Workspace::empty("user-1");
    workspace.add_bar(sample_bar()).unwrap();
    workspace.save(&store).unwrap();

    let raw = store.get_item(&bars_key("user-1")).unwrap().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let bar = &doc[0];
    assert!(bar.get("photoUrl").is_some());
    assert!(bar.get("operatingHours").is_some());
    assert_eq!(bar["workers"][0]["possibleStart"], 6);
    assert_eq!(bar["schedule"][0]["workerId"], bar["workers"][0]["id"]);
    assert_eq!(bar["schedule"][0]["day"], "Monday");
    assert_eq!(bar["requirements"][0]["neededCount"], 1);
}

#[test]
fn corrupt_document_loads_empty_and_is_left_in_place() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.set_item(&bars_key("user-1"), "{not json").unwrap();

    let workspace = Workspace::load(&store, "user-1").unwrap();
    assert!(workspace.bars().is_empty());
    assert_eq!(
        store.get_item(&bars_key("user-1")).unwrap().as_deref(),
        Some("{not json")
    );
}

#[test]
fn empty_workspace_is_still_written() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let mut workspace = Workspace::empty("user-1");
    let bar_id = workspace.add_bar(sample_bar()).unwrap().id.clone();
    workspace.save(&store).unwrap();

    workspace.delete_bar(&bar_id).unwrap();
    workspace.save(&store).unwrap();
    assert_eq!(
        store.get_item(&bars_key("user-1")).unwrap().as_deref(),
        Some("[]")
    );
}

#[test]
fn documents_missing_optional_fields_load_with_defaults() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let raw = r#"[{"id":"b1","name":"Legacy","address":"1 Old St","city":"York"}]"#;
    store.set_item(&bars_key("user-1"), raw).unwrap();

    let workspace = Workspace::load(&store, "user-1").unwrap();
    let bar = workspace.bar("b1").unwrap();
    assert!(bar.workers.is_empty());
    assert!(bar.schedule.is_empty());
    assert_eq!(bar.operating_hours.hours_for_day(DayOfWeek::Monday).len(), 17);
}
