use bar_roster::session::AUTH_STORAGE_KEY;
use bar_roster::workspace::bars_key;
use bar_roster::{
    AccountError, Bar, DayOfWeek, GenerationError, GenerationRequest, KeyValueStore, MemoryStore,
    RosterError, ScheduleEntry, ScheduleGenerator, Session, SessionError, UserProfile, Worker,
    generator::GenerationResult,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a canned roster built from the request it is given.
struct FakeGenerator {
    fail: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl FakeGenerator {
    fn succeeding() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }
}

impl ScheduleGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<Vec<ScheduleEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail {
            return Err(GenerationError::Api {
                status: 503,
                body: "overloaded".into(),
            });
        }
        let mut entries: Vec<ScheduleEntry> = request
            .workers
            .iter()
            .map(|w| ScheduleEntry::new(w.id.clone(), DayOfWeek::Monday, 12))
            .collect();
        entries.push(ScheduleEntry::new("nobody", DayOfWeek::Monday, 12));
        Ok(entries)
    }
}

fn profile(username: &str) -> UserProfile {
    UserProfile::new(username, format!("{username}@example.com"), "5550100")
}

fn session_with_bar(store: &MemoryStore) -> Session<&MemoryStore> {
    let mut session = Session::new(store);
    session.register(profile("owner")).unwrap();
    let bar_id = session
        .add_bar(Bar::new("Corner Tap", "3 Main St", "Austin").unwrap())
        .unwrap();
    session.select_bar(&bar_id).unwrap();
    session
}

#[test]
fn registration_starts_a_session_that_survives_restart() {
    let store = MemoryStore::new();
    {
        let mut session = Session::new(&store);
        let user = session.register(profile("Maya")).unwrap();
        assert_eq!(user.country_code, "+1");
    }
    assert!(store.get_item(AUTH_STORAGE_KEY).unwrap().is_some());

    let restored = Session::restore(&store).unwrap();
    assert_eq!(restored.user().unwrap().username, "Maya");
    assert!(restored.selected_bar_id().is_none());
}

#[test]
fn usernames_are_unique_ignoring_case() {
    let store = MemoryStore::new();
    let mut session = Session::new(&store);
    session.register(profile("Maya")).unwrap();
    session.logout().unwrap();

    let err = session.register(profile("maya")).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Account(AccountError::UsernameExists(_))
    ));

    let user = session.login("MAYA").unwrap();
    assert_eq!(user.username, "Maya");

    let err = session.login("nobody").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Account(AccountError::UnknownUser(_))
    ));
}

#[test]
fn corrupt_session_record_logs_out() {
    let store = MemoryStore::new();
    store.set_item(AUTH_STORAGE_KEY, "not-a-user").unwrap();

    let session = Session::restore(&store).unwrap();
    assert!(session.user().is_none());
    assert!(store.get_item(AUTH_STORAGE_KEY).unwrap().is_none());
}

#[test]
fn logout_clears_selection_and_session_key() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    session.logout().unwrap();

    assert!(session.user().is_none());
    assert!(session.selected_bar_id().is_none());
    assert!(session.bars().is_empty());
    assert!(store.get_item(AUTH_STORAGE_KEY).unwrap().is_none());
    assert!(matches!(
        session.current_bar(),
        Err(SessionError::NotLoggedIn)
    ));
}

#[test]
fn deleting_the_selected_bar_returns_to_the_list() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    let bar_id = session.selected_bar_id().unwrap().to_string();

    session.delete_bar(&bar_id).unwrap();
    assert!(session.selected_bar_id().is_none());
    let user_id = session.user().unwrap().id.clone();
    assert_eq!(
        store.get_item(&bars_key(&user_id)).unwrap().as_deref(),
        Some("[]")
    );
}

#[test]
fn failed_bar_mutation_changes_nothing() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    session
        .update_current_bar(|bar| bar.add_worker(Worker::new("Ana")).map(|_| ()))
        .unwrap();

    let err = session
        .update_current_bar(|bar| {
            bar.set_requirement(DayOfWeek::Monday, 10, 1)?;
            bar.set_requirement(DayOfWeek::Monday, 1, 1)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Roster(RosterError::OutsideOperatingHours { .. })
    ));
    assert_eq!(
        session.current_bar().unwrap().requirement(DayOfWeek::Monday, 10),
        0
    );
}

#[tokio::test]
async fn generated_schedule_replaces_and_persists() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    session
        .update_current_bar(|bar| {
            bar.add_worker(Worker::new("Ana"))?;
            bar.add_worker(Worker::new("Ben"))?;
            bar.set_requirement(DayOfWeek::Monday, 12, 2)
        })
        .unwrap();

    let generator = FakeGenerator::succeeding();
    let kept = session.generate_schedule(&generator).await.unwrap();
    assert_eq!(kept, 2);

    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.workers.len(), 2);
    assert_eq!(request.requirements.len(), 1);

    let bar = session.current_bar().unwrap();
    assert!(bar.understaffed_slots().is_empty());

    let user_id = session.user().unwrap().id.clone();
    let restored = Session::restore(&store).unwrap();
    assert_eq!(restored.user().unwrap().id, user_id);
    assert_eq!(restored.bars()[0].schedule.len(), 2);
}

#[tokio::test]
async fn failed_generation_keeps_previous_schedule() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    session
        .update_current_bar(|bar| bar.add_worker(Worker::new("Ana")).map(|_| ()))
        .unwrap();
    session
        .generate_schedule(&FakeGenerator::succeeding())
        .await
        .unwrap();
    let before = session.current_bar().unwrap().schedule.clone();

    let err = session
        .generate_schedule(&FakeGenerator::failing())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Generation(GenerationError::Api { status: 503, .. })
    ));
    assert_eq!(session.current_bar().unwrap().schedule, before);
}

#[tokio::test]
async fn generation_requires_staff() {
    let store = MemoryStore::new();
    let mut session = session_with_bar(&store);
    let generator = FakeGenerator::succeeding();

    let err = session.generate_schedule(&generator).await.unwrap_err();
    assert!(matches!(err, SessionError::Roster(RosterError::NoWorkers)));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn export_requires_a_schedule() {
    let store = MemoryStore::new();
    let session = session_with_bar(&store);
    let mut out = Vec::new();
    assert!(session.export_schedule_csv(&mut out).is_err());
}

#[test]
fn profile_updates_recheck_usernames_and_refresh_the_session() {
    let store = MemoryStore::new();
    let mut session = Session::new(&store);
    session.register(profile("Maya")).unwrap();
    session.logout().unwrap();
    let user_id = session.register(profile("Noor")).unwrap().id.clone();

    let err = session.update_profile(profile("MAYA")).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Account(AccountError::UsernameExists(_))
    ));

    let err = session
        .update_profile(UserProfile::new("Noor", "", "5550100"))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Account(AccountError::MissingInformation)
    ));

    let mut renamed = profile("NOOR");
    renamed.email = "noor@bar.example".into();
    renamed.country_code = Some("+44".into());
    let updated = session.update_profile(renamed).unwrap();
    assert_eq!(updated.id, user_id);
    assert_eq!(updated.username, "NOOR");

    let restored = Session::restore(&store).unwrap();
    let user = restored.user().unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.email, "noor@bar.example");
    assert_eq!(user.country_code, "+44");

    let mut fresh = Session::new(&store);
    assert_eq!(fresh.login("noor").unwrap().email, "noor@bar.example");
}
