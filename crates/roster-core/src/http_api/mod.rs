use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AccountError, Bar, DayOfWeek, GenerationError, GenerationRequest, KeyValueStore,
    OperatingHours, PersistenceError, RosterError, ScheduleEntry, ScheduleGenerator, SlotCoverage,
    StaffingRequirement, Tag, User, UserDirectory, UserProfile, WeeklyHours, Worker, Workspace,
    export,
};

pub type SharedStore = Arc<dyn KeyValueStore + Send + Sync>;

pub struct AppState<G> {
    store: SharedStore,
    generator: Arc<G>,
    // Serialises read-modify-write cycles on stored documents.
    write_lock: Arc<Mutex<()>>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            generator: self.generator.clone(),
            write_lock: self.write_lock.clone(),
        }
    }
}

impl<G> AppState<G> {
    pub fn new(store: SharedStore, generator: G) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn require_user(&self, user_id: &str) -> Result<User, ApiError> {
        UserDirectory::new(self.store.as_ref())
            .find_by_id(user_id)?
            .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))
    }

    fn read_workspace(&self, user_id: &str) -> Result<Workspace, ApiError> {
        self.require_user(user_id)?;
        Ok(Workspace::load(self.store.as_ref(), user_id)?)
    }

    /// Loads, mutates and saves a user's workspace under the write lock.
    fn mutate_workspace<F, T>(&self, user_id: &str, mutator: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Workspace) -> Result<T, RosterError>,
    {
        let _guard = self.write_lock.lock();
        let mut workspace = self.read_workspace(user_id)?;
        let value = mutator(&mut workspace)?;
        workspace.save(self.store.as_ref())?;
        Ok(value)
    }

    fn mutate_bar<F, T>(&self, user_id: &str, bar_id: &str, mutator: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Bar) -> Result<T, RosterError>,
    {
        self.mutate_workspace(user_id, |workspace| {
            workspace.update_bar_with(bar_id, mutator)
        })
    }

    fn read_bar(&self, user_id: &str, bar_id: &str) -> Result<Bar, ApiError> {
        let workspace = self.read_workspace(user_id)?;
        workspace
            .bar(bar_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("bar {bar_id} not found")))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Generation(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<RosterError> for ApiError {
    fn from(value: RosterError) -> Self {
        match value {
            RosterError::BarNotFound(_)
            | RosterError::WorkerNotFound(_)
            | RosterError::TagNotFound(_) => ApiError::NotFound(value.to_string()),
            RosterError::DuplicateId(_) => ApiError::Conflict(value.to_string()),
            _ => ApiError::Invalid(value.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::InvalidData(message) => ApiError::Invalid(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::UsernameExists(_) => ApiError::Conflict(value.to_string()),
            AccountError::UnknownUser(_) => ApiError::NotFound(value.to_string()),
            AccountError::Persistence(err) => err.into(),
            _ => ApiError::Invalid(value.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(value: GenerationError) -> Self {
        ApiError::Generation(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Generation(message) => (StatusCode::BAD_GATEWAY, "generation_failed", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewBarPayload {
    name: String,
    address: String,
    city: String,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    operating_hours: Option<WeeklyHours>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequirementPayload {
    day: DayOfWeek,
    hour: u8,
    needed_count: u32,
    #[serde(default)]
    mandatory_worker_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct GenerateSummary {
    entries: usize,
    schedule: Vec<ScheduleEntry>,
}

pub fn router<G>(state: AppState<G>) -> Router
where
    G: ScheduleGenerator + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/users", post(register_user::<G>))
        .route("/users/:user_id", get(get_user::<G>))
        .route("/users/:user_id/bars", get(list_bars::<G>).post(create_bar::<G>))
        .route(
            "/users/:user_id/bars/:bar_id",
            get(get_bar::<G>).put(update_bar::<G>).delete(delete_bar::<G>),
        )
        .route("/users/:user_id/bars/:bar_id/workers", post(add_worker::<G>))
        .route(
            "/users/:user_id/bars/:bar_id/workers/:worker_id",
            put(update_worker::<G>).delete(remove_worker::<G>),
        )
        .route("/users/:user_id/bars/:bar_id/tags", post(add_tag::<G>))
        .route(
            "/users/:user_id/bars/:bar_id/tags/:tag_id",
            put(update_tag::<G>).delete(remove_tag::<G>),
        )
        .route(
            "/users/:user_id/bars/:bar_id/requirements",
            put(set_requirement::<G>),
        )
        .route(
            "/users/:user_id/bars/:bar_id/hours/:day",
            put(set_operating_hours::<G>),
        )
        .route("/users/:user_id/bars/:bar_id/schedule", get(get_schedule::<G>))
        .route(
            "/users/:user_id/bars/:bar_id/schedule/generate",
            post(generate_schedule::<G>),
        )
        .route(
            "/users/:user_id/bars/:bar_id/schedule.csv",
            get(export_schedule::<G>),
        )
        .route("/users/:user_id/bars/:bar_id/coverage", get(get_coverage::<G>))
        .with_state(state)
}

pub async fn serve<G>(addr: SocketAddr, state: AppState<G>) -> std::io::Result<()>
where
    G: ScheduleGenerator + Send + Sync + 'static,
{
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn register_user<G>(
    State(state): State<AppState<G>>,
    Json(profile): Json<UserProfile>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = {
        let _guard = state.write_lock.lock();
        UserDirectory::new(state.store.as_ref()).register(profile)?
    };
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user<G>(
    State(state): State<AppState<G>>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.require_user(&user_id)?))
}

async fn list_bars<G>(
    State(state): State<AppState<G>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Bar>>, ApiError> {
    let workspace = state.read_workspace(&user_id)?;
    Ok(Json(workspace.bars().to_vec()))
}

async fn create_bar<G>(
    State(state): State<AppState<G>>,
    Path(user_id): Path<String>,
    Json(payload): Json<NewBarPayload>,
) -> Result<(StatusCode, Json<Bar>), ApiError> {
    let mut bar = Bar::new(payload.name, payload.address, payload.city)?;
    if let Some(url) = payload.photo_url {
        bar = bar.with_photo_url(url);
    }
    if let Some(hours) = payload.operating_hours {
        bar = bar.with_operating_hours(hours);
    }
    let created = state.mutate_workspace(&user_id, |workspace| {
        workspace.add_bar(bar).map(Bar::clone)
    })?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_bar<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<Json<Bar>, ApiError> {
    Ok(Json(state.read_bar(&user_id, &bar_id)?))
}

async fn update_bar<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
    Json(bar): Json<Bar>,
) -> Result<Json<Bar>, ApiError> {
    if bar.id != bar_id {
        return Err(ApiError::invalid(
            "bar id in payload does not match path parameter",
        ));
    }
    state.mutate_workspace(&user_id, |workspace| workspace.update_bar(bar))?;
    Ok(Json(state.read_bar(&user_id, &bar_id)?))
}

async fn delete_bar<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.mutate_workspace(&user_id, |workspace| workspace.delete_bar(&bar_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_worker<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
    Json(worker): Json<Worker>,
) -> Result<(StatusCode, Json<Worker>), ApiError> {
    let created = state.mutate_bar(&user_id, &bar_id, |bar| {
        bar.add_worker(worker).map(Worker::clone)
    })?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_worker<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id, worker_id)): Path<(String, String, String)>,
    Json(worker): Json<Worker>,
) -> Result<Json<Worker>, ApiError> {
    if worker.id != worker_id {
        return Err(ApiError::invalid(
            "worker id in payload does not match path parameter",
        ));
    }
    let updated = state.mutate_bar(&user_id, &bar_id, |bar| {
        bar.update_worker(worker)?;
        bar.worker(&worker_id)
            .cloned()
            .ok_or_else(|| RosterError::WorkerNotFound(worker_id.clone()))
    })?;
    Ok(Json(updated))
}

async fn remove_worker<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id, worker_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state.mutate_bar(&user_id, &bar_id, |bar| bar.remove_worker(&worker_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_tag<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
    Json(tag): Json<Tag>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let created = state.mutate_bar(&user_id, &bar_id, |bar| bar.add_tag(tag).map(Tag::clone))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_tag<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id, tag_id)): Path<(String, String, String)>,
    Json(tag): Json<Tag>,
) -> Result<Json<Tag>, ApiError> {
    if tag.id != tag_id {
        return Err(ApiError::invalid(
            "tag id in payload does not match path parameter",
        ));
    }
    let stored = tag.clone();
    state.mutate_bar(&user_id, &bar_id, |bar| bar.update_tag(tag))?;
    Ok(Json(stored))
}

async fn remove_tag<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id, tag_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state.mutate_bar(&user_id, &bar_id, |bar| bar.remove_tag(&tag_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_requirement<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
    Json(payload): Json<RequirementPayload>,
) -> Result<Json<StaffingRequirement>, ApiError> {
    let stored = state.mutate_bar(&user_id, &bar_id, |bar| {
        bar.set_requirement(payload.day, payload.hour, payload.needed_count)?;
        if let Some(ids) = payload.mandatory_worker_ids {
            bar.set_mandatory_workers(payload.day, payload.hour, ids)?;
        }
        bar.find_requirement(payload.day, payload.hour)
            .cloned()
            .ok_or_else(|| RosterError::Invalid("requirement missing after update".into()))
    })?;
    Ok(Json(stored))
}

async fn set_operating_hours<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id, day)): Path<(String, String, String)>,
    Json(hours): Json<OperatingHours>,
) -> Result<Json<OperatingHours>, ApiError> {
    let day: DayOfWeek = day
        .parse()
        .map_err(|err: crate::day::ParseDayError| ApiError::invalid(err.to_string()))?;
    state.mutate_bar(&user_id, &bar_id, |bar| bar.set_operating_hours(day, hours))?;
    Ok(Json(hours))
}

async fn get_schedule<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    Ok(Json(state.read_bar(&user_id, &bar_id)?.schedule))
}

async fn get_coverage<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<Json<Vec<SlotCoverage>>, ApiError> {
    Ok(Json(state.read_bar(&user_id, &bar_id)?.coverage()))
}

async fn generate_schedule<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<Json<GenerateSummary>, ApiError>
where
    G: ScheduleGenerator + Send + Sync + 'static,
{
    let bar = state.read_bar(&user_id, &bar_id)?;
    if bar.workers.is_empty() {
        return Err(RosterError::NoWorkers.into());
    }
    let request = GenerationRequest::from_bar(&bar);
    let entries = state.generator.generate(&request).await.map_err(|err| {
        warn!(bar = %bar_id, error = %err, "schedule generation failed");
        ApiError::from(err)
    })?;
    let schedule = state.mutate_bar(&user_id, &bar_id, |bar| {
        bar.replace_schedule(entries);
        Ok(bar.schedule.clone())
    })?;
    Ok(Json(GenerateSummary {
        entries: schedule.len(),
        schedule,
    }))
}

async fn export_schedule<G>(
    State(state): State<AppState<G>>,
    Path((user_id, bar_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bar = state.read_bar(&user_id, &bar_id)?;
    let body = export::schedule_csv_string(&bar)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_file_name(&bar)
            .chars()
            .filter(|c| *c != '"' && !c.is_control())
            .collect::<String>()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
