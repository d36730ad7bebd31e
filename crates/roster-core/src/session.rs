use crate::accounts::{AccountError, User, UserDirectory, UserProfile};
use crate::bar::{Bar, RosterError};
use crate::export;
use crate::generator::{GenerationError, GenerationRequest, ScheduleGenerator};
use crate::persistence::{KeyValueStore, PersistenceError, save_json};
use crate::workspace::Workspace;
use std::fmt;
use std::io::Write;
use tracing::{error, info, warn};

pub const AUTH_STORAGE_KEY: &str = "bar_shift_master_session";

#[derive(Debug)]
pub enum SessionError {
    NotLoggedIn,
    Account(AccountError),
    Roster(RosterError),
    Persistence(PersistenceError),
    Generation(GenerationError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotLoggedIn => write!(f, "not logged in"),
            SessionError::Account(err) => write!(f, "{err}"),
            SessionError::Roster(err) => write!(f, "{err}"),
            SessionError::Persistence(err) => write!(f, "{err}"),
            SessionError::Generation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<AccountError> for SessionError {
    fn from(value: AccountError) -> Self {
        SessionError::Account(value)
    }
}

impl From<RosterError> for SessionError {
    fn from(value: RosterError) -> Self {
        SessionError::Roster(value)
    }
}

impl From<PersistenceError> for SessionError {
    fn from(value: PersistenceError) -> Self {
        SessionError::Persistence(value)
    }
}

impl From<GenerationError> for SessionError {
    fn from(value: GenerationError) -> Self {
        SessionError::Generation(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// The logged-in user, their workspace, and the bar being managed.
pub struct Session<S: KeyValueStore> {
    store: S,
    user: Option<User>,
    workspace: Option<Workspace>,
    selected_bar: Option<String>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            user: None,
            workspace: None,
            selected_bar: None,
        }
    }

    /// Resumes the stored session, if any. An unreadable session record logs
    /// out rather than failing.
    pub fn restore(store: S) -> SessionResult<Self> {
        let mut session = Self::new(store);
        let Some(raw) = session.store.get_item(AUTH_STORAGE_KEY)? else {
            return Ok(session);
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => session.enter(user)?,
            Err(err) => {
                error!(error = %err, "failed to parse stored session");
                session.store.remove_item(AUTH_STORAGE_KEY)?;
            }
        }
        Ok(session)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn bars(&self) -> &[Bar] {
        self.workspace.as_ref().map(|w| w.bars()).unwrap_or(&[])
    }

    fn enter(&mut self, user: User) -> SessionResult<()> {
        let workspace = Workspace::load(&self.store, &user.id)?;
        save_json(&self.store, AUTH_STORAGE_KEY, &user)?;
        info!(user = %user.id, username = %user.username, "session started");
        self.user = Some(user);
        self.workspace = Some(workspace);
        self.selected_bar = None;
        Ok(())
    }

    pub fn register(&mut self, profile: UserProfile) -> SessionResult<&User> {
        let user = UserDirectory::new(&self.store).register(profile)?;
        self.enter(user)?;
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    pub fn login(&mut self, username: &str) -> SessionResult<&User> {
        let user = UserDirectory::new(&self.store)
            .find_by_username(username)?
            .ok_or_else(|| AccountError::UnknownUser(username.trim().to_string()))?;
        self.enter(user)?;
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    pub fn logout(&mut self) -> SessionResult<()> {
        self.store.remove_item(AUTH_STORAGE_KEY)?;
        if let Some(user) = self.user.take() {
            info!(user = %user.id, "session ended");
        }
        self.workspace = None;
        self.selected_bar = None;
        Ok(())
    }

    pub fn update_profile(&mut self, profile: UserProfile) -> SessionResult<&User> {
        let user_id = self
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(SessionError::NotLoggedIn)?;
        let updated = UserDirectory::new(&self.store).update_profile(&user_id, profile)?;
        save_json(&self.store, AUTH_STORAGE_KEY, &updated)?;
        self.user = Some(updated);
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    /// Runs `mutator` against the workspace and persists it when the mutator
    /// succeeds.
    fn persist_with<F, T>(&mut self, mutator: F) -> SessionResult<T>
    where
        F: FnOnce(&mut Workspace) -> Result<T, RosterError>,
    {
        let workspace = self.workspace.as_mut().ok_or(SessionError::NotLoggedIn)?;
        let value = mutator(workspace)?;
        workspace.save(&self.store)?;
        Ok(value)
    }

    pub fn add_bar(&mut self, bar: Bar) -> SessionResult<String> {
        self.persist_with(|workspace| workspace.add_bar(bar).map(|b| b.id.clone()))
    }

    pub fn update_bar(&mut self, bar: Bar) -> SessionResult<()> {
        self.persist_with(|workspace| workspace.update_bar(bar))
    }

    pub fn delete_bar(&mut self, bar_id: &str) -> SessionResult<Bar> {
        let removed = self.persist_with(|workspace| workspace.delete_bar(bar_id))?;
        if self.selected_bar.as_deref() == Some(bar_id) {
            self.selected_bar = None;
        }
        Ok(removed)
    }

    pub fn select_bar(&mut self, bar_id: &str) -> SessionResult<&Bar> {
        let workspace = self.workspace.as_ref().ok_or(SessionError::NotLoggedIn)?;
        if workspace.bar(bar_id).is_none() {
            return Err(RosterError::BarNotFound(bar_id.to_string()).into());
        }
        self.selected_bar = Some(bar_id.to_string());
        self.current_bar()
    }

    pub fn deselect_bar(&mut self) {
        self.selected_bar = None;
    }

    pub fn selected_bar_id(&self) -> Option<&str> {
        self.selected_bar.as_deref()
    }

    pub fn current_bar(&self) -> SessionResult<&Bar> {
        let workspace = self.workspace.as_ref().ok_or(SessionError::NotLoggedIn)?;
        let bar_id = self
            .selected_bar
            .as_deref()
            .ok_or(SessionError::Roster(RosterError::NoBarSelected))?;
        workspace
            .bar(bar_id)
            .ok_or_else(|| RosterError::BarNotFound(bar_id.to_string()).into())
    }

    /// Applies `mutator` to the selected bar and persists the workspace. A
    /// failed mutation leaves both memory and the store unchanged.
    pub fn update_current_bar<F, T>(&mut self, mutator: F) -> SessionResult<T>
    where
        F: FnOnce(&mut Bar) -> Result<T, RosterError>,
    {
        let bar_id = self
            .selected_bar
            .clone()
            .ok_or(SessionError::Roster(RosterError::NoBarSelected))?;
        self.persist_with(|workspace| workspace.update_bar_with(&bar_id, mutator))
    }

    /// Asks `generator` for a roster for the selected bar. On success the
    /// bar's schedule is replaced and saved; on failure it is left as it was.
    pub async fn generate_schedule<G: ScheduleGenerator>(
        &mut self,
        generator: &G,
    ) -> SessionResult<usize> {
        let bar = self.current_bar()?;
        if bar.workers.is_empty() {
            return Err(RosterError::NoWorkers.into());
        }
        let request = GenerationRequest::from_bar(bar);
        let entries = match generator.generate(&request).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "schedule generation failed");
                return Err(err.into());
            }
        };
        self.update_current_bar(|bar| Ok(bar.replace_schedule(entries)))
    }

    pub fn export_schedule_csv<W: Write>(&self, writer: W) -> SessionResult<usize> {
        let bar = self.current_bar()?;
        Ok(export::write_schedule_csv(bar, writer)?)
    }
}
