use crate::bar::{Bar, RosterError, RosterResult};
use crate::persistence::{KeyValueStore, PersistenceResult, save_json};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

pub const DATA_STORAGE_PREFIX: &str = "bar_shift_master_user_";

pub fn bars_key(user_id: &str) -> String {
    format!("{DATA_STORAGE_PREFIX}{user_id}_bars")
}

/// All bars owned by one user, mirrored to the store under [`bars_key`].
#[derive(Debug, Clone)]
pub struct Workspace {
    user_id: String,
    bars: Vec<Bar>,
    last_saved: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            bars: Vec::new(),
            last_saved: None,
        }
    }

    /// Loads the user's bars. A document that does not parse is logged and
    /// treated as an empty workspace; it stays in the store untouched until
    /// the next save.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, user_id: &str) -> PersistenceResult<Self> {
        let key = bars_key(user_id);
        let Some(raw) = store.get_item(&key)? else {
            debug!(user = %user_id, "no stored bars");
            return Ok(Self::empty(user_id));
        };
        match serde_json::from_str::<Vec<Bar>>(&raw) {
            Ok(bars) => {
                debug!(user = %user_id, count = bars.len(), "bars loaded");
                Ok(Self {
                    user_id: user_id.to_string(),
                    bars,
                    last_saved: Some(Utc::now()),
                })
            }
            Err(err) => {
                error!(user = %user_id, error = %err, "failed to parse stored bars");
                Ok(Self::empty(user_id))
            }
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> PersistenceResult<()> {
        save_json(store, &bars_key(&self.user_id), &self.bars)?;
        self.last_saved = Some(Utc::now());
        Ok(())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn bar(&self, bar_id: &str) -> Option<&Bar> {
        self.bars.iter().find(|b| b.id == bar_id)
    }

    pub fn bar_mut(&mut self, bar_id: &str) -> Option<&mut Bar> {
        self.bars.iter_mut().find(|b| b.id == bar_id)
    }

    pub fn find_bar_by_name(&self, name: &str) -> Option<&Bar> {
        self.bars
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn add_bar(&mut self, bar: Bar) -> RosterResult<&Bar> {
        bar.validate()?;
        if self.bar(&bar.id).is_some() {
            return Err(RosterError::DuplicateId(bar.id));
        }
        info!(user = %self.user_id, bar = %bar.id, name = %bar.name, "bar registered");
        self.bars.push(bar);
        Ok(&self.bars[self.bars.len() - 1])
    }

    pub fn update_bar(&mut self, bar: Bar) -> RosterResult<()> {
        bar.validate()?;
        let slot = self
            .bar_mut(&bar.id)
            .ok_or_else(|| RosterError::BarNotFound(bar.id.clone()))?;
        *slot = bar;
        Ok(())
    }

    pub fn delete_bar(&mut self, bar_id: &str) -> RosterResult<Bar> {
        let idx = self
            .bars
            .iter()
            .position(|b| b.id == bar_id)
            .ok_or_else(|| RosterError::BarNotFound(bar_id.to_string()))?;
        info!(user = %self.user_id, bar = %bar_id, "bar deleted");
        Ok(self.bars.remove(idx))
    }

    /// Applies `mutator` to a copy of the bar and keeps the copy only when the
    /// mutator succeeds.
    pub fn update_bar_with<F, T>(&mut self, bar_id: &str, mutator: F) -> RosterResult<T>
    where
        F: FnOnce(&mut Bar) -> RosterResult<T>,
    {
        let slot = self
            .bar_mut(bar_id)
            .ok_or_else(|| RosterError::BarNotFound(bar_id.to_string()))?;
        let mut draft = slot.clone();
        let value = mutator(&mut draft)?;
        *slot = draft;
        Ok(value)
    }
}
