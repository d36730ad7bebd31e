use crate::persistence::{KeyValueStore, PersistenceError, PersistenceResult, load_json, save_json};
use crate::worker::new_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

pub const USERS_STORAGE_KEY: &str = "bar_shift_master_users";

/// Dial codes offered at registration; the first one is the default.
pub const COUNTRY_CODES: [(&str, &str); 8] = [
    ("+1", "US"),
    ("+44", "GB"),
    ("+33", "FR"),
    ("+49", "DE"),
    ("+34", "ES"),
    ("+39", "IT"),
    ("+61", "AU"),
    ("+81", "JP"),
];

pub fn default_country_code() -> String {
    COUNTRY_CODES[0].0.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

/// Registration or profile form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl UserProfile {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            phone: phone.into(),
            country_code: None,
        }
    }

    fn validate(&self) -> Result<(), AccountError> {
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.phone.trim().is_empty()
        {
            return Err(AccountError::MissingInformation);
        }
        if let Some(code) = &self.country_code {
            if !COUNTRY_CODES.iter().any(|(dial, _)| dial == code) {
                return Err(AccountError::UnknownCountryCode(code.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum AccountError {
    MissingInformation,
    UsernameExists(String),
    UnknownUser(String),
    UnknownCountryCode(String),
    Persistence(PersistenceError),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::MissingInformation => write!(f, "missing information"),
            AccountError::UsernameExists(name) => write!(f, "username '{name}' exists"),
            AccountError::UnknownUser(name) => write!(f, "unknown user '{name}'"),
            AccountError::UnknownCountryCode(code) => write!(f, "unknown country code '{code}'"),
            AccountError::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<PersistenceError> for AccountError {
    fn from(value: PersistenceError) -> Self {
        AccountError::Persistence(value)
    }
}

/// The user list stored under [`USERS_STORAGE_KEY`].
pub struct UserDirectory<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> UserDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn users(&self) -> PersistenceResult<Vec<User>> {
        match load_json::<S, Vec<User>>(self.store, USERS_STORAGE_KEY) {
            Ok(users) => Ok(users.unwrap_or_default()),
            Err(PersistenceError::Serialization(err)) => {
                warn!(error = %err, "user list unreadable, treating as empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    pub fn find_by_username(&self, username: &str) -> PersistenceResult<Option<User>> {
        let needle = username.trim();
        Ok(self
            .users()?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(needle)))
    }

    pub fn find_by_id(&self, user_id: &str) -> PersistenceResult<Option<User>> {
        Ok(self.users()?.into_iter().find(|u| u.id == user_id))
    }

    pub fn register(&self, profile: UserProfile) -> Result<User, AccountError> {
        profile.validate()?;
        let mut users = self.users()?;
        let username = profile.username.trim().to_string();
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&username))
        {
            return Err(AccountError::UsernameExists(username));
        }
        let user = User {
            id: new_id(),
            username,
            email: profile.email.trim().to_string(),
            phone: profile.phone.trim().to_string(),
            country_code: profile.country_code.unwrap_or_else(default_country_code),
        };
        users.push(user.clone());
        save_json(self.store, USERS_STORAGE_KEY, &users)?;
        info!(user = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn update_profile(&self, user_id: &str, profile: UserProfile) -> Result<User, AccountError> {
        profile.validate()?;
        let mut users = self.users()?;
        let username = profile.username.trim().to_string();
        if users
            .iter()
            .any(|u| u.id != user_id && u.username.eq_ignore_ascii_case(&username))
        {
            return Err(AccountError::UsernameExists(username));
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AccountError::UnknownUser(user_id.to_string()))?;
        user.username = username;
        user.email = profile.email.trim().to_string();
        user.phone = profile.phone.trim().to_string();
        if let Some(code) = profile.country_code {
            user.country_code = code;
        }
        let updated = user.clone();
        save_json(self.store, USERS_STORAGE_KEY, &users)?;
        Ok(updated)
    }
}
