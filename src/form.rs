//! Staged user draft for the create/edit form.
//!
//! The draft lives outside the committed list until the sync coordinator
//! reconciles a successful store response. Field values are held in their
//! editable form (the hourly rate stays a string until submission) and are
//! only validated and coerced by [`Draft::validate`] at submit time.

use crate::config::DefaultsConfig;
use crate::user::{Role, User};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Whether the draft is a brand-new user or a copy of an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Creating,
    Editing,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Editing => "editing",
        }
    }
}

/// Editable copy of a user record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Draft {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub nif: String,
    pub password: String,
    pub role: Role,
    pub hourly_rate: String,
    pub currency: String,
    pub country: String,
    pub is_active: bool,
    pub is_provisional_password: bool,
    pub first_access_date: Option<DateTime<Utc>>,
}

/// Body of `POST /api/users`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayload {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub currency: String,
    pub country: String,
    pub hourly_rate: f64,
}

/// Field names accepted by [`Draft::set`], in display order
pub const FIELDS: &[&str] = &[
    "name",
    "username",
    "email",
    "phone",
    "nif",
    "password",
    "role",
    "hourlyRate",
    "currency",
    "country",
    "isActive",
    "isProvisionalPassword",
];

/// Generate a placeholder id such as `USR-2026-4F2A9C01`.
/// The store may replace it with its own id on create.
pub fn generate_user_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("USR-{}-{}", now.year(), suffix[..8].to_uppercase())
}

/// Coerce the editable hourly rate; anything unparsable or negative is 0.
pub fn parse_hourly_rate(raw: &str) -> f64 {
    match raw.trim().replace(',', ".").parse::<f64>() {
        Ok(rate) if rate.is_finite() && rate >= 0.0 => rate,
        _ => 0.0,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

impl Draft {
    /// Fresh draft for a new account
    pub fn new_user(defaults: &DefaultsConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_user_id(now),
            password: defaults.provisional_password().to_string(),
            role: Role::Employee,
            currency: defaults.currency().to_string(),
            country: defaults.country().to_string(),
            is_active: true,
            is_provisional_password: true,
            ..Default::default()
        }
    }

    /// Editable copy of an existing account
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            nif: user.nif.clone().unwrap_or_default(),
            password: user.password.clone().unwrap_or_default(),
            role: user.role,
            hourly_rate: user.hourly_rate.to_string(),
            currency: user.currency.clone(),
            country: user.country.clone(),
            is_active: user.is_active,
            is_provisional_password: user.is_provisional_password,
            first_access_date: user.first_access_date,
        }
    }

    /// Set one field by its wire name (snake_case also accepted)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "name" => self.name = value.to_string(),
            "username" => self.username = value.to_string(),
            "email" => self.email = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "nif" => self.nif = value.to_string(),
            "password" => self.password = value.to_string(),
            "role" => {
                self.role = Role::from_str(value)
                    .ok_or_else(|| anyhow!("Invalid role '{}'. Use: employee, support", value))?;
            }
            "hourlyRate" | "hourly_rate" => self.hourly_rate = value.to_string(),
            "currency" => self.currency = value.to_uppercase(),
            "country" => self.country = value.to_uppercase(),
            "isActive" | "is_active" => {
                self.is_active =
                    parse_bool(value).ok_or_else(|| anyhow!("Invalid boolean '{}'", value))?;
            }
            "isProvisionalPassword" | "is_provisional_password" => {
                self.is_provisional_password =
                    parse_bool(value).ok_or_else(|| anyhow!("Invalid boolean '{}'", value))?;
            }
            "id" => return Err(anyhow!("The id of a user cannot be changed")),
            _ => return Err(anyhow!("Unknown field '{}'. Fields: {}", key, FIELDS.join(", "))),
        }
        Ok(())
    }

    /// Check the draft before it is sent to the store.
    /// Returns every problem found, not just the first. Currency and country
    /// are not checked here: records the store already holds stay editable.
    pub fn validate(&self, mode: FormMode) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if self.username.trim().is_empty() {
            errors.push("username is required".to_string());
        }
        if mode == FormMode::Creating && self.password.is_empty() {
            errors.push("password is required".to_string());
        }
        if self.role == Role::Master {
            errors.push("master accounts cannot be managed here".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The full record sent on update, with the rate coerced to a number
    pub fn to_user(&self) -> User {
        let nif = self.nif.trim();
        User {
            id: self.id.clone(),
            name: self.name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            nif: (!nif.is_empty()).then(|| nif.to_string()),
            role: self.role,
            hourly_rate: parse_hourly_rate(&self.hourly_rate),
            currency: self.currency.clone(),
            country: self.country.clone(),
            password: (!self.password.is_empty()).then(|| self.password.clone()),
            is_provisional_password: self.is_provisional_password,
            is_active: self.is_active,
            first_access_date: self.first_access_date,
        }
    }

    /// The subset of fields the store accepts on create
    pub fn to_create_payload(&self) -> CreatePayload {
        CreatePayload {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            name: self.name.trim().to_string(),
            role: self.role,
            currency: self.currency.clone(),
            country: self.country.clone(),
            hourly_rate: parse_hourly_rate(&self.hourly_rate),
        }
    }
}

/// Holds the single staged draft, if any
#[derive(Debug, Default)]
pub struct FormState {
    draft: Option<(Draft, FormMode)>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_for_create(&mut self, defaults: &DefaultsConfig, now: DateTime<Utc>) -> &Draft {
        let draft = Draft::new_user(defaults, now);
        &self.draft.insert((draft, FormMode::Creating)).0
    }

    pub fn open_for_edit(&mut self, existing: &User) -> &Draft {
        let draft = Draft::from_user(existing);
        &self.draft.insert((draft, FormMode::Editing)).0
    }

    pub fn update_field(&mut self, key: &str, value: &str) -> Result<()> {
        let (draft, _) = self
            .draft
            .as_mut()
            .ok_or_else(|| anyhow!("No open form. Use /new or /edit <id>"))?;
        draft.set(key, value)
    }

    pub fn discard(&mut self) -> Option<Draft> {
        self.draft.take().map(|(draft, _)| draft)
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref().map(|(draft, _)| draft)
    }

    pub fn mode(&self) -> Option<FormMode> {
        self.draft.as_ref().map(|(_, mode)| *mode)
    }
}
