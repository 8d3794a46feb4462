//! Trait definitions and the named registry that holds them.

pub mod defaults;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

/// Longest accepted trait name, in characters.
pub const MAX_NAME_CHARS: usize = 80;

/// A user-defined classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitDefinition {
    /// Free text for humans. Never evaluated.
    #[serde(default)]
    pub description: String,
    /// Predicate source text.
    pub code: String,
    #[serde(default, alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl TraitDefinition {
    #[must_use]
    pub fn new(description: impl Into<String>, code: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            code: code.into(),
            created_at,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("trait '{0}' not found")]
    NotFound(String),

    #[error("trait '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid trait name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

impl RegistryError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::TraitNotFound,
            Self::AlreadyExists(_) => ErrorCode::TraitAlreadyExists,
            Self::InvalidName { .. } => ErrorCode::InvalidTraitName,
        }
    }
}

/// Check a proposed trait name. Names are case-sensitive and otherwise
/// free-form.
///
/// # Errors
///
/// Rejects empty or whitespace-only names, names with control characters,
/// and names longer than [`MAX_NAME_CHARS`].
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let invalid = |reason| {
        Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name.chars().any(char::is_control) {
        return invalid("name contains control characters");
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return invalid("name is too long");
    }
    Ok(())
}

/// Trait name to definition. Iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitsRegistry(BTreeMap<String, TraitDefinition>);

impl TraitsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TraitDefinition> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TraitDefinition)> {
        self.0.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Names of enabled traits, in name order.
    pub fn enabled_names(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, def)| def.enabled).map(|(name, _)| name)
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|def| def.enabled)
    }

    /// Add a trait under a new name.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already taken.
    pub fn add(&mut self, name: &str, definition: TraitDefinition) -> Result<(), RegistryError> {
        validate_name(name)?;
        if self.0.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        self.0.insert(name.to_string(), definition);
        Ok(())
    }

    /// Insert or replace without checks. Used when loading and seeding.
    pub fn upsert(&mut self, name: impl Into<String>, definition: TraitDefinition) {
        self.0.insert(name.into(), definition);
    }

    /// Change the description and code of an existing trait, keeping its
    /// creation time and enabled flag. Returns the previous definition.
    ///
    /// # Errors
    ///
    /// Fails if no trait has this name.
    pub fn edit(
        &mut self,
        name: &str,
        description: Option<String>,
        code: String,
    ) -> Result<TraitDefinition, RegistryError> {
        let def = self
            .0
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let previous = def.clone();
        if let Some(description) = description {
            def.description = description;
        }
        def.code = code;
        Ok(previous)
    }

    /// Set the enabled flag. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Fails if no trait has this name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<bool, RegistryError> {
        let def = self
            .0
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let changed = def.enabled != enabled;
        def.enabled = enabled;
        Ok(changed)
    }

    /// Remove a trait and return its definition.
    ///
    /// # Errors
    ///
    /// Fails if no trait has this name.
    pub fn remove(&mut self, name: &str) -> Result<TraitDefinition, RegistryError> {
        self.0
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}

impl FromIterator<(String, TraitDefinition)> for TraitsRegistry {
    fn from_iter<I: IntoIterator<Item = (String, TraitDefinition)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
