use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Audience the glossary content is tailored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Business,
    PmDesigner,
    Engineer,
    DataScientist,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Business => "business",
            Role::PmDesigner => "pm-designer",
            Role::Engineer => "engineer",
            Role::DataScientist => "data-scientist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw}")]
pub struct ParsePreferenceError {
    kind: &'static str,
    raw: String,
}

impl FromStr for Role {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "business" => Ok(Role::Business),
            "pm-designer" => Ok(Role::PmDesigner),
            "engineer" => Ok(Role::Engineer),
            "data-scientist" => Ok(Role::DataScientist),
            other => Err(ParsePreferenceError {
                kind: "role",
                raw: other.to_string(),
            }),
        }
    }
}

impl FromStr for Theme {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ParsePreferenceError {
                kind: "theme",
                raw: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-browser display preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// Partial preferences; only `Some` fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub selected_role: Option<Role>,
    pub theme: Option<Theme>,
}

impl PreferencesUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.selected_role = Some(role);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected_role.is_none() && self.theme.is_none()
    }
}

impl Preferences {
    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(role) = update.selected_role {
            self.selected_role = Some(role);
        }
        if let Some(theme) = update.theme {
            self.theme = Some(theme);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&Role::DataScientist).unwrap();
        assert_eq!(json, "\"data-scientist\"");
        let parsed: Role = serde_json::from_str("\"pm-designer\"").unwrap();
        assert_eq!(parsed, Role::PmDesigner);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(serde_json::from_str::<Theme>("\"sepia\"").is_err());
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn empty_preferences_serialize_to_empty_object() {
        let json = serde_json::to_string(&Preferences::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn apply_only_overrides_provided_fields() {
        let mut prefs = Preferences {
            selected_role: Some(Role::Engineer),
            theme: Some(Theme::Light),
        };
        prefs.apply(PreferencesUpdate::new().with_theme(Theme::Dark));

        assert_eq!(prefs.selected_role, Some(Role::Engineer));
        assert_eq!(prefs.theme, Some(Theme::Dark));
    }
}
