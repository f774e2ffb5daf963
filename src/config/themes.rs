use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::storage::{KeyValueStore, THEME_KEY};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

impl ThemeName {
    pub fn toggled(self) -> Self {
        match self {
            ThemeName::Light => ThemeName::Dark,
            ThemeName::Dark => ThemeName::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, ThemeName::Dark)
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    names: HashSet<ThemeName>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.names.contains(theme)
    }

    /// Resolves a stored preference, ignoring anything the registry does not know.
    pub fn resolve(&self, raw: &str) -> Option<ThemeName> {
        raw.trim()
            .parse::<ThemeName>()
            .ok()
            .filter(|theme| self.contains(theme))
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let names = [ThemeName::Light, ThemeName::Dark].into_iter().collect();
        Self { names }
    }
}

/// Reads the saved theme preference, falling back to `default` when absent or unknown.
pub fn load_theme(store: &dyn KeyValueStore, default: ThemeName) -> Result<ThemeName> {
    let saved = store.get(THEME_KEY)?;
    Ok(match saved {
        Some(raw) => ThemeRegistry::default().resolve(&raw).unwrap_or_else(|| {
            tracing::warn!(%raw, "ignoring unknown saved theme");
            default
        }),
        None => default,
    })
}

pub fn save_theme(store: &dyn KeyValueStore, theme: ThemeName) -> Result<()> {
    store.set(THEME_KEY, &theme.to_string())
}
