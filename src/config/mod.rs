use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::themes::ThemeRegistry;
use crate::model::Template;
use crate::view::SortOrder;

pub mod themes;

pub use themes::ThemeName;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Memopad";
const APP_NAME: &str = "memopad";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub export_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("MEMOPAD_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("MEMOPAD_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::rooted(config_dir, config_file, data_root))
    }

    /// Lays out every path below an explicit config and data root.
    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        let database_path = data_dir.join("memos.db");
        let export_dir = data_dir.join("exports");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
            export_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.export_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Used until a theme preference has been saved in the store.
    pub theme: ThemeName,
    pub default_sort: SortOrder,
    pub default_template: Template,
    pub preview_chars: usize,
    pub drawing: DrawingOptions,
    pub storage: StorageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Light,
            default_sort: SortOrder::Latest,
            default_template: Template::Basic,
            preview_chars: 50,
            drawing: DrawingOptions::default(),
            storage: StorageOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        if !ThemeRegistry::default().contains(&self.theme) {
            tracing::warn!(?self.theme, "unknown theme in config, falling back to Light");
            self.theme = ThemeName::Light;
        }
        if self.drawing.history_capacity == 0 {
            tracing::warn!("drawing.history_capacity must be at least 1, using 1");
            self.drawing.history_capacity = 1;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingOptions {
    /// Maximum number of canvas snapshots kept for undo/redo.
    pub history_capacity: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for DrawingOptions {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            width: 320,
            height: 160,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            wal_autocheckpoint: 1000,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        let config_file = config_dir.join("config.toml");
        ConfigPaths::rooted(config_dir, config_file, root.path().join("data"))
    }

    #[test]
    fn first_load_writes_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.preview_chars, 50);
        assert_eq!(cfg.default_sort, SortOrder::Latest);
        assert_eq!(cfg.storage.database_path, loader.paths().database_path);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_sections() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));
        loader.paths().ensure_directories()?;
        fs::write(
            &loader.paths().config_file,
            "theme = \"dark\"\ndefault_sort = \"most-viewed\"\n[drawing]\nhistory_capacity = 0\n",
        )?;
        let cfg = loader.load()?;
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.default_sort, SortOrder::MostViewed);
        assert_eq!(cfg.drawing.history_capacity, 1);
        assert_eq!(cfg.drawing.width, DrawingOptions::default().width);
        Ok(())
    }
}
