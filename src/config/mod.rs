use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::bulk::IntervalUnit;
use crate::config::themes::ThemeRegistry;
use crate::view::{GroupBy, SortKey};

pub mod themes;

pub use themes::Palette;

const APP_DOMAIN: &str = "dev";
const APP_ORG: &str = "Exit1";
const APP_NAME: &str = "checklist";

pub const CONFIG_ENV: &str = "CHECKLIST_CONFIG";
pub const DATA_ENV: &str = "CHECKLIST_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
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
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

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
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));

        Ok(Self::with_roots(config_dir, config_file, data_root, state_dir))
    }

    /// Lays every path out under one directory.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let config_file = config_dir.join("config.toml");
        Self::with_roots(config_dir, config_file, root.join("data"), root.join("state"))
    }

    fn with_roots(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        let database_path = data_dir.join("checks.db");
        let log_dir = state_dir.join("logs");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
            log_dir,
            state_dir,
        }
    }

    /// Points at an explicit config file. A directory gets `config.toml` inside it.
    pub fn with_config_file(mut self, file: PathBuf) -> Self {
        if file.is_dir() {
            self.config_file = file.join("config.toml");
            self.config_dir = file;
            return self;
        }
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.config_dir = parent.to_path_buf();
        }
        self.config_file = file;
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.database_path = dir.join("checks.db");
        self.data_dir = dir;
        self
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("checklist.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: ThemeName,
    /// Preference namespace; one per dashboard user.
    pub profile: String,
    pub default_sort: SortKey,
    pub default_group: GroupBy,
    pub tick_rate_ms: u64,
    pub bulk_edit: BulkEditOptions,
    pub storage: StorageOptions,
    pub search: SearchOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            profile: String::from("default"),
            default_sort: SortKey::Custom,
            default_group: GroupBy::None,
            tick_rate_ms: 250,
            bulk_edit: BulkEditOptions::default(),
            storage: StorageOptions::default(),
            search: SearchOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        if !ThemeRegistry::default().contains(&self.theme) {
            tracing::warn!(?self.theme, "unknown theme in config, falling back to Dark");
            self.theme = ThemeName::Dark;
        }
        if self.profile.trim().is_empty() {
            tracing::warn!("empty profile in config, using 'default'");
            self.profile = String::from("default");
        }
        if self.tick_rate_ms == 0 {
            self.tick_rate_ms = AppConfig::default().tick_rate_ms;
        }
        Ok(())
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(&self.theme)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkEditOptions {
    /// Unit the interval field is typed in; the stored value is always seconds.
    pub interval_unit: IntervalUnit,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: 500 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
    #[serde(other)]
    Unrecognized,
}
