use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransarcError};

/// Default directory name for archive data, kept inside the mods root.
const DATA_DIR: &str = ".transarc";
/// Default database filename.
const DB_FILE: &str = "archive.db";
/// Config filename.
const CONFIG_FILE: &str = "config.toml";

/// Mods-root-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory whose child directories hold one mod each.
    pub mods_root: PathBuf,
    /// Path to the `.transarc/` directory.
    pub data_dir: PathBuf,
    /// Path to the `SQLite` archive.
    pub db_path: PathBuf,
    /// Path to the config file.
    pub config_path: PathBuf,
    /// User settings loaded from config.toml.
    pub settings: UserSettings,
}

/// User-configurable settings from .transarc/config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub scan: ScanSettings,
    pub restore: RestoreSettings,
    pub legacy: LegacySettings,
    pub logging: LoggingSettings,
}

/// Ingest (sync) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// How many directory levels below the root a manifest may live.
    /// 1 means immediate child directories only.
    pub ingest_depth: usize,
    /// Literal manifest file name.
    pub manifest_name: String,
    /// Label given to snapshots when none is supplied.
    pub default_label: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ingest_depth: 1,
            manifest_name: "manifest.json".into(),
            default_label: "Sync".into(),
        }
    }
}

/// Restore/apply settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreSettings {
    /// Maximum directory depth for manifests to patch (`None` = unbounded).
    pub max_depth: Option<usize>,
}

/// Settings for the flat JSON backup format used by the old scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySettings {
    /// Backup file name, relative to the mods root.
    pub backup_file: String,
    /// Mod page URL, `{id}` is replaced by the marketplace id.
    pub mod_url_template: String,
}

impl Default for LegacySettings {
    fn default() -> Self {
        Self {
            backup_file: "xlgChineseBack.json".into(),
            mod_url_template: "https://www.nexusmods.com/stardewvalley/mods/{id}".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl Config {
    /// Create config for a given mods root.
    pub fn new(mods_root: impl Into<PathBuf>) -> Self {
        let mods_root = mods_root.into();
        let data_dir = mods_root.join(DATA_DIR);
        let db_path = data_dir.join(DB_FILE);
        let config_path = data_dir.join(CONFIG_FILE);

        let settings = Self::load_settings(&config_path).unwrap_or_default();

        Self {
            mods_root,
            data_dir,
            db_path,
            config_path,
            settings,
        }
    }

    fn load_settings(config_path: &Path) -> Option<UserSettings> {
        if !config_path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(config_path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Save current settings to config.toml.
    pub fn save_settings(&self) -> Result<()> {
        self.ensure_data_dir()?;
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| TransarcError::Config(format!("failed to serialize settings: {e}")))?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Ensure the `.transarc/` directory exists.
    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    #[must_use]
    pub fn archive_exists(&self) -> bool {
        self.db_path.exists()
    }

    /// Path of the legacy backup file.
    #[must_use]
    pub fn legacy_backup_path(&self) -> PathBuf {
        self.mods_root.join(&self.settings.legacy.backup_file)
    }
}
