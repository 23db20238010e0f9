//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mlog_core::RecorderConfig;
use mlog_core::recorder::DEFAULT_MIN_SAMPLE_DISTANCE_M;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Whether closed work segments are reverse geocoded.
    pub geocoding_enabled: bool,
    /// Base URL of a Nominatim-compatible service.
    pub geocoder_url: String,
    /// User agent sent to the geocoder.
    pub geocoder_user_agent: String,
    /// Minimum distance between accepted drive samples, in meters.
    pub min_sample_distance_m: f64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("geocoding_enabled", &self.geocoding_enabled)
            .field("geocoder_url", &self.geocoder_url)
            .field("min_sample_distance_m", &self.min_sample_distance_m)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("mlog.db"),
            geocoding_enabled: true,
            geocoder_url: mlog_geo::DEFAULT_BASE_URL.to_string(),
            geocoder_user_agent: format!("mlog/{}", env!("CARGO_PKG_VERSION")),
            min_sample_distance_m: DEFAULT_MIN_SAMPLE_DISTANCE_M,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (MLOG_*)
        figment = figment.merge(Env::prefixed("MLOG_"));

        figment.extract()
    }

    pub const fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            min_sample_distance_m: self.min_sample_distance_m,
        }
    }

    /// Lock file serializing access to the recording across processes.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .database_path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".lock");
        self.database_path.with_file_name(name)
    }
}

/// Returns the platform-specific config directory for mlog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mlog"))
}

/// Returns the platform-specific data directory for mlog.
///
/// On Linux: `~/.local/share/mlog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("mlog"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_mlog() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "mlog");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("mlog.db"));
        assert!((config.min_sample_distance_m - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/other.db\"\ngeocoding_enabled = false\nmin_sample_distance_m = 25.0\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert!(!config.geocoding_enabled);
        assert!((config.recorder_config().min_sample_distance_m - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lock_path_sits_next_to_database() {
        let config = Config {
            database_path: PathBuf::from("/data/mlog.db"),
            ..Config::default()
        };
        assert_eq!(config.lock_path(), PathBuf::from("/data/mlog.db.lock"));
    }
}
