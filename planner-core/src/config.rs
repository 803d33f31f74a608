//! Planner configuration.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

static DEFAULT_DATA_DIR: &str = "~/planner";
static DEFAULT_EVENTS_FILE: &str = "planner.txt";
static DEFAULT_PAST_EVENTS_FILE: &str = "past_events.txt";
static DEFAULT_CLASSES_FILE: &str = "classes.txt";

/// Environment variables `PLANNER_<FIELD>` override the file.
const ENV_PREFIX: &str = "PLANNER";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_events_file() -> String {
    DEFAULT_EVENTS_FILE.to_string()
}

fn default_past_events_file() -> String {
    DEFAULT_PAST_EVENTS_FILE.to_string()
}

fn default_classes_file() -> String {
    DEFAULT_CLASSES_FILE.to_string()
}

/// Configuration at ~/.config/planner/config.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Directory holding the three store files. `~` is expanded.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_events_file")]
    pub events_file: String,

    #[serde(default = "default_past_events_file")]
    pub past_events_file: String,

    #[serde(default = "default_classes_file")]
    pub classes_file: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            data_dir: default_data_dir(),
            events_file: default_events_file(),
            past_events_file: default_past_events_file(),
            classes_file: default_classes_file(),
        }
    }
}

impl PlannerConfig {
    /// Defaults with the store files placed in `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        PlannerConfig {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn config_path() -> PlannerResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| PlannerError::Config("Could not determine config directory".into()))?
            .join("planner");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user config, writing a commented default file on first use.
    pub fn load() -> PlannerResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from `path` (optional) layered under `PLANNER_*` environment variables.
    pub fn load_from(path: &Path) -> PlannerResult<Self> {
        let config: PlannerConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| PlannerError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlannerError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Each store must be a distinct plain file name directly inside `data_dir`.
    pub fn validate(&self) -> PlannerResult<()> {
        let files = [
            ("events_file", &self.events_file),
            ("past_events_file", &self.past_events_file),
            ("classes_file", &self.classes_file),
        ];

        for (key, name) in files {
            if Path::new(name).file_name() != Some(OsStr::new(name)) {
                return Err(PlannerError::Config(format!(
                    "{key} must be a plain file name, got \"{name}\""
                )));
            }
        }
        for (idx, (key, name)) in files.iter().enumerate() {
            if let Some((other, _)) = files[idx + 1..].iter().find(|(_, n)| n == name) {
                return Err(PlannerError::Config(format!(
                    "{key} and {other} both point at \"{name}\""
                )));
            }
        }

        Ok(())
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_path().join(&self.events_file)
    }

    pub fn past_events_path(&self) -> PathBuf {
        self.data_path().join(&self.past_events_file)
    }

    pub fn classes_path(&self) -> PathBuf {
        self.data_path().join(&self.classes_file)
    }

    pub fn save(&self, path: &Path) -> PlannerResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PlannerError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| PlannerError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> PlannerResult<()> {
        let contents = format!(
            "\
# planner configuration

# Where the planner keeps its files:
# data_dir = \"{}\"

# File names inside data_dir:
# events_file = \"{}\"
# past_events_file = \"{}\"
# classes_file = \"{}\"
",
            DEFAULT_DATA_DIR, DEFAULT_EVENTS_FILE, DEFAULT_PAST_EVENTS_FILE, DEFAULT_CLASSES_FILE
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlannerError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PlannerError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        PlannerConfig::create_default_config(&path).unwrap();

        let config = PlannerConfig::load_from(&path).unwrap();

        assert_eq!(config.events_file, "planner.txt");
        assert_eq!(config.past_events_file, "past_events.txt");
        assert_eq!(config.classes_file, "classes.txt");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PlannerConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.classes_file, "classes.txt");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let custom = PlannerConfig {
            data_dir: dir.path().join("data"),
            events_file: "upcoming.txt".into(),
            ..PlannerConfig::default()
        };
        custom.save(&path).unwrap();

        let loaded = PlannerConfig::load_from(&path).unwrap();

        assert_eq!(loaded.events_path(), dir.path().join("data").join("upcoming.txt"));
        assert_eq!(loaded.past_events_file, "past_events.txt");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = [unclosed").unwrap();

        let err = PlannerConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn test_file_names_with_separators_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "past_events_file = \"archive/past.txt\"\n").unwrap();

        let err = PlannerConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, PlannerError::Config(ref msg) if msg.contains("past_events_file")));

        let parent = PlannerConfig {
            classes_file: "..".into(),
            ..PlannerConfig::default()
        };
        assert!(parent.validate().is_err());
    }

    #[test]
    fn test_shared_file_name_is_rejected() {
        let config = PlannerConfig {
            past_events_file: "planner.txt".into(),
            ..PlannerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PlannerError::Config(ref msg) if msg.contains("events_file")));
    }

    #[test]
    fn test_with_data_dir_places_all_files_there() {
        let config = PlannerConfig::with_data_dir("/srv/planner");
        assert_eq!(config.classes_path(), PathBuf::from("/srv/planner/classes.txt"));
        assert_eq!(
            config.past_events_path(),
            PathBuf::from("/srv/planner/past_events.txt")
        );
    }
}
