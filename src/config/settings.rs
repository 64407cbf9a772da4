// Per-application JSON settings file
//
// The account client keeps its API key (and whatever else it decides to
// persist) in a single JSON object under the platform data directory:
//
// - Linux: `~/.local/share/filemail/filemail.json`
// - macOS: `~/Library/Application Support/filemail/filemail.json`
// - Windows: `C:\Users\{username}\AppData\Roaming\filemail\filemail.json`

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{Error, Result};

/// Stored until the user pastes a real API key.
pub const API_KEY_PLACEHOLDER: &str = "GET KEY FROM www.filemail.com/apidoc/ApiKey.aspx";

const APP_DIR: &str = "filemail";
const SETTINGS_FILENAME: &str = "filemail.json";

/// Whether `apikey` is still the placeholder written on first run.
pub fn is_placeholder_key(apikey: &str) -> bool {
    apikey.starts_with("GET KEY FROM")
}

#[derive(Clone, Debug)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// The settings file in the platform data directory.
    pub fn default_location() -> Result<Self> {
        let dir = dirs::data_dir().ok_or(Error::NoConfigLocation)?;
        Ok(Self::at(dir.join(APP_DIR).join(SETTINGS_FILENAME)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings, writing a default file with a placeholder API key
    /// first if none exists yet.
    pub fn load_or_create(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            let mut defaults = Map::new();
            defaults.insert("apikey".into(), Value::String(API_KEY_PLACEHOLDER.into()));
            self.save(&defaults)?;
            warn!(path = %self.path.display(), "created settings file, set your API key in it");
        }

        let data = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.parse_error("expected a JSON object".into())),
            Err(e) => Err(self.parse_error(e.to_string())),
        }
    }

    pub fn save(&self, settings: &Map<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }
        let data = serde_json::to_string_pretty(settings)
            .map_err(|e| self.parse_error(e.to_string()))?;
        fs::write(&self.path, data).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::ConfigIo {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_error(&self, reason: String) -> Error {
        Error::ConfigParse {
            path: self.path.clone(),
            reason,
        }
    }
}
