// Schema-validated settings for one username
//
// A `ConfigStore` only ever holds keys from [`ConfigKey`]; required keys
// can never be set to an empty value. The store can be persisted to an ini
// file where each username owns one section.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption};
use tracing::{debug, warn};

use super::keys::{ConfigKey, ConfigValue};
use super::resolver::CredentialResolver;
use crate::errors::{Error, Result};

const SECTION_RESERVED: &[char] = &['[', ']', ';', '#', '=', ':'];

pub struct ConfigStore {
    values: BTreeMap<ConfigKey, ConfigValue>,
    config_file: Option<PathBuf>,
    resolver: CredentialResolver,
}

impl ConfigStore {
    /// Create a store for `username`, discovering the config file from the
    /// process environment.
    pub fn new(username: &str) -> Result<Self> {
        Self::with_resolver(username, CredentialResolver::from_env())
    }

    /// Create a store for `username` using the given search paths.
    pub fn with_resolver(username: &str, resolver: CredentialResolver) -> Result<Self> {
        let mut store = Self {
            values: BTreeMap::new(),
            config_file: None,
            resolver,
        };
        store.set_key(ConfigKey::Username, username)?;
        store.check_for_config_file();
        Ok(store)
    }

    /// Create a store and apply initial settings, e.g. an apikey and
    /// password that are not yet stored on disk.
    pub fn with_values<I, K, V>(
        username: &str,
        resolver: CredentialResolver,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ConfigValue>,
    {
        let mut store = Self::with_resolver(username, resolver)?;
        store.update(values)?;
        Ok(store)
    }

    /// Try to locate the config file and remember its path.
    pub fn check_for_config_file(&mut self) {
        if self.config_file.is_none() {
            self.config_file = self.resolver.locate().map(Path::to_path_buf);
        }
    }

    pub fn is_valid_key(key: &str) -> bool {
        key.parse::<ConfigKey>().is_ok()
    }

    /// Add or overwrite a key, validating it against the schema first.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        let key: ConfigKey = key.parse()?;
        self.set_key(key, value)
    }

    pub fn set_key(&mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Result<()> {
        let value = value.into();
        if key.is_required() && value.is_empty() {
            return Err(Error::RequiredKey {
                key: key.as_str().to_string(),
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Value stored for `key`, or `None` when unset or not a schema key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        key.parse::<ConfigKey>()
            .ok()
            .and_then(|key| self.values.get(&key))
    }

    /// String value of `key`, if it is set to a string.
    pub fn get_str(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).and_then(ConfigValue::as_str)
    }

    pub fn username(&self) -> &str {
        self.get_str(ConfigKey::Username).unwrap_or_default()
    }

    /// Apply `set` for every entry, stopping at the first failure.
    ///
    /// Entries applied before the failing one stay applied.
    pub fn update<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ConfigValue>,
    {
        for (key, value) in values {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Merge settings reported by the service, skipping keys outside the
    /// schema instead of failing on them.
    pub fn update_known(
        &mut self,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        for (key, value) in values {
            match key.parse::<ConfigKey>() {
                Ok(key) => self.set_key(key, ConfigValue::from_json(value))?,
                Err(_) => debug!(key = %key, "skipping setting outside config schema"),
            }
        }
        Ok(())
    }

    /// The full current mapping.
    pub fn config(&self) -> &BTreeMap<ConfigKey, ConfigValue> {
        &self.values
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn set_config_file(&mut self, path: impl Into<PathBuf>) {
        self.config_file = Some(path.into());
    }

    /// This user's section name, refused when the ini format can't carry it.
    fn section_name(&self) -> Result<String> {
        let username = self.username();
        if username.contains(|c: char| SECTION_RESERVED.contains(&c) || c.is_control()) {
            return Err(Error::UnstorableValue {
                key: ConfigKey::Username.as_str().to_string(),
                reason: "section names can't contain brackets, `;#=:` or control characters",
            });
        }
        check_storable(ConfigKey::Username.as_str(), username)?;
        Ok(username.to_string())
    }

    /// Write the current settings to this user's section of the config file.
    ///
    /// Falls back to `~/filemail.cfg` when no file could be located. Other
    /// users' sections in an existing file are kept.
    pub fn save(&mut self) -> Result<PathBuf> {
        self.check_for_config_file();
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => self.resolver.default_save_path()?,
        };

        let username = self.section_name()?;
        let mut entries = Vec::with_capacity(self.values.len());
        for (key, value) in &self.values {
            if *value == ConfigValue::Null {
                continue;
            }
            let value = value.to_param();
            check_storable(key.as_str(), &value)?;
            entries.push((key.as_str(), value));
        }

        let mut ini = if path.is_file() {
            read_ini(&path)?
        } else {
            Ini::new()
        };
        ini.delete(Some(username.as_str()));
        for (key, value) in entries {
            ini.with_section(Some(username.as_str())).set(key, value);
        }

        // `;#=:` are ini syntax, so they are escaped along with control characters.
        ini.write_to_file_policy(&path, EscapePolicy::Reserved)
            .map_err(|source| Error::ConfigIo {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "saved config");
        self.config_file = Some(path.clone());
        Ok(path)
    }

    /// Merge this user's section of the config file into the store.
    ///
    /// Without a discoverable file this is a no-op, so a first run can
    /// start from an empty store. Values from disk still go through `set`.
    pub fn load(&mut self) -> Result<()> {
        self.check_for_config_file();
        let Some(path) = self.config_file.clone() else {
            debug!("no config file found, nothing to load");
            return Ok(());
        };

        let username = self.section_name()?;
        let ini = read_ini(&path)?;
        match ini.section(Some(username.as_str())) {
            Some(section) => {
                for (key, value) in section.iter() {
                    self.set(key, value)?;
                }
            }
            None => warn!(
                path = %path.display(),
                %username,
                "config file has no section for user"
            ),
        }
        Ok(())
    }
}

// The parser trims around values, so padding would silently change them.
fn check_storable(key: &str, value: &str) -> Result<()> {
    if value.trim() != value {
        return Err(Error::UnstorableValue {
            key: key.to_string(),
            reason: "leading or trailing whitespace",
        });
    }
    Ok(())
}

fn read_ini(path: &Path) -> Result<Ini> {
    let opt = ParseOption {
        enabled_quote: false,
        enabled_escape: true,
        ..Default::default()
    };
    Ini::load_from_file_opt(path, opt).map_err(|e| match e {
        ini::Error::Io(source) => Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        },
        ini::Error::Parse(parse) => Error::ConfigParse {
            path: path.to_path_buf(),
            reason: parse.to_string(),
        },
    })
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted: BTreeMap<&str, String> = self
            .values
            .iter()
            .map(|(key, value)| {
                let shown = match key {
                    ConfigKey::Password | ConfigKey::Logintoken => "[REDACTED]".to_string(),
                    _ => value.to_param(),
                };
                (key.as_str(), shown)
            })
            .collect();
        f.debug_struct("ConfigStore")
            .field("values", &redacted)
            .field("config_file", &self.config_file)
            .finish()
    }
}
