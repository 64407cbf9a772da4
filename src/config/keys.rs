// Config key schema and scalar values

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Every key a config store accepts.
///
/// The first three are required: once present they can never hold an
/// empty value. The remaining keys are optional account settings that
/// mirror what the remote service reports for a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    Apikey,
    Password,
    Username,
    Country,
    Created,
    DefaultConfirmation,
    DefaultDays,
    DefaultDownloads,
    DefaultNotify,
    DefaultSubject,
    Email,
    Logintoken,
    MaxDays,
    MaxDownloads,
    MaxTransferSize,
    MembershipName,
    Name,
    Newsletter,
    Signature,
    Source,
    Subscription,
}

impl ConfigKey {
    pub const REQUIRED: &'static [ConfigKey] =
        &[ConfigKey::Apikey, ConfigKey::Password, ConfigKey::Username];

    pub const ALL: &'static [ConfigKey] = &[
        ConfigKey::Apikey,
        ConfigKey::Password,
        ConfigKey::Username,
        ConfigKey::Country,
        ConfigKey::Created,
        ConfigKey::DefaultConfirmation,
        ConfigKey::DefaultDays,
        ConfigKey::DefaultDownloads,
        ConfigKey::DefaultNotify,
        ConfigKey::DefaultSubject,
        ConfigKey::Email,
        ConfigKey::Logintoken,
        ConfigKey::MaxDays,
        ConfigKey::MaxDownloads,
        ConfigKey::MaxTransferSize,
        ConfigKey::MembershipName,
        ConfigKey::Name,
        ConfigKey::Newsletter,
        ConfigKey::Signature,
        ConfigKey::Source,
        ConfigKey::Subscription,
    ];

    /// Name of the key as stored on disk and sent to the service.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Apikey => "apikey",
            ConfigKey::Password => "password",
            ConfigKey::Username => "username",
            ConfigKey::Country => "country",
            ConfigKey::Created => "created",
            ConfigKey::DefaultConfirmation => "defaultconfirmation",
            ConfigKey::DefaultDays => "defaultdays",
            ConfigKey::DefaultDownloads => "defaultdownloads",
            ConfigKey::DefaultNotify => "defaultnotify",
            ConfigKey::DefaultSubject => "defaultsubject",
            ConfigKey::Email => "email",
            ConfigKey::Logintoken => "logintoken",
            ConfigKey::MaxDays => "maxdays",
            ConfigKey::MaxDownloads => "maxdownloads",
            ConfigKey::MaxTransferSize => "maxtransfersize",
            ConfigKey::MembershipName => "membershipname",
            ConfigKey::Name => "name",
            ConfigKey::Newsletter => "newsletter",
            ConfigKey::Signature => "signature",
            ConfigKey::Source => "source",
            ConfigKey::Subscription => "subscription",
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidKey { key: s.to_string() })
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar config value.
///
/// The service reports settings as JSON scalars, while the ini file only
/// knows strings, so values read back from disk always come back as `Str`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    /// Whether the value counts as absent for a required key.
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::Null => true,
            ConfigValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// String form used for ini files and request parameters.
    pub fn to_param(&self) -> String {
        match self {
            ConfigValue::Null => String::new(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Str(s) => s.clone(),
        }
    }

    /// Convert a JSON value from the service. Arrays and objects are kept
    /// as their JSON text since the schema only holds scalars.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Int(i),
                None => ConfigValue::Str(n.to_string()),
            },
            serde_json::Value::String(s) => ConfigValue::Str(s.clone()),
            other => ConfigValue::Str(other.to_string()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param())
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ConfigValue::Null, Into::into)
    }
}
