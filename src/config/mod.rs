// Credentials and preferences
//
// Two stores live here: the ini-backed [`ConfigStore`] with its strict key
// schema, and the JSON [`SettingsFile`] in the platform data directory that
// holds the API key for the account client.

mod keys;
mod resolver;
mod settings;
mod store;

pub use keys::{ConfigKey, ConfigValue};
pub use resolver::{CredentialResolver, CONFIG_ENV_VAR, CONFIG_FILENAME};
pub use settings::{is_placeholder_key, SettingsFile, API_KEY_PLACEHOLDER};
pub use store::ConfigStore;
