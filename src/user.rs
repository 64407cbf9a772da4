// Account level client
//
// `User` ties together the stored settings, the login session and the
// transport. Every operation except `login` goes through the session's
// login guard first, so an anonymous user never reaches the network.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::api::{ApiResponse, Operation, Transport};
use crate::config::{
    is_placeholder_key, ConfigKey, ConfigStore, ConfigValue, CredentialResolver, SettingsFile,
};
use crate::contact::Contact;
use crate::errors::{Error, Result};
use crate::session::Session;
use crate::transfer::{Identity, Owner, Transfer, TransferRegistry};

/// Oldest received transfers that can be asked for, in days.
pub const MAX_RECEIVED_AGE_DAYS: u32 = 90;

/// How a `User` finds its settings and whether it logs in right away.
#[derive(Clone, Debug, Default)]
pub struct UserOptions {
    /// Log in during construction when set.
    pub password: Option<String>,
    /// Overrides whatever API key the settings hold.
    pub apikey: Option<String>,
    /// Search paths for the ini config. Defaults to the process environment.
    pub resolver: Option<CredentialResolver>,
    /// JSON settings file. Defaults to the platform data directory.
    pub settings: Option<SettingsFile>,
}

pub struct User {
    identity: Arc<Identity>,
    config: ConfigStore,
    settings: SettingsFile,
    session: Session,
    transport: Box<dyn Transport>,
    transfers: Vec<Transfer>,
}

impl User {
    /// Load settings for `username` and open an anonymous session, logging
    /// in straight away when `options.password` is given.
    pub fn open(
        username: &str,
        transport: impl Transport + 'static,
        options: UserOptions,
    ) -> Result<Self> {
        let mut config = match options.resolver {
            Some(resolver) => ConfigStore::with_resolver(username, resolver)?,
            None => ConfigStore::new(username)?,
        };

        let settings = match options.settings {
            Some(settings) => settings,
            None => SettingsFile::default_location()?,
        };
        let mut stored = settings.load_or_create()?;
        stored.remove(ConfigKey::Username.as_str());
        config.update_known(&stored)?;
        config.load()?;
        if let Some(apikey) = options.apikey {
            config.set_key(ConfigKey::Apikey, apikey)?;
        }

        let apikey = config
            .get_str(ConfigKey::Apikey)
            .ok_or_else(|| Error::RequiredKey {
                key: ConfigKey::Apikey.as_str().to_string(),
            })?
            .to_string();
        if is_placeholder_key(&apikey) {
            warn!(path = %settings.path().display(), "No API KEY set in config: {apikey}");
        }

        let mut user = Self {
            identity: Identity::new(username),
            config,
            settings,
            session: Session::new(apikey),
            transport: Box::new(transport),
            transfers: Vec::new(),
        };
        if let Some(password) = options.password {
            user.login(&password)?;
        }
        Ok(user)
    }

    pub fn username(&self) -> &str {
        self.identity.username()
    }

    pub(crate) fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn logged_in(&self) -> bool {
        self.session.logged_in()
    }

    pub fn is_anonymous(&self) -> bool {
        self.session.is_anonymous()
    }

    /// Transfers this user is responsible for. Logout waits on these.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn transfers_mut(&mut self) -> &mut [Transfer] {
        &mut self.transfers
    }

    /// Start tracking a new outbound transfer sent by this user.
    pub fn new_transfer(&mut self) -> &mut Transfer {
        let owner = Owner::Local(Arc::downgrade(&self.identity));
        self.transfers.push(Transfer::new(owner));
        let last = self.transfers.len() - 1;
        &mut self.transfers[last]
    }

    pub fn track_transfer(&mut self, transfer: Transfer) {
        self.transfers.push(transfer);
    }

    /// Write the current settings to the JSON settings file.
    pub fn save_config(&self) -> Result<()> {
        let data: Map<String, Value> = self
            .config
            .config()
            .iter()
            .filter(|(_, value)| **value != ConfigValue::Null)
            .map(|(key, value)| (key.as_str().to_string(), config_to_json(value)))
            .collect();
        self.settings.save(&data)
    }

    pub fn login(&mut self, password: &str) -> Result<()> {
        let username = self.identity.username().to_string();
        self.session
            .login(self.transport.as_ref(), &username, password)
    }

    /// Log out. Fails while any tracked transfer is unfinished.
    pub fn logout(&mut self) -> Result<()> {
        self.session
            .logout(self.transport.as_ref(), &self.transfers)
    }

    /// Transfers previously sent by this user (or by the whole business
    /// account when `for_all` is set).
    pub fn get_sent(&self, expired: bool, for_all: bool) -> Result<Vec<Transfer>> {
        let credentials = self.session.require_login(Operation::SentGet.name())?;
        let params = credentials
            .params()
            .with("getexpired", expired)
            .with("getforallusers", for_all);

        let res = self.transport.call(Operation::SentGet, &params)?;
        let res = success(res)?;
        TransferRegistry::new(&self.identity, self.transport.as_ref(), credentials)
            .restore(Operation::SentGet, res)
    }

    /// Transfers sent to this user, optionally limited to the last `age`
    /// days (at most 90).
    pub fn get_received_files(&self, age: Option<u32>, for_all: bool) -> Result<Vec<Transfer>> {
        let credentials = self.session.require_login(Operation::ReceivedGet.name())?;
        let mut params = credentials.params().with("getForAllUsers", for_all);

        if let Some(age) = age.filter(|age| *age > 0) {
            if age > MAX_RECEIVED_AGE_DAYS {
                return Err(Error::InvalidArgument {
                    reason: format!("Age must be between 0-{MAX_RECEIVED_AGE_DAYS}, got {age}"),
                });
            }
            let since = chrono::Utc::now() - chrono::Duration::days(i64::from(age));
            params.insert("from", since.timestamp());
        }

        let res = self.transport.call(Operation::ReceivedGet, &params)?;
        let res = success(res)?;
        TransferRegistry::new(&self.identity, self.transport.as_ref(), credentials)
            .restore(Operation::ReceivedGet, res)
    }

    /// Account info and default settings, optionally merged into the config.
    pub fn get_user_info(&mut self, save_to_config: bool) -> Result<Map<String, Value>> {
        let credentials = self.session.require_login(Operation::UserGet.name())?;
        let res = self.transport.call(Operation::UserGet, &credentials.params())?;
        let mut res = success(res)?;

        let info = match res.take_field(Operation::UserGet, "user")? {
            Value::Object(info) => info,
            other => {
                return Err(Error::MalformedResponse {
                    operation: Operation::UserGet.name(),
                    reason: format!("`user` is not an object: {other}"),
                })
            }
        };
        if save_to_config {
            let mut merged = info.clone();
            merged.remove(ConfigKey::Username.as_str());
            self.config.update_known(&merged)?;
        }
        Ok(info)
    }

    /// Merge `changes` into the config and send the resulting settings.
    pub fn update_user_info<I, K, V>(&mut self, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ConfigValue>,
    {
        let credentials = self.session.require_login(Operation::UserUpdate.name())?;
        self.config.update(changes)?;

        let mut params = credentials.params();
        for (key, value) in self.config.config() {
            match key {
                ConfigKey::Apikey | ConfigKey::Logintoken | ConfigKey::Password => {}
                _ if *value == ConfigValue::Null => {}
                _ => params.insert(key.as_str(), value),
            }
        }

        let res = self.transport.call(Operation::UserUpdate, &params)?;
        success(res).map(|_| ())
    }

    /// Contacts, usually people files were sent to before.
    pub fn get_contacts(&self) -> Result<Vec<Contact>> {
        let credentials = self.session.require_login(Operation::ContactsGet.name())?;
        let res = self.transport.call(Operation::ContactsGet, &credentials.params())?;
        let mut res = success(res)?;
        let contacts = res.take_field(Operation::ContactsGet, "contacts")?;
        parse(Operation::ContactsGet, contacts)
    }

    /// Find a contact by exact email. This searches the full contact list
    /// locally; the service has no lookup for it.
    pub fn get_contact(&self, email: &str) -> Result<Contact> {
        self.get_contacts()?
            .into_iter()
            .find(|contact| contact.email == email)
            .ok_or_else(|| Error::NotFound {
                what: format!("No contact with email: \"{email}\" found."),
            })
    }

    pub fn update_contact(&self, contact: &Contact) -> Result<()> {
        let credentials = self.session.require_login(Operation::ContactsUpdate.name())?;
        let params = credentials
            .params()
            .with("contactid", &contact.contactid)
            .with("name", &contact.name)
            .with("email", &contact.email);

        let res = self.transport.call(Operation::ContactsUpdate, &params)?;
        success(res).map(|_| ())
    }

    pub fn add_contact(&self, name: &str, email: &str) -> Result<Contact> {
        let credentials = self.session.require_login(Operation::ContactsAdd.name())?;
        let params = credentials.params().with("name", name).with("email", email);

        let res = self.transport.call(Operation::ContactsAdd, &params)?;
        let mut res = success(res)?;
        let contact = res.take_field(Operation::ContactsAdd, "contact")?;
        parse(Operation::ContactsAdd, contact)
    }

    pub fn delete_contact(&self, contact: &Contact) -> Result<()> {
        let credentials = self.session.require_login(Operation::ContactsDelete.name())?;
        let params = credentials.params().with("contactid", &contact.contactid);

        let res = self.transport.call(Operation::ContactsDelete, &params)?;
        success(res).map(|_| ())
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username())
            .field("session", &self.session)
            .field("transfers", &self.transfers.len())
            .finish()
    }
}

fn success(res: ApiResponse) -> Result<ApiResponse> {
    if res.is_success() {
        Ok(res)
    } else {
        Err(res.into_error())
    }
}

fn parse<T: serde::de::DeserializeOwned>(operation: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::MalformedResponse {
        operation: operation.name(),
        reason: e.to_string(),
    })
}

fn config_to_json(value: &ConfigValue) -> Value {
    match value {
        ConfigValue::Null => Value::Null,
        ConfigValue::Bool(b) => Value::Bool(*b),
        ConfigValue::Int(i) => Value::from(*i),
        ConfigValue::Str(s) => Value::String(s.clone()),
    }
}
