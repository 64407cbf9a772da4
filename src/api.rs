// API transport module: everything that crosses the network goes through
// the `Transport` trait defined here. The account code only names an
// `Operation` and hands over its parameters; `HttpTransport` turns that into
// a blocking reqwest call against the filemail web API.
//
// Keeping the trait small means tests can swap in a recording transport and
// check exactly which calls were made.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Error, Result};

/// Default base URL of the filemail web API.
pub const DEFAULT_BASE_URL: &str = "https://www.filemail.com";

/// HTTP status the service uses to signal success.
pub const STATUS_OK: u16 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Named remote operations and their routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Logout,
    SentGet,
    ReceivedGet,
    UserGet,
    UserUpdate,
    ContactsGet,
    ContactsUpdate,
    ContactsAdd,
    ContactsDelete,
    TransferGet,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Logout => "logout",
            Operation::SentGet => "get_sent",
            Operation::ReceivedGet => "received_get",
            Operation::UserGet => "user_get",
            Operation::UserUpdate => "user_update",
            Operation::ContactsGet => "contacts_get",
            Operation::ContactsUpdate => "contacts_update",
            Operation::ContactsAdd => "contacts_add",
            Operation::ContactsDelete => "contacts_delete",
            Operation::TransferGet => "transfer_get",
        }
    }

    /// HTTP method and path relative to the base URL.
    pub fn route(self) -> (Method, &'static str) {
        match self {
            Operation::Login => (Method::Post, "api/authentication/login"),
            Operation::Logout => (Method::Post, "api/authentication/logout"),
            Operation::SentGet => (Method::Get, "api/transfer/sent/get"),
            Operation::ReceivedGet => (Method::Get, "api/transfer/received/get"),
            Operation::UserGet => (Method::Get, "api/user/get"),
            Operation::UserUpdate => (Method::Post, "api/user/update"),
            Operation::ContactsGet => (Method::Get, "api/contacts/get"),
            Operation::ContactsUpdate => (Method::Post, "api/contacts/update"),
            Operation::ContactsAdd => (Method::Post, "api/contacts/add"),
            Operation::ContactsDelete => (Method::Post, "api/contacts/delete"),
            Operation::TransferGet => (Method::Get, "api/transfer/get"),
        }
    }
}

/// Request parameters. Every value is sent in its string form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// Status and parsed body of one API call. Bodies that are not JSON are
/// kept as a JSON string so the error path can still show them.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(STATUS_OK, body)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Remove a top-level field from the body. A missing field means the
    /// service broke its contract, which is reported rather than ignored.
    pub fn take_field(&mut self, operation: Operation, field: &str) -> Result<Value> {
        self.body
            .as_object_mut()
            .and_then(|body| body.remove(field))
            .ok_or_else(|| Error::MalformedResponse {
                operation: operation.name(),
                reason: format!("missing field `{field}`"),
            })
    }

    /// Build the structured error for a failed call from its body.
    pub fn into_error(self) -> Error {
        let code = match self.body.get("errorcode") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .unwrap_or(i64::from(self.status));

        let message = match (self.body.get("errormessage"), &self.body) {
            (Some(Value::String(msg)), _) => msg.clone(),
            (_, Value::String(text)) if !text.is_empty() => text.clone(),
            _ => format!("request failed with HTTP status {}", self.status),
        };
        Error::Remote { code, message }
    }
}

/// Outbound side of every remote call.
pub trait Transport {
    fn call(&self, operation: Operation, params: &Params) -> Result<ApiResponse>;
}

/// Blocking HTTP transport with a cookie store, so cookies the service
/// sets on login are sent back on later calls.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport configured from `FILEMAIL_API_URL` (falling back
    /// to the public service) and an optional `FILEMAIL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("FILEMAIL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout = std::env::var("FILEMAIL_TIMEOUT_SECS")
            .ok()
            .map(|secs| {
                secs.parse::<u64>().map_err(|_| Error::InvalidArgument {
                    reason: format!("FILEMAIL_TIMEOUT_SECS must be whole seconds, got {secs:?}"),
                })
            })
            .transpose()?
            .map(Duration::from_secs);
        Self::new(base_url, timeout)
    }

    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpTransport {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn call(&self, operation: Operation, params: &Params) -> Result<ApiResponse> {
        let (method, path) = operation.route();
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(operation = operation.name(), %url, "calling filemail api");

        let req = match method {
            Method::Get => self.client.get(&url).query(&params.0),
            Method::Post => self.client.post(&url).form(&params.0),
        };
        let res = req.send()?;
        let status = res.status().as_u16();
        let text = res.text()?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text));
        debug!(operation = operation.name(), status, "filemail api responded");
        Ok(ApiResponse { status, body })
    }
}
