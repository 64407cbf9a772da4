// Authenticated session state
//
// A session is either anonymous or holds a login token. Protected calls
// need [`Credentials`], which can only be obtained from a session that is
// logged in, so the login guard runs before any request is built.

use std::fmt;

use tracing::info;

use crate::api::{Operation, Params, Transport};
use crate::errors::{Error, Result, TRANSFER_INCOMPLETE_CODE};
use crate::transfer::Transfer;

/// Client kind reported to the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Desktop,
    Web,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Desktop => "Desktop",
            Source::Web => "web",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
enum State {
    Anonymous,
    Authenticated { logintoken: String },
}

/// Proof that the session was logged in when the credentials were taken.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    apikey: &'a str,
    logintoken: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn apikey(&self) -> &'a str {
        self.apikey
    }

    pub fn logintoken(&self) -> &'a str {
        self.logintoken
    }

    /// Base parameters every protected call starts from.
    pub fn params(&self) -> Params {
        Params::new()
            .with("apikey", self.apikey)
            .with("logintoken", self.logintoken)
    }
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("apikey", &"[REDACTED]")
            .field("logintoken", &"[REDACTED]")
            .finish()
    }
}

pub struct Session {
    apikey: String,
    source: Source,
    state: State,
}

impl Session {
    /// A new anonymous session using `apikey`.
    pub fn new(apikey: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            source: Source::Web,
            state: State::Anonymous,
        }
    }

    pub fn apikey(&self) -> &str {
        &self.apikey
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn logintoken(&self) -> Option<&str> {
        match &self.state {
            State::Anonymous => None,
            State::Authenticated { logintoken } => Some(logintoken),
        }
    }

    pub fn logged_in(&self) -> bool {
        self.logintoken().is_some_and(|token| !token.is_empty())
    }

    pub fn is_anonymous(&self) -> bool {
        !self.logged_in()
    }

    /// Login guard: credentials for `operation`, or `AuthRequired` when the
    /// session is anonymous.
    pub fn require_login(&self, operation: &'static str) -> Result<Credentials<'_>> {
        match &self.state {
            State::Authenticated { logintoken } if !logintoken.is_empty() => Ok(Credentials {
                apikey: &self.apikey,
                logintoken,
            }),
            _ => Err(Error::AuthRequired { operation }),
        }
    }

    /// Authenticate `username`. On failure the session state is unchanged.
    pub fn login(&mut self, transport: &dyn Transport, username: &str, password: &str) -> Result<()> {
        let params = Params::new()
            .with("apikey", &self.apikey)
            .with("username", username)
            .with("password", password)
            .with("source", Source::Desktop.as_str());

        let mut res = transport.call(Operation::Login, &params)?;
        if !res.is_success() {
            return Err(res.into_error());
        }

        let logintoken = match res.take_field(Operation::Login, "logintoken")? {
            serde_json::Value::String(token) if !token.is_empty() => token,
            other => {
                return Err(Error::MalformedResponse {
                    operation: Operation::Login.name(),
                    reason: format!("expected a non-empty login token, got {other}"),
                })
            }
        };

        self.state = State::Authenticated { logintoken };
        self.source = Source::Desktop;
        info!(%username, "logged in");
        Ok(())
    }

    /// End the session. Refused while any of `transfers` is unfinished, in
    /// which case the session stays logged in.
    pub fn logout(&mut self, transport: &dyn Transport, transfers: &[Transfer]) -> Result<()> {
        let params = self.require_login(Operation::Logout.name())?.params();

        if transfers.iter().any(|t| !t.is_complete()) {
            return Err(Error::Remote {
                code: TRANSFER_INCOMPLETE_CODE,
                message: "You must complete transfer before logout.".into(),
            });
        }

        let res = transport.call(Operation::Logout, &params)?;
        if !res.is_success() {
            return Err(res.into_error());
        }

        self.state = State::Anonymous;
        info!("logged out");
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source)
            .field("logged_in", &self.logged_in())
            .finish()
    }
}
