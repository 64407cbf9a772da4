// Shared fixtures: a recording transport and a user wired to temp files.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use filemail_client::api::{ApiResponse, Operation, Params, Transport};
use filemail_client::config::{CredentialResolver, SettingsFile};
use filemail_client::{Result, User, UserOptions};
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Default)]
struct SpyState {
    responses: VecDeque<ApiResponse>,
    calls: Vec<(Operation, Params)>,
}

/// Transport that replays queued responses in order and records each call.
/// Clones share state, so a test keeps one clone after handing the other
/// to a `User`.
#[derive(Clone, Default)]
pub struct SpyTransport {
    state: Arc<Mutex<SpyState>>,
}

impl SpyTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: ApiResponse) -> &Self {
        self.state.lock().unwrap().responses.push_back(response);
        self
    }

    pub fn respond_ok(&self, body: Value) -> &Self {
        self.respond(ApiResponse::ok(body))
    }

    pub fn calls(&self) -> Vec<(Operation, Params)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls().into_iter().map(|(op, _)| op).collect()
    }
}

impl Transport for SpyTransport {
    fn call(&self, operation: Operation, params: &Params) -> Result<ApiResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((operation, params.clone()));
        Ok(state
            .responses
            .pop_front()
            .unwrap_or_else(|| panic!("no response queued for {}", operation.name())))
    }
}

/// Temp home directory with an empty config search path.
pub struct Env {
    pub dir: TempDir,
}

impl Env {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn options(&self) -> UserOptions {
        UserOptions {
            resolver: Some(CredentialResolver::empty().with_home_dir(self.dir.path())),
            settings: Some(SettingsFile::at(self.dir.path().join("filemail.json"))),
            apikey: Some("KEY".into()),
            ..UserOptions::default()
        }
    }

    pub fn anonymous(&self, spy: &SpyTransport) -> User {
        User::open("alice", spy.clone(), self.options()).unwrap()
    }

    pub fn logged_in(&self, spy: &SpyTransport) -> User {
        spy.respond_ok(json!({"logintoken": "TOKEN"}));
        let options = UserOptions {
            password: Some("secret".into()),
            ..self.options()
        };
        User::open("alice", spy.clone(), options).unwrap()
    }
}

/// Collects formatted log output of code run through [`LogCapture::run`].
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
