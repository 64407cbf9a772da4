// Library root
// -----------
// This crate exposes the filemail account client as a library. The binary
// (`main.rs`) uses these modules to implement the interactive CLI.
//
// Module responsibilities:
// - `api`: The transport boundary. Names every remote operation and sends it
//   over blocking HTTP.
// - `config`: Schema-checked settings, config file discovery and the JSON
//   settings file holding the API key.
// - `session`: Login state and the guard protected calls go through.
// - `transfer`: Transfer handles rebuilt from listing responses.
// - `user`: The account client tying the pieces together.
// - `ui`: Terminal menus on top of `user`.
pub mod api;
pub mod config;
pub mod contact;
pub mod errors;
pub mod session;
pub mod transfer;
pub mod ui;
pub mod user;

pub use errors::{Error, Result};
pub use user::{User, UserOptions};
