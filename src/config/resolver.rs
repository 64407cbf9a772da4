// Config file discovery
//
// The ini config is searched for in a fixed priority order: an explicit
// path from `FILEMAIL_CONFIG_FILE`, the installation directory, then the
// user's home directory. Search paths are plain fields so tests can point
// the resolver at a temporary directory instead of the real filesystem.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Error, Result};

/// File name every discovered config file must carry.
pub const CONFIG_FILENAME: &str = "filemail.cfg";

/// Environment variable overriding config discovery.
pub const CONFIG_ENV_VAR: &str = "FILEMAIL_CONFIG_FILE";

#[derive(Clone, Debug, Default)]
pub struct CredentialResolver {
    env_path: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    located: Option<PathBuf>,
}

impl CredentialResolver {
    /// A resolver with no search paths at all. Useful as a base for tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the resolver from the process environment: the env var, the
    /// directory holding the running executable and the home directory.
    pub fn from_env() -> Self {
        let env_path = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let install_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self {
            env_path,
            install_dir,
            home_dir: dirs::home_dir(),
            located: None,
        }
    }

    pub fn with_env_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = Some(path.into());
        self
    }

    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(dir.into());
        self
    }

    /// Candidate paths in priority order.
    fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(3);
        if let Some(p) = &self.env_path {
            paths.push(p.clone());
        }
        if let Some(dir) = &self.install_dir {
            paths.push(dir.join(CONFIG_FILENAME));
        }
        if let Some(dir) = &self.home_dir {
            paths.push(dir.join(CONFIG_FILENAME));
        }
        paths
    }

    /// Return the first existing config file, caching the hit.
    ///
    /// A file whose name is not `filemail.cfg` is skipped even if it exists,
    /// so an env var pointing at some unrelated file is ignored.
    pub fn locate(&mut self) -> Option<&Path> {
        if self.located.is_none() {
            self.located = self.candidates().into_iter().find(|path| {
                path.is_file()
                    && path.file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILENAME)
            });
            if let Some(path) = &self.located {
                debug!(path = %path.display(), "located config file");
            }
        }
        self.located.as_deref()
    }

    /// Where a new config file goes when none could be located.
    pub fn default_save_path(&self) -> Result<PathBuf> {
        self.home_dir
            .as_ref()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .ok_or(Error::NoConfigLocation)
    }
}
