//! On-disk access token storage.

use super::token::AccessToken;
use crate::config::xdg_data_dir;
use crate::error::EasyTLError;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const TOKEN_FILE_NAME: &str = "access_token";

/// Persists the access token between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `~/.local/share/easytl/access_token`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the data directory is unknown.
    pub fn default_location() -> Result<Self, EasyTLError> {
        xdg_data_dir()
            .map(|dir| Self::new(dir.join(TOKEN_FILE_NAME)))
            .ok_or_else(|| {
                EasyTLError::configuration(
                    "token_store",
                    "could not determine the XDG data directory; set XDG_DATA_HOME",
                )
            })
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<AccessToken>, EasyTLError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(AccessToken::new(contents))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EasyTLError::storage(&self.path, e.to_string())),
        }
    }

    /// Writes `token`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written.
    pub fn save(&self, token: &AccessToken) -> Result<(), EasyTLError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EasyTLError::storage(parent, e.to_string()))?;
        }

        let mut file = open_private(&self.path)
            .map_err(|e| EasyTLError::storage(&self.path, e.to_string()))?;
        file.write_all(token.as_str().as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| EasyTLError::storage(&self.path, e.to_string()))?;

        debug!(path = %self.path.display(), "stored access token");
        Ok(())
    }

    /// Removes the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), EasyTLError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed access token");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EasyTLError::storage(&self.path, e.to_string())),
        }
    }
}

/// Opens the token file for writing with owner-only access.
///
/// A new file is created as 0600. An existing file is narrowed to 0600
/// before it is truncated, so the token is never written to a file other
/// users can read.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.set_len(0)?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
