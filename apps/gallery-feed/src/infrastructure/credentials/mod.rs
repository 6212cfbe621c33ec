//! Credential Persistence
//!
//! Keeps the bearer token in a single file so a restart can resume the
//! session without logging in again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::application::ports::{CredentialStore, CredentialStoreError};
use crate::domain::connection::Credential;

/// Token store backed by one file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let credential = Credential::new(contents);
                Ok((!credential.is_empty()).then_some(credential))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, credential.token())?;
        tracing::debug!(path = %self.path.display(), "Stored credential");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Cleared credential");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
