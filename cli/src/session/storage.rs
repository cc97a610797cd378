//! Session persistence.
//!
//! This module stores the token pair between process runs:
//! - [`SessionStore`] - Trait for session storage operations
//! - [`FileSessionStore`] - JSON file storage, replaced atomically and readable
//!   only by the owner

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::error::{Result, TidalError};

/// A persisted session: the token pair and the client it was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub tokens: TokenPair,
    pub client_id: Option<String>,
}

/// On-disk layout. Every field is optional so a damaged file yields a
/// precise error instead of a generic parse failure.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
}

impl SessionFile {
    fn from_session(session: &StoredSession) -> Self {
        Self {
            access_token: Some(session.tokens.access_token.clone()),
            refresh_token: Some(session.tokens.refresh_token.clone()),
            expires_at: Some(session.tokens.expires_at),
            user_id: session.tokens.user_id.clone(),
            client_id: session.client_id.clone(),
        }
    }

    fn into_session(self, path: &Path) -> Result<StoredSession> {
        let missing = |field: &str| {
            TidalError::Config(format!(
                "Session file {} has no {field}. Run 'tidal-bridge auth login' again.",
                path.display()
            ))
        };

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("access_token"))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("refresh_token"))?;
        let expires_at = self.expires_at.ok_or_else(|| missing("expires_at"))?;

        Ok(StoredSession {
            tokens: TokenPair {
                access_token,
                refresh_token,
                expires_at,
                user_id: self.user_id,
            },
            client_id: self.client_id,
        })
    }
}

/// Trait for session storage operations (enables mocking).
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Replaces the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Loads the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if nothing is stored or the stored data
    /// is malformed or incomplete.
    fn load(&self) -> Result<StoredSession>;

    /// Deletes the stored session.
    ///
    /// Returns `true` if a session was deleted, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn delete(&self) -> Result<bool>;

    /// Checks if a session is stored.
    fn exists(&self) -> bool;
}

/// JSON file session storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&SessionFile::from_session(session))?;
        let temp = self.temp_path();

        {
            let mut file = open_private(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn load(&self) -> Result<StoredSession> {
        if !self.path.exists() {
            return Err(TidalError::Config(format!(
                "No saved session at {}. Run 'tidal-bridge auth login' first.",
                self.path.display()
            )));
        }

        let contents = fs::read_to_string(&self.path)?;
        let file: SessionFile = serde_json::from_str(&contents).map_err(|e| {
            TidalError::Config(format!(
                "Session file {} is corrupted: {e}",
                self.path.display()
            ))
        })?;

        file.into_session(&self.path)
    }

    fn delete(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        fs::remove_file(&self.path)?;
        Ok(true)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample() -> StoredSession {
        StoredSession {
            tokens: TokenPair {
                access_token: "A1".into(),
                refresh_token: "R1".into(),
                expires_at: "2026-10-19T12:00:00Z".parse().unwrap(),
                user_id: Some("12345".into()),
            },
            client_id: Some("abc".into()),
        }
    }

    fn store_in(dir: &TempDir) -> FileSessionStore {
        FileSessionStore::new(dir.path().join("tidal-session-oauth.json"))
    }

    #[test]
    fn save_then_load_is_lossless() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn file_layout_is_flat_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["access_token"], "A1");
        assert_eq!(raw["refresh_token"], "R1");
        assert_eq!(raw["expires_at"], "2026-10-19T12:00:00Z");
        assert_eq!(raw["client_id"], "abc");
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        let mut rotated = sample();
        rotated.tokens.access_token = "A2".into();
        store.save(&rotated).unwrap();

        assert_eq!(store.load().unwrap().tokens.access_token, "A2");
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));

        store.save(&sample()).unwrap();

        assert!(store.exists());
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = store_in(&dir).load().unwrap_err();
        assert!(matches!(err, TidalError::Config(_)));
    }

    #[test]
    fn load_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load(), Err(TidalError::Config(_))));
    }

    #[test]
    fn load_names_the_missing_field() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), r#"{"refresh_token":"R1","expires_at":"2026-10-19T12:00:00Z"}"#)
            .unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("access_token"));

        fs::write(store.path(), r#"{"access_token":"A1","expires_at":"2026-10-19T12:00:00Z"}"#)
            .unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("refresh_token"));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        assert!(store.delete().unwrap());
        assert!(!store.delete().unwrap());
        assert!(!store.exists());
    }
}
