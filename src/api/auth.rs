//! Session credentials for authenticated requests.
//!
//! The bearer token is read through a [`TokenSource`] on every request, so a
//! re-login is picked up without rebuilding the client. Persisted sessions
//! live either in the OS keychain (`keyring`) or in a JSON session file under
//! the user's config directory.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keychain service name for the console.
const SERVICE_NAME: &str = "com.inventory.console";

/// Fixed keychain account names, one per session field.
const TOKEN_KEY: &str = "auth_token";
const USER_ID_KEY: &str = "user_id";
const ROLE_KEY: &str = "role";

const SESSION_DIR: &str = "inventory-console";
const SESSION_FILE: &str = "session.json";

/// Session files hold a bearer token: owner read/write only.
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Keychain operation failed: {0}")]
    Keychain(String),
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("No config directory available for the session file")]
    NoConfigDir,
}

impl From<keyring::Error> for SessionError {
    fn from(err: keyring::Error) -> Self {
        SessionError::Keychain(err.to_string())
    }
}

/// Supplies the bearer token for the next request.
///
/// Called once per request; `Ok(None)` means "send no Authorization header".
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<Option<String>, SessionError>;
}

/// What the console persists after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Persistent home of a [`Session`].
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session, SessionError>;
    fn store(&self, session: &Session) -> Result<(), SessionError>;
    /// Idempotent: clearing an empty store succeeds.
    fn clear(&self) -> Result<(), SessionError>;
}

/// A token fixed at construction (`INVENTORY_TOKEN`, tests).
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<Option<String>, SessionError> {
        Ok(Some(self.0.clone()))
    }
}

/// In-memory token shared between a login flow and the client.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl TokenSource for SharedToken {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}

/// Session stored in the OS keychain, one entry per field.
#[derive(Debug, Clone, Default)]
pub struct KeychainSession;

impl KeychainSession {
    pub fn new() -> Self {
        Self
    }

    fn read(account: &str) -> Result<Option<String>, SessionError> {
        let entry = Entry::new(SERVICE_NAME, account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SessionError::from(e)),
        }
    }

    fn write(account: &str, value: Option<&str>) -> Result<(), SessionError> {
        let entry = Entry::new(SERVICE_NAME, account)?;
        match value {
            Some(value) => entry.set_password(value)?,
            None => match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(SessionError::from(e)),
            },
        }
        Ok(())
    }
}

impl SessionStore for KeychainSession {
    fn load(&self) -> Result<Session, SessionError> {
        Ok(Session {
            token: Self::read(TOKEN_KEY)?,
            user_id: Self::read(USER_ID_KEY)?,
            role: Self::read(ROLE_KEY)?,
        })
    }

    fn store(&self, session: &Session) -> Result<(), SessionError> {
        Self::write(TOKEN_KEY, session.token.as_deref())?;
        Self::write(USER_ID_KEY, session.user_id.as_deref())?;
        Self::write(ROLE_KEY, session.role.as_deref())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.store(&Session::default())
    }
}

impl TokenSource for KeychainSession {
    fn token(&self) -> Result<Option<String>, SessionError> {
        Self::read(TOKEN_KEY)
    }
}

/// Session stored as JSON (`{"token", "userId", "role"}`) in a file.
///
/// Writes go to a sibling temp file created owner-only, then renamed over the
/// session file, so readers never see a half-written session.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/inventory-console/session.json`
    pub fn default_location() -> Result<Self, SessionError> {
        let dir = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(Self::new(dir.join(SESSION_DIR).join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

fn create_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SESSION_FILE_MODE);
    }
    options.open(path)
}

impl SessionStore for SessionFile {
    fn load(&self) -> Result<Session, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(session)?;

        let temp = self.temp_path();
        let written = create_private(&temp).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        log::debug!("Session written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenSource for SessionFile {
    fn token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.load()?.token)
    }
}
