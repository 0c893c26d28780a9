// ── Persisted session ──
//
// `session.json` holds one entry per profile: the signed-in user and,
// when the system keyring is unavailable, the bearer token. With a
// working keyring the token lives under `stationflow/<profile>/token`
// and the file only records that fact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stationflow_core::{Session, User};

use crate::{ConfigError, KEYRING_SERVICE, session_path};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    sessions: BTreeMap<String, SessionEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionEntry {
    user: User,
    /// Present only when the keyring could not take the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Reads and writes the session for one profile.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    profile: String,
    use_keyring: bool,
}

impl SessionStore {
    /// The canonical session file, keyring enabled.
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            path: session_path(),
            profile: profile.into(),
            use_keyring: true,
        }
    }

    /// A session file at `path` that never touches the keyring.
    pub fn at(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
            use_keyring: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        if !self.use_keyring {
            return None;
        }
        keyring::Entry::new(KEYRING_SERVICE, &format!("{}/token", self.profile)).ok()
    }

    fn read(&self) -> Result<SessionFile, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::Session(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &SessionFile) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(file).map_err(|e| ConfigError::Session(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Persist `session`, replacing any previous one for this profile.
    pub fn save(&self, session: &Session) -> Result<(), ConfigError> {
        let in_keyring = self
            .keyring_entry()
            .is_some_and(|entry| match entry.set_password(session.token.expose_secret()) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "keyring unavailable, storing token in session file");
                    false
                }
            });

        let mut file = self.read()?;
        file.sessions.insert(
            self.profile.clone(),
            SessionEntry {
                user: session.user.clone(),
                token: (!in_keyring).then(|| session.token.expose_secret().to_owned()),
            },
        );
        self.write(&file)?;
        debug!(profile = %self.profile, in_keyring, "session saved");
        Ok(())
    }

    /// The stored session, or `None` if there is none or its token is
    /// gone.
    pub fn load(&self) -> Result<Option<Session>, ConfigError> {
        let mut file = self.read()?;
        let Some(entry) = file.sessions.remove(&self.profile) else {
            return Ok(None);
        };
        let token = entry
            .token
            .or_else(|| self.keyring_entry().and_then(|e| e.get_password().ok()));
        Ok(token.map(|token| Session {
            user: entry.user,
            token: SecretString::from(token),
        }))
    }

    /// Forget this profile's session.
    pub fn clear(&self) -> Result<(), ConfigError> {
        if let Some(entry) = self.keyring_entry()
            && let Err(e) = entry.delete_credential()
        {
            debug!(error = %e, "no keyring token to delete");
        }
        let mut file = self.read()?;
        if file.sessions.remove(&self.profile).is_some() {
            self.write(&file)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
