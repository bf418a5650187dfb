//! Persisted authentication session.
//!
//! The token and the signed-in user's profile survive restarts through a
//! [`TokenStore`]. Everything else the client knows is rebuilt from the
//! backend. When the backend answers 401 the session is expired: the stored
//! token is wiped and the navigator is sent to the login route.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<SessionData>>;
    fn save(&self, data: &SessionData) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<SessionData>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Some(SessionData {
                token: Some(token.into()),
                profile: None,
            })),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> anyhow::Result<Option<SessionData>> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, data: &SessionData) -> anyhow::Result<()> {
        *self.inner.lock() = Some(data.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.inner.lock() = None;
        Ok(())
    }
}

/// Session persisted as a small JSON document on disk.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> anyhow::Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        let data = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing session file {}", self.path.display()))?;
        Ok(Some(data))
    }

    fn save(&self, data: &SessionData) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let raw = serde_json::to_vec_pretty(data)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing session file {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Called with the login route when the session expires.
pub type Navigator = Arc<dyn Fn(&str) + Send + Sync>;

pub const DEFAULT_LOGIN_ROUTE: &str = "/auth/login";

pub struct Session {
    store: Arc<dyn TokenStore>,
    login_route: String,
    navigator: RwLock<Option<Navigator>>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            navigator: RwLock::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn with_navigator(self, navigator: Navigator) -> Self {
        *self.navigator.write() = Some(navigator);
        self
    }

    pub fn set_navigator(&self, navigator: Navigator) {
        *self.navigator.write() = Some(navigator);
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    fn load(&self) -> Option<SessionData> {
        match self.store.load() {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(error = %err, "session store unreadable, treating as signed out");
                None
            }
        }
    }

    /// Read on every request so a token written elsewhere is picked up.
    pub fn token(&self) -> Option<String> {
        self.load().and_then(|d| d.token).filter(|t| !t.is_empty())
    }

    pub fn profile(&self) -> Option<Value> {
        self.load().and_then(|d| d.profile)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn sign_in(&self, token: impl Into<String>, profile: Option<Value>) -> anyhow::Result<()> {
        self.store.save(&SessionData {
            token: Some(token.into()),
            profile,
        })
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        self.store.clear()
    }

    /// Drop the persisted token and hand control to the login route.
    pub fn expire(&self) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear session store");
        }
        tracing::info!(route = %self.login_route, "session expired, redirecting to login");

        let navigator = self.navigator.read().clone();
        if let Some(navigate) = navigator {
            navigate(&self.login_route);
        }
    }
}
