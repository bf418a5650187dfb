//! # Atrium Configuration
//!
//! A small string key/value store, layered however the embedding
//! application likes.
//!
//! ```rust
//! use atrium_core::AtriumConfig;
//! let mut config = AtriumConfig::new();
//!
//! config.set("api.base_url", "https://api.example.com");
//! config.set("api.timeout_secs", "10");
//!
//! assert_eq!(config.get("api.timeout_secs"), Some("10"));
//! ```
//!
//! ## Environment overrides
//!
//! [`AtriumConfig::load_env`] maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export ATRIUM__API__BASE_URL=https://api.example.com
//! export ATRIUM__VIEWS__NEW_USERS=today
//! ```
//!
//! Keys read by the other crates:
//!
//! | key | used by | default |
//! |---|---|---|
//! | `api.base_url` | REST client | required |
//! | `api.timeout_secs` | REST client | 30 |
//! | `api.login_route` | session | `/auth/login` |
//! | `session.path` | file token store | none |
//! | `views.new_users` | derived views | `30d` |
//! | `gantt.px_per_day` | gantt layout | 24 |
//! | `gantt.padding_days` | gantt layout | 2 |

use std::collections::HashMap;

pub const DEFAULT_ENV_PREFIX: &str = "ATRIUM__";

#[derive(Debug, Default)]
pub struct AtriumConfig {
    values: HashMap<String, String>,
}

impl AtriumConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Start from the process environment using [`DEFAULT_ENV_PREFIX`].
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(DEFAULT_ENV_PREFIX);
        config
    }

    /// Example: config.set("gantt.px_per_day", "32")
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy every `PREFIX…` environment variable into the store.
    ///
    /// `ATRIUM__GANTT__PX_PER_DAY` becomes `gantt.px_per_day`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> AtriumConfigSnapshot {
        AtriumConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable copy handed to clients and stores at construction time.
#[derive(Debug, Clone, Default)]
pub struct AtriumConfigSnapshot {
    map: HashMap<String, String>,
}

impl AtriumConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

impl From<HashMap<String, String>> for AtriumConfigSnapshot {
    fn from(map: HashMap<String, String>) -> Self {
        Self::new(map)
    }
}
