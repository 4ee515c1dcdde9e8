use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::LotError;

/// Default config file, overridable through `LOTKEEPER_CONFIG`.
pub const CONFIG_FILE: &str = "lotkeeper.toml";

/// Process-wide configuration, loaded on first access.
///
/// Falls back to defaults (with a message on stderr, since tracing is not yet
/// initialised) when the config file or environment cannot be parsed.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("failed to load configuration, using defaults: {e}");
        Config::default()
    })
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub storage: StorageConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    /// Secret the session cookie key is derived from. Random per process when unset.
    pub cookie_secret: Option<String>,
    /// Drop the `Secure` attribute on session cookies (plain-http deployments).
    pub insecure_cookie: bool,
    /// Admin sessions expire this long after login.
    pub session_ttl_secs: u64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            cookie_secret: None,
            insecure_cookie: false,
            session_ttl_secs: 12 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
    pub images_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:objects.db".to_string(),
            images_dir: PathBuf::from("images"),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Seeded into an empty settings table; never applied once a credential exists.
    pub default_password: String,
    pub min_password_len: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            default_password: "admin123".to_string(),
            min_password_len: 4,
        }
    }
}

impl Config {
    /// Layer defaults, the TOML file and `LOTKEEPER_*` environment variables.
    ///
    /// Nested keys use `__`, e.g. `LOTKEEPER_STORAGE__IMAGES_DIR`.
    pub fn load() -> Result<Self, LotError> {
        let path = std::env::var("LOTKEEPER_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
        Ok(Self::figment(&path).extract()?)
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOTKEEPER_").ignore(&["CONFIG"]).split("__"))
    }
}
