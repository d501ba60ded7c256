//! Runtime configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use randolink_core::{SessionContext, SessionOptions};

/// Configuration required to assemble a randomizer runtime.
#[derive(Clone, Debug, Default)]
pub struct BootstrapConfig {
    pub server: Option<String>,
    pub slot_name: Option<String>,
    pub password: Option<String>,
    pub death_link: bool,
    pub data_dir: Option<PathBuf>,
    pub durable_store: bool,
}

impl BootstrapConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `RANDOLINK_SERVER` - Session server address as host:port (default: offline play)
    /// - `RANDOLINK_SLOT` - Slot name this player occupies on the server
    /// - `RANDOLINK_PASSWORD` - Room password (default: none)
    /// - `RANDOLINK_DEATH_LINK` - Share deaths with the session (default: false)
    /// - `RANDOLINK_DATA_DIR` - Directory for saves and journals (default: platform-specific)
    /// - `RANDOLINK_DURABLE_STORE` - Journal undelivered messages to disk (default: false)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.server = env::var("RANDOLINK_SERVER").ok();
        config.slot_name = env::var("RANDOLINK_SLOT").ok();
        config.password = env::var("RANDOLINK_PASSWORD").ok();

        if let Some(enable) = read_env::<bool>("RANDOLINK_DEATH_LINK") {
            config.death_link = enable;
        } else if env::var("RANDOLINK_DEATH_LINK").is_ok() {
            // Also accept just setting the variable without value as "true"
            config.death_link = true;
        }

        config.data_dir = env::var("RANDOLINK_DATA_DIR").ok().map(PathBuf::from);

        if let Some(enable) = read_env::<bool>("RANDOLINK_DURABLE_STORE") {
            config.durable_store = enable;
        } else if env::var("RANDOLINK_DURABLE_STORE").is_ok() {
            config.durable_store = true;
        }

        config
    }

    /// The session context these settings describe.
    ///
    /// A server address and a slot name together select networked play;
    /// anything less falls back to offline.
    pub fn session_context(&self) -> SessionContext {
        match (&self.server, &self.slot_name) {
            (Some(server), Some(slot_name)) => {
                let mut options = SessionOptions::new(server.clone(), slot_name.clone());
                options.password = self.password.clone();
                options.death_link = self.death_link;
                SessionContext::Networked(options)
            }
            _ => SessionContext::Offline,
        }
    }

    /// Directory for saves and journals, configured or platform-specific.
    ///
    /// Platform conventions:
    /// - macOS: `~/Library/Application Support/randolink`
    /// - Linux: `~/.local/share/randolink` (or `$XDG_DATA_HOME/randolink`)
    /// - Windows: `%APPDATA%\randolink`
    /// - Fallback: `./randolink_data`
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "randolink")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("./randolink_data"))
        })
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

// ============================================================================
// Tests
// ============================================================================
