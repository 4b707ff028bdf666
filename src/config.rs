//! Application-level configuration loading: replica role, storage slot and presentation defaults.

use std::{
    env, fs,
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    Role,
    game::{DEFAULT_FONT, DEFAULT_TITLE, GameState},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "KLASH_CONFIG_PATH";
/// Storage key of the snapshot slot; the version suffix changes with the record layout.
pub const DEFAULT_SESSION_KEY: &str = "kk-game-v2";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Key of the durable snapshot slot.
    pub session_key: String,
    /// Part this process plays.
    pub role: Role,
    /// HTTP port.
    pub port: u16,
    /// Directory holding the snapshot slot file.
    pub storage_dir: PathBuf,
    /// How often the storage watcher polls the slot.
    pub poll_interval: Duration,
    /// Upper bound on a snapshot write; `None` waits indefinitely.
    pub storage_timeout: Option<Duration>,
    /// Whether the in-process broadcast bus is enabled.
    pub broadcast: bool,
    /// Messages buffered per bus receiver before it lags.
    pub bus_capacity: usize,
    /// Loopback address the host relay listens on and displays connect to.
    pub relay_addr: SocketAddr,
    /// JSON file with the round catalog.
    pub catalog_path: PathBuf,
    /// Show title before the host changes it.
    pub title: String,
    /// Title font before the host changes it.
    pub font: String,
    /// Initial name of team A.
    pub team_a: String,
    /// Initial name of team B.
    pub team_b: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        role = ?app_config.role,
                        key = %app_config.session_key,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_port_override(env::var("PORT").ok())
    }

    /// State a replica starts from before hydration.
    pub fn initial_state(&self) -> GameState {
        GameState::new(&self.title, &self.font, &self.team_a, &self.team_b)
    }

    fn with_port_override(mut self, value: Option<String>) -> Self {
        if let Some(port) = value.and_then(|value| value.parse::<u16>().ok()) {
            self.port = port;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    session_key: String,
    role: Role,
    port: u16,
    storage_dir: PathBuf,
    poll_interval_ms: u64,
    storage_timeout_ms: u64,
    broadcast: bool,
    bus_capacity: usize,
    relay_addr: SocketAddr,
    catalog_path: PathBuf,
    title: String,
    font: String,
    team_names: RawTeamNames,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY.into(),
            role: Role::Host,
            port: 8080,
            storage_dir: PathBuf::from("data"),
            poll_interval_ms: 500,
            storage_timeout_ms: 2_000,
            broadcast: true,
            bus_capacity: 64,
            relay_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8090)),
            catalog_path: PathBuf::from("config/rounds.json"),
            title: DEFAULT_TITLE.into(),
            font: DEFAULT_FONT.into(),
            team_names: RawTeamNames::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// Initial team names, keyed like the board (`A`, `B`).
struct RawTeamNames {
    #[serde(rename = "A")]
    a: String,
    #[serde(rename = "B")]
    b: String,
}

impl Default for RawTeamNames {
    fn default() -> Self {
        Self {
            a: "Team A".into(),
            b: "Team B".into(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let session_key = match value.session_key.trim() {
            "" => DEFAULT_SESSION_KEY.to_string(),
            key => key.to_string(),
        };

        Self {
            session_key,
            role: value.role,
            port: value.port,
            storage_dir: value.storage_dir,
            poll_interval: Duration::from_millis(value.poll_interval_ms.max(50)),
            storage_timeout: (value.storage_timeout_ms > 0)
                .then(|| Duration::from_millis(value.storage_timeout_ms)),
            broadcast: value.broadcast,
            bus_capacity: value.bus_capacity.max(1),
            relay_addr: value.relay_addr,
            catalog_path: value.catalog_path,
            title: value.title,
            font: value.font,
            team_a: value.team_names.a,
            team_b: value.team_names.b,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
