use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONTRACT: &str = "0xcaA0b09660B78Ce7F3D5Ccfd7fA3746F50738aBb";
pub const DEFAULT_GAS_LIMIT: u64 = 210_000;
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "NAMEREG_PRIVATE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse toml config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("parse json config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid contract address {0:?}")]
    ContractAddress(String),
}

/// Target network the wallet must be pointed at before connecting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(alias = "chainId")]
    pub chain_id: u64,
    pub rpc: Option<String>,
    pub ws: Option<String>,
    pub ipc: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            rpc: None,
            ws: None,
            ipc: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    #[serde(default = "default_contract")]
    pub address: String,
    #[serde(default = "default_gas_limit", alias = "gasLimit")]
    pub gas_limit: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: default_contract(),
            gas_limit: default_gas_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// `injected` (node-managed accounts) or `local` (private key signer)
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            connector: default_connector(),
            private_key_env: default_private_key_env(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mainnet: NetworkConfig,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl ContractConfig {
    pub fn parsed_address(&self) -> Result<Address, ConfigError> {
        self.address
            .trim()
            .parse()
            .map_err(|_| ConfigError::ContractAddress(self.address.clone()))
    }
}

/// Load the config from the resolved path, falling back to defaults.
///
/// A missing file is not an error. Any other failure is returned next to
/// the defaults so the caller can report it once logging is up.
pub fn load() -> (Config, Option<ConfigError>) {
    load_from(config_path().as_deref())
}

pub fn load_from(path: Option<&Path>) -> (Config, Option<ConfigError>) {
    let Some(path) = path else {
        return (Config::default(), None);
    };
    if !path.exists() {
        return (Config::default(), None);
    }
    match read(path) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    }
}

pub fn read(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, is_json(path))
}

pub fn parse(content: &str, json: bool) -> Result<Config, ConfigError> {
    if json {
        Ok(serde_json::from_str::<Config>(content)?)
    } else {
        Ok(toml::from_str::<Config>(content)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("NAMEREG_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("namereg").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("namereg").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "namereg", "namereg")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("namereg"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("namereg"));
    }
    directories::ProjectDirs::from("io", "namereg", "namereg")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn state_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("state.sqlite3"))
}

pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("namereg.log"))
}

fn default_contract() -> String {
    DEFAULT_CONTRACT.to_string()
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_connector() -> String {
    "injected".to_string()
}

fn default_private_key_env() -> String {
    DEFAULT_PRIVATE_KEY_ENV.to_string()
}

fn default_log_level() -> String {
    "namereg=info".to_string()
}
