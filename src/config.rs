use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MRSA-MDT";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "mdt.db";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

pub const ENV_DATA_DIR: &str = "MRSA_DATA_DIR";
pub const ENV_BIND_ADDR: &str = "MRSA_BIND_ADDR";
pub const ENV_DISEASE_CATALOG: &str = "MRSA_DISEASE_CATALOG";
pub const ENV_TOKEN_USER: &str = "MRSA_TOKEN_USER";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "mrsa_lib=debug,tower_http=debug,info"
    } else {
        "mrsa_lib=info,warn"
    }
}

/// Get the application data directory (~/MRSA-MDT/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidBindAddr { var: &'static str, value: String },
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    /// JSON catalog replacing the built-in disease profiles.
    pub disease_catalog: Option<PathBuf>,
    /// Username that receives a bearer token at startup.
    pub token_user: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);

        let raw_addr = get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr {
                var: ENV_BIND_ADDR,
                value: raw_addr.clone(),
            })?;

        Ok(Self {
            data_dir,
            bind_addr,
            disease_catalog: get(ENV_DISEASE_CATALOG).map(PathBuf::from),
            token_user: get(ENV_TOKEN_USER)
                .map(|u| u.trim().to_string())
                .unwrap_or_else(|| crate::db::BOOTSTRAP_USERNAME.to_string()),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.data_dir, app_data_dir());
        assert_eq!(config.disease_catalog, None);
        assert_eq!(config.token_user, "admin");
    }

    #[test]
    fn overrides_are_read() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/tmp/mdt"),
            (ENV_BIND_ADDR, "0.0.0.0:8080"),
            (ENV_DISEASE_CATALOG, "/etc/mdt/diseases.json"),
            (ENV_TOKEN_USER, "chief"),
        ]))
        .unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/mdt/mdt.db"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(
            config.disease_catalog,
            Some(PathBuf::from("/etc/mdt/diseases.json"))
        );
        assert_eq!(config.token_user, "chief");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config =
            ServerConfig::from_lookup(lookup(&[(ENV_DISEASE_CATALOG, "  "), (ENV_BIND_ADDR, "")]))
                .unwrap();
        assert_eq!(config.disease_catalog, None);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn invalid_bind_addr_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_BIND_ADDR, "not-an-addr")])).unwrap_err();
        assert!(err.to_string().contains("MRSA_BIND_ADDR"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
