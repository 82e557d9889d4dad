//! Service settings.
//!
//! Layered lowest to highest: built-in defaults, `config/default.toml`,
//! `config/{CLINIC_ENV}.toml`, then `CLINIC__*` environment variables
//! (e.g. `CLINIC__SERVER__PORT=9000`). Both files are optional.

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    /// Populate an empty directory with demo users on startup.
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    /// Base URL that generated document links point at.
    pub public_base_url: String,
}

impl Settings {
    /// Loads settings for the environment named by `CLINIC_ENV`
    /// (default `development`).
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("CLINIC_ENV").unwrap_or_else(|_| "development".into());
        Self::load_from("config", &env)
    }

    /// Loads settings from the given directory and environment name.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.path", "clinic.db")?
            .set_default("database.seed_demo_data", false)?
            .set_default("public_base_url", "http://localhost:8080/api/v1")?
            .add_source(File::with_name(&format!("{dir}/default")).required(false))
            .add_source(File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                Environment::with_prefix("CLINIC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_files() {
        let settings = Settings::load_from("does-not-exist", "test").unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.path, PathBuf::from("clinic.db"));
        assert!(!settings.database.seed_demo_data);
        assert_eq!(
            settings.bind_address().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }

    #[test]
    fn files_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "public_base_url = \"https://clinic.example\"\n[server]\nport = 9100\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[database]\nseed_demo_data = true\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path().to_str().unwrap(), "staging").unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert!(settings.database.seed_demo_data);
        assert_eq!(settings.public_base_url, "https://clinic.example");
    }
}
