//! Handles the application settings via a config file and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Contains the application settings.
///
/// The application settings are read from an optional TOML config file. Settings specified in the
/// config file can be overwritten by environment variables. To do so, set an environment variable
/// with the prefix `ROOMBOOK_` followed by the field names you want to set. Fields are separated
/// by an underscore `_`.
/// ```text
/// ROOMBOOK_<field>_<field-of-field>...
/// ```
/// # Example
///
/// set the `database.server` field:
/// ```text
/// ROOMBOOK_DATABASE_SERVER=localhost
/// ```
/// # Note
/// Fields set via environment variables do not affect the underlying config file.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Only required by the commands talking to a database
    pub database: Option<Database>,
}

impl Settings {
    /// Creates a new Settings instance from the provided TOML file, if it exists.
    /// Specific fields can be set or overwritten with environment variables
    /// (See struct level docs for more details).
    pub fn load(file_name: &str) -> Result<Self, ConfigError> {
        let mut cfg = Config::new();

        cfg.merge(File::with_name(file_name).required(false))?;

        let env = Environment::with_prefix("ROOMBOOK").separator("_");

        cfg.merge(env)?;

        cfg.try_into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub server: String,
    #[serde(default = "default_database_port")]
    pub port: u32,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Database {
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.server, self.port, self.name, self.user, self.password
        )
    }
}

fn default_database_port() -> u32 {
    5432
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("does-not-exist.toml").unwrap();

        assert!(settings.database.is_none());
    }

    #[test]
    #[serial]
    fn reads_database_section() {
        let path = std::env::temp_dir().join("roombook-settings-test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\nserver = \"db\"\nname = \"roombook\"\nuser = \"admin\"\npassword = \"secret\""
        )
        .unwrap();

        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        let database = settings.database.unwrap();

        assert_eq!(database.port, 5432);
        assert_eq!(
            database.connection_string(),
            "host=db port=5432 dbname=roombook user=admin password=secret"
        );

        std::fs::remove_file(path).unwrap();
    }
}
