//! Configuration loading
//!
//! Loads database connection configuration from environment variables,
//! optionally reading from a .env file first.

use crate::prelude::EntigenError;
use std::{env, path::Path};
use tracing::{debug, error, trace, warn};

pub const POSTGRES_DEFAULT_PORT: u16 = 5432;
pub const MYSQL_DEFAULT_PORT: u16 = 3306;

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    /// Explicit port; engines fall back to their default when unset
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - DB_HOST (default: localhost)
    /// - DB_PORT (default: engine specific)
    /// - DB_NAME (required)
    /// - DB_USER (required)
    /// - DB_PASSWORD (required)
    pub fn from_env() -> Result<Self, EntigenError> {
        debug!("Loading database configuration from environment");

        let host = env::var("DB_HOST").unwrap_or_else(|_| {
            trace!("DB_HOST not set, using default");
            "localhost".to_string()
        });

        let port = match env::var("DB_PORT") {
            Ok(port_str) => Some(port_str.parse::<u16>().map_err(|e| {
                error!(port = ?port_str, error = ?e, "Invalid DB_PORT value");
                EntigenError::Config("DB_PORT must be a valid port number".to_string())
            })?),
            Err(_) => {
                trace!("DB_PORT not set, using engine default");
                None
            }
        };

        let database = env::var("DB_NAME").map_err(|_| {
            error!("DB_NAME environment variable is not set");
            EntigenError::Config("DB_NAME environment variable is required".to_string())
        })?;

        let user = env::var("DB_USER").map_err(|_| {
            error!("DB_USER environment variable is not set");
            EntigenError::Config("DB_USER environment variable is required".to_string())
        })?;

        let password = env::var("DB_PASSWORD").map_err(|_| {
            error!("DB_PASSWORD environment variable is not set");
            EntigenError::Config("DB_PASSWORD environment variable is required".to_string())
        })?;

        debug!(host = ?host, port = ?port, database = ?database, user = ?user, "Configuration loaded");

        Ok(Self {
            host,
            port,
            database,
            user,
            password,
        })
    }

    /// Load a .env file and then read configuration from environment
    pub fn load(env_file: &Path) -> Result<Self, EntigenError> {
        if env_file.exists() {
            debug!(path = ?env_file, "Loading environment file");
            dotenvy::from_path(env_file).map_err(|e| {
                error!(path = ?env_file, error = ?e, "Failed to load environment file");
                EntigenError::Config(format!("Failed to load {}: {}", env_file.display(), e))
            })?;
        } else {
            warn!(path = ?env_file, "Environment file not found, using existing environment");
        }

        Self::from_env()
    }

    /// Build a PostgreSQL connection string
    pub fn postgres_connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host,
            self.port_or(POSTGRES_DEFAULT_PORT),
            self.database,
            self.user,
            self.password
        )
    }

    /// Configured port, or the engine's default when none was set
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Build a connection string with password redacted (for error messages)
    pub fn redacted_connection_string(&self) -> String {
        let port = self
            .port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "default".to_string());
        format!(
            "host={} port={} dbname={} user={} password=***",
            self.host, port, self.database, self.user
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env_vars() {
        env::remove_var("DB_HOST");
        env::remove_var("DB_PORT");
        env::remove_var("DB_NAME");
        env::remove_var("DB_USER");
        env::remove_var("DB_PASSWORD");
    }

    fn set_required_env_vars() {
        env::set_var("DB_NAME", "testdb");
        env::set_var("DB_USER", "testuser");
        env::set_var("DB_PASSWORD", "testpass");
    }

    fn config() -> DbConfig {
        DbConfig {
            host: "localhost".to_string(),
            port: None,
            database: "mydb".to_string(),
            user: "myuser".to_string(),
            password: "secret".to_string(),
        }
    }

    // Environment variables are process-wide, so the env scenarios run in
    // one test to keep them from racing each other.
    #[test]
    fn test_from_env() {
        clear_env_vars();
        set_required_env_vars();
        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, None);
        assert_eq!(config.database, "testdb");
        assert_eq!(config.user, "testuser");
        assert_eq!(config.password, "testpass");

        env::set_var("DB_HOST", "db.example.com");
        env::set_var("DB_PORT", "5433");
        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.host, "db.example.com");
        assert_eq!(config.port, Some(5433));

        env::set_var("DB_PORT", "not_a_number");
        let err = DbConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));

        clear_env_vars();
        env::set_var("DB_USER", "testuser");
        env::set_var("DB_PASSWORD", "testpass");
        let err = DbConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DB_NAME"));

        clear_env_vars();
    }

    #[test]
    fn test_postgres_connection_string() {
        assert_eq!(
            config().postgres_connection_string(),
            "host=localhost port=5432 dbname=mydb user=myuser password=secret"
        );
    }

    #[test]
    fn test_port_falls_back_to_engine_default() {
        let mut config = config();
        assert_eq!(config.port_or(MYSQL_DEFAULT_PORT), 3306);
        assert_eq!(config.port_or(POSTGRES_DEFAULT_PORT), 5432);

        config.port = Some(3307);
        assert_eq!(config.port_or(MYSQL_DEFAULT_PORT), 3307);
    }

    #[test]
    fn test_redacted_connection_string() {
        let conn_str = config().redacted_connection_string();

        assert!(!conn_str.contains("secret"));
        assert!(conn_str.contains("***"));
    }
}
