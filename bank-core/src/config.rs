//! Configuration for the banking core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
///
/// Every field falls back to its default, so a config file only needs to
/// name the fields it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Well-known account number of the internal debt-clearing sink.
    /// Provisioned at ledger open if absent.
    pub clearing_account: String,

    /// HMAC secret for caller-identity tokens
    pub jwt_secret: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/bank"),
            service_name: "bank-core".to_string(),
            clearing_account: "43211234115312".to_string(),
            jwt_secret: "SECRET".to_string(),
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load defaults with environment variable overrides
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("BANK_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(number) = std::env::var("BANK_CLEARING_ACCOUNT") {
            config.clearing_account = number;
        }

        if let Ok(secret) = std::env::var("BANK_JWT_SECRET") {
            config.jwt_secret = secret;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "bank-core");
        assert_eq!(config.clearing_account, "43211234115312");
        assert_eq!(config.rocksdb.max_write_buffer_number, 4);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
data_dir = "/tmp/bank-test"
service_name = "bank-core-test"
clearing_account = "11112222333344"
jwt_secret = "test-secret"

[rocksdb]
write_buffer_size_mb = 16
max_write_buffer_number = 2
max_background_jobs = 2
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.service_name, "bank-core-test");
        assert_eq!(config.clearing_account, "11112222333344");
        assert_eq!(config.rocksdb.write_buffer_size_mb, 16);
    }

    #[test]
    fn test_from_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
data_dir = "/tmp/bank-partial"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bank-partial"));
        // Omitted fields, including the whole [rocksdb] table, fall back
        assert_eq!(config.service_name, "bank-core");
        assert_eq!(config.clearing_account, "43211234115312");
        assert_eq!(config.rocksdb.write_buffer_size_mb, 64);
    }
}
