//! Runtime configuration
//!
//! All values have defaults. Zero values coming from the command line or a
//! config file fall back to the default with a logged warning.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Configuration for the ledger core
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Card number generation attempts before provisioning gives up
    #[serde(default = "default_card_number_attempts")]
    pub card_number_attempts: usize,

    /// Page size used when an audit lookup does not specify a limit
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound on audit lookup page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            card_number_attempts: default_card_number_attempts(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl LedgerConfig {
    /// Create a LedgerConfig, replacing zero values with defaults
    pub fn new(card_number_attempts: usize, default_page_size: usize, max_page_size: usize) -> Self {
        let default = Self::default();
        let max_page_size = non_zero("max_page_size", max_page_size, default.max_page_size);
        let default_page_size =
            non_zero("default_page_size", default_page_size, default.default_page_size)
                .min(max_page_size);

        Self {
            card_number_attempts: non_zero(
                "card_number_attempts",
                card_number_attempts,
                default.card_number_attempts,
            ),
            default_page_size,
            max_page_size,
        }
    }

    /// Re-apply the zero-value fallback after deserialization
    pub fn normalized(self) -> Self {
        Self::new(
            self.card_number_attempts,
            self.default_page_size,
            self.max_page_size,
        )
    }
}

/// Configuration for the HTTP server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Whole-request timeout; a timed-out request is failed as one unit
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a ServerConfig from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        let config: ServerConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?;
        Ok(config.normalized())
    }

    pub fn normalized(self) -> Self {
        let default_timeout = default_request_timeout_secs();
        Self {
            bind: self.bind,
            request_timeout_secs: if self.request_timeout_secs == 0 {
                tracing::warn!(
                    "Invalid request_timeout_secs (0), using default ({})",
                    default_timeout
                );
                default_timeout
            } else {
                self.request_timeout_secs
            },
            ledger: self.ledger.normalized(),
        }
    }
}

/// Configuration for batch roster imports
#[derive(Clone, Debug, PartialEq)]
pub struct ImportConfig {
    /// Number of roster rows read per batch
    pub batch_size: usize,
    /// Maximum number of rows provisioned concurrently
    pub max_concurrent: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl ImportConfig {
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();
        Self {
            batch_size: non_zero("batch_size", batch_size, default.batch_size),
            max_concurrent: non_zero("max_concurrent", max_concurrent, default.max_concurrent),
        }
    }
}

fn non_zero(name: &str, value: usize, default: usize) -> usize {
    if value == 0 {
        tracing::warn!("Invalid {} ({}), using default ({})", name, value, default);
        default
    } else {
        value
    }
}

fn default_card_number_attempts() -> usize {
    5
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    #[case::all_custom(3, 10, 100, (3, 10, 100))]
    #[case::zero_attempts(0, 10, 100, (5, 10, 100))]
    #[case::zero_page_sizes(3, 0, 0, (3, 50, 500))]
    #[case::default_clamped_to_max(3, 80, 20, (3, 20, 20))]
    fn test_ledger_config_fallbacks(
        #[case] attempts: usize,
        #[case] page: usize,
        #[case] max_page: usize,
        #[case] expected: (usize, usize, usize),
    ) {
        let config = LedgerConfig::new(attempts, page, max_page);
        assert_eq!(
            (
                config.card_number_attempts,
                config.default_page_size,
                config.max_page_size
            ),
            expected
        );
    }

    #[test]
    fn test_import_config_zero_values_fallback() {
        let config = ImportConfig::new(0, 0);
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn test_server_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind": "0.0.0.0:9000", "request_timeout_secs": 0, "ledger": {{"card_number_attempts": 8}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 9000)));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.ledger.card_number_attempts, 8);
        assert_eq!(config.ledger.default_page_size, 50);
    }

    #[test]
    fn test_server_config_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 9000}}"#).unwrap();
        file.flush().unwrap();

        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(err.contains("Invalid config"));
    }
}
