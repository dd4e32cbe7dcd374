use crate::config::{ImportConfig, ServerConfig};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// University card ledger: balances, provisioning and reclamations
#[derive(Parser, Debug)]
#[command(name = "card-ledger")]
#[command(about = "University card ledger service and roster import", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Log level used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        help = "Log filter used when RUST_LOG is not set (e.g. info, debug, university_card_ledger=trace)"
    )]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long = "json-logs", global = true, help = "Emit logs as JSON lines on stderr")]
    pub json_logs: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Provision every student of a roster CSV and print the import report
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// JSON configuration file
    #[arg(long = "config", value_name = "FILE", help = "Path to a JSON server configuration")]
    pub config: Option<PathBuf>,

    /// Address to bind, overrides the configuration file
    #[arg(long = "bind", value_name = "ADDR", help = "Address to bind (default: 127.0.0.1:8080)")]
    pub bind: Option<SocketAddr>,

    /// Roster imported before the server starts accepting requests
    #[arg(long = "roster", value_name = "CSV", help = "Roster CSV used to seed the store")]
    pub roster: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Roster CSV file path
    #[arg(value_name = "ROSTER", help = "Path to the roster CSV file")]
    pub roster: PathBuf,

    /// Number of roster rows per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of roster rows read per batch (default: 500)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of rows provisioned concurrently
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of rows provisioned concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// User id recorded as creator of the imported rows
    #[arg(
        long = "actor-id",
        value_name = "ID",
        default_value_t = 0,
        help = "Administrator id recorded on every created row"
    )]
    pub actor_id: u64,
}

impl ImportArgs {
    /// Create an ImportConfig from CLI arguments
    ///
    /// Values that are not given fall back to the defaults; zero values are
    /// replaced with the defaults and a warning is logged.
    pub fn to_import_config(&self) -> ImportConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = ImportConfig::default();
            ImportConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            ImportConfig::default()
        }
    }
}

impl ServeArgs {
    /// Load the server configuration and apply command-line overrides
    ///
    /// # Returns
    ///
    /// * `Ok(ServerConfig)` - Configuration file values (or defaults) with overrides applied
    /// * `Err(String)` - If the configuration file cannot be read or parsed
    pub fn to_server_config(&self) -> Result<ServerConfig, String> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        Ok(config)
    }
}
