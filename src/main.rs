//! University Card Ledger CLI
//!
//! Runs the HTTP API or imports a student roster.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- serve
//! cargo run -- serve --config ledger.json --bind 0.0.0.0:8080 --roster roster.csv
//! cargo run -- import roster.csv > report.csv
//! cargo run -- --json-logs import --batch-size 200 --max-concurrent 8 roster.csv > report.csv
//! ```
//!
//! Logs go to stderr; the import report is the only thing written to stdout.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable roster or config, address in use, etc.)

use std::process;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use university_card_ledger::cli::{self, Command, ImportArgs, ServeArgs};
use university_card_ledger::config::ImportConfig;
use university_card_ledger::core::batch_import::summarize;
use university_card_ledger::core::{CardEngine, RosterImporter};
use university_card_ledger::io::write_import_report_csv;
use university_card_ledger::types::Actor;
use university_card_ledger::api;

fn main() {
    let args = cli::parse_args();
    init_logging(&args.log_level, args.json_logs);

    let result = match &args.command {
        Command::Serve(serve) => run_serve(serve),
        Command::Import(import) => run_import(import),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Fatal error");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Initialize logging with tracing; RUST_LOG takes precedence over --log-level
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))
}

fn run_serve(args: &ServeArgs) -> Result<(), String> {
    let config = args.to_server_config()?;
    let engine = CardEngine::new(config.ledger.clone());

    build_runtime()?.block_on(async {
        if let Some(roster) = &args.roster {
            let importer = RosterImporter::new(engine.clone(), ImportConfig::default(), Actor::admin(0));
            let outcomes = importer.import_file(roster).await?;
            let summary = summarize(&outcomes);
            tracing::info!(
                created = summary.created,
                failed = summary.failed,
                "Store seeded from roster"
            );
        }

        api::serve(engine, &config).await
    })
}

fn run_import(args: &ImportArgs) -> Result<(), String> {
    let importer = RosterImporter::new(
        CardEngine::default(),
        args.to_import_config(),
        Actor::admin(args.actor_id),
    );

    let outcomes = build_runtime()?.block_on(importer.import_file(&args.roster))?;

    let mut output = std::io::stdout();
    write_import_report_csv(&outcomes, &mut output)
}
