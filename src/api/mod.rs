//! HTTP surface
//!
//! Exposes the card engine over JSON/HTTP with axum.
//!
//! # Components
//!
//! - `routes` - Router construction and middleware (tracing, request timeout)
//! - `handlers` - One thin handler per engine operation
//! - `identity` - Caller identity from the `x-user-id` / `x-user-role` headers
//! - `dto` - Request and response bodies that exist only at the HTTP boundary
//! - `error` - Ledger errors rendered as RFC-9457 problem documents

pub mod dto;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;

pub use error::{map_domain_error, Problem};
pub use identity::Caller;
pub use routes::create_router;

use crate::config::ServerConfig;
use crate::core::CardEngine;
use tokio::net::TcpListener;

/// Run the API server until ctrl-c is received
///
/// # Arguments
///
/// * `engine` - Engine shared by every request
/// * `config` - Bind address, request timeout and ledger settings
///
/// # Returns
///
/// * `Ok(())` - After a graceful shutdown
/// * `Err(String)` - If the address cannot be bound or the server fails
pub async fn serve(engine: CardEngine, config: &ServerConfig) -> Result<(), String> {
    let router = create_router(engine, config);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", config.bind, e))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to read bound address: {}", e))?;
    tracing::info!(%addr, "Card ledger API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    tracing::info!("Card ledger API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
