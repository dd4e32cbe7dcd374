//! Concurrent roster import
//!
//! This module provides the `RosterImporter` struct, which provisions the
//! students of a roster file through the shared `CardEngine`.
//!
//! # Design
//!
//! The roster is read in batches. Each batch is split into at most
//! `max_concurrent` partitions that are provisioned on separate tokio tasks.
//! Provisioning itself serializes conflicting rows (same student id or cn), so
//! partitions need no coordination: when two rows collide, exactly one is
//! created and the other is reported as a duplicate.
//!
//! # Architecture
//!
//! ```text
//! RosterImporter
//!     ├── CardEngine     (shared, cloneable ledger core)
//!     ├── ImportConfig   (batch_size, max_concurrent)
//!     └── Actor          (identity recorded on every created row)
//! ```

use std::path::Path;

use tokio::task::JoinError;

use super::provisioning::ProvisionedStudent;
use super::CardEngine;
use crate::config::ImportConfig;
use crate::io::async_reader::{RosterReader, RosterRow};
use crate::types::{Actor, LedgerError};

/// Result of provisioning a single roster row
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Position of the row in the roster, starting at 1
    pub row: usize,

    /// Student id as written in the roster (may be malformed)
    pub student_id: String,

    pub result: Result<ProvisionedStudent, LedgerError>,
}

/// Totals of a finished import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub failed: usize,
}

/// Roster importer with partitioned concurrent provisioning
#[derive(Debug, Clone)]
pub struct RosterImporter {
    engine: CardEngine,
    config: ImportConfig,
    actor: Actor,
}

impl RosterImporter {
    /// Create a new RosterImporter
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine the students are provisioned into
    /// * `config` - Batch size and concurrency bound
    /// * `actor` - Identity recorded as creator of every row
    pub fn new(engine: CardEngine, config: ImportConfig, actor: Actor) -> Self {
        Self {
            engine,
            config,
            actor,
        }
    }

    /// Split a batch into at most `max_concurrent` partitions
    ///
    /// Rows are dealt round-robin, so partitions differ in size by at most one
    /// and every row lands in exactly one partition.
    pub fn partition(&self, batch: Vec<RosterRow>) -> Vec<Vec<RosterRow>> {
        let partitions = self.config.max_concurrent.min(batch.len()).max(1);
        let mut parts: Vec<Vec<RosterRow>> = (0..partitions).map(|_| Vec::new()).collect();
        for (i, row) in batch.into_iter().enumerate() {
            parts[i % partitions].push(row);
        }
        parts
    }

    /// Provision every row of a partition in order
    pub fn import_rows(&self, rows: Vec<RosterRow>) -> Vec<ImportOutcome> {
        rows.into_iter()
            .map(|row| match row.request {
                Ok(request) => {
                    let student_id = request.student_id.clone();
                    let result = self.engine.provision(request, Some(&self.actor));
                    if let Err(e) = &result {
                        tracing::warn!(row = row.row, student_id = %student_id, error = %e, "Roster row rejected");
                    }
                    ImportOutcome {
                        row: row.row,
                        student_id,
                        result,
                    }
                }
                Err(e) => ImportOutcome {
                    row: row.row,
                    student_id: String::new(),
                    result: Err(e),
                },
            })
            .collect()
    }

    /// Provision a batch with partitions running on separate tasks
    ///
    /// A partition whose task panics still reports each of its rows, as an
    /// internal error.
    ///
    /// # Returns
    ///
    /// One outcome per input row, ordered by row number.
    pub async fn import_batch(&self, batch: Vec<RosterRow>) -> Vec<ImportOutcome> {
        let mut tasks = Vec::new();
        for rows in self.partition(batch) {
            let keys = row_keys(&rows);
            let importer = self.clone();
            tasks.push((keys, tokio::spawn(async move { importer.import_rows(rows) })));
        }

        let mut outcomes = Vec::new();
        for (keys, task) in tasks {
            match task.await {
                Ok(partition) => outcomes.extend(partition),
                Err(e) => outcomes.extend(failed_partition(keys, &e)),
            }
        }

        outcomes.sort_by_key(|outcome| outcome.row);
        outcomes
    }

    /// Import a roster CSV file
    ///
    /// Batches are imported one after another; rows within a batch run
    /// concurrently.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ImportOutcome>)` - One outcome per roster row, in roster order
    /// * `Err(String)` - If the file cannot be opened
    pub async fn import_file(&self, path: &Path) -> Result<Vec<ImportOutcome>, String> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| format!("Failed to open roster '{}': {}", path.display(), e))?;

        let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
        let mut reader = RosterReader::new(compat_file);

        let mut outcomes = Vec::new();
        loop {
            let batch = reader.read_batch(self.config.batch_size).await;
            if batch.is_empty() {
                break;
            }
            outcomes.extend(self.import_batch(batch).await);
        }

        let summary = summarize(&outcomes);
        tracing::info!(
            path = %path.display(),
            created = summary.created,
            failed = summary.failed,
            "Roster imported"
        );
        Ok(outcomes)
    }
}

/// Row number and roster student id of each row
fn row_keys(rows: &[RosterRow]) -> Vec<(usize, String)> {
    rows.iter()
        .map(|row| {
            let student_id = row
                .request
                .as_ref()
                .map(|request| request.student_id.clone())
                .unwrap_or_default();
            (row.row, student_id)
        })
        .collect()
}

/// Outcomes for the rows of a partition whose task did not complete
fn failed_partition(keys: Vec<(usize, String)>, error: &JoinError) -> Vec<ImportOutcome> {
    tracing::error!(error = %error, rows = keys.len(), "Import task panicked");
    keys.into_iter()
        .map(|(row, student_id)| ImportOutcome {
            row,
            student_id,
            result: Err(LedgerError::internal(format!("import task failed: {error}"))),
        })
        .collect()
}

/// Count created and failed rows
pub fn summarize(outcomes: &[ImportOutcome]) -> ImportSummary {
    let created = outcomes.iter().filter(|o| o.result.is_ok()).count();
    ImportSummary {
        created,
        failed: outcomes.len() - created,
    }
}
