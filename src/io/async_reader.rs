//! Asynchronous roster reader with batch interface
//!
//! Provides a streaming interface over roster rows from a CSV file.
//! Supports batch reading for efficient async provisioning.
//!
//! # Design
//!
//! The RosterReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio for async runtime and concurrency primitives
//! - Batch reading for efficient processing
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → RosterReader → Batches of RosterRows
//!                  ↓
//!           csv_format module
//!           (RosterRecord, convert_roster_record)
//! ```
//!
//! Unlike a silent skip, a row that cannot be parsed is kept in the batch as
//! a failed row, so the import report accounts for every line of the roster.

use crate::io::csv_format::{convert_roster_record, RosterRecord};
use crate::types::{LedgerError, NewStudent};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// One roster row, numbered from 1 (excluding the header)
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub row: usize,
    pub request: Result<NewStudent, LedgerError>,
}

/// Asynchronous roster reader
///
/// Provides batch reading interface over roster rows.
/// Maintains streaming behavior with constant memory usage.
pub struct RosterReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    rows_read: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> RosterReader<R> {
    /// Create a new RosterReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rows_read: 0,
        }
    }

    /// Read a batch of roster rows
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of rows to read
    ///
    /// # Returns
    ///
    /// Up to `batch_size` rows, including rows that failed to parse.
    /// Returns an empty vector when the end of the file is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<RosterRow> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<RosterRecord>();

        while batch.len() < batch_size {
            let request = match records.next().await {
                Some(Ok(record)) => Ok(convert_roster_record(record)),
                Some(Err(e)) => {
                    tracing::warn!(row = self.rows_read + 1, error = %e, "Malformed roster row");
                    Err(LedgerError::validation(
                        "row",
                        format!("malformed roster row: {e}"),
                    ))
                }
                None => break,
            };
            self.rows_read += 1;
            batch.push(RosterRow {
                row: self.rows_read,
                request,
            });
        }

        batch
    }
}
