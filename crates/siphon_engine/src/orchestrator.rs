//! Whole-transfer sequencing and the per-table chunk loops.

use crate::config::TransferConfig;
use crate::error::{safe_url, TransferError, TransferResult};
use crate::progress::{format_count, LogProgress, ProgressSink};
use crate::sizer::ChunkSizer;
use crate::stream::{DestinationTableStream, SourceTableStream};
use crate::transport::SessionTransport;
use siphon_protocol::{
    ChunkAck, PullChunkRequest, PushChunkRequest, TableInventory, VerifyRequest,
};
use siphon_store::Database;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Statistics for one completed transfer run.
#[derive(Debug, Clone, Default)]
pub struct TransferSummary {
    /// Tables transferred.
    pub tables: u64,
    /// Rows durably transferred.
    pub rows: u64,
    /// Compressed payload bytes shipped or received.
    pub payload_bytes: u64,
    /// Chunk attempts retried after corruption or rejection.
    pub corruption_retries: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Drives a whole transfer, table by table, chunk by chunk.
///
/// One orchestrator owns one session against one peer. Tables are
/// transferred sequentially; chunk attempts within a table are strictly
/// serialized, so chunk N+1 is never produced before chunk N is resolved.
///
/// Sequencing, send direction: verify compatibility → open session → push
/// schema → push every table's data → push indexes → request peer
/// sequence reset. Receive direction mirrors it, except sequences are
/// reset locally against the destination store, because they must reflect
/// the just-inserted rows. The session is released on every exit path.
pub struct TransferOrchestrator<T: SessionTransport> {
    config: TransferConfig,
    transport: T,
    db: Arc<dyn Database>,
    progress: Arc<dyn ProgressSink>,
    sizer: ChunkSizer,
    cancelled: AtomicBool,
}

impl<T: SessionTransport> TransferOrchestrator<T> {
    /// Creates an orchestrator over an explicit configuration, transport,
    /// and local database handle.
    pub fn new(config: TransferConfig, transport: T, db: Arc<dyn Database>) -> Self {
        let sizer = ChunkSizer::new(config.sizer.clone());
        Self {
            config,
            transport,
            db,
            progress: Arc::new(LogProgress),
            sizer,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Replaces the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Requests cancellation; honored after the current chunk resolves.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> TransferResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Pushes the local database to the peer.
    pub fn send(&self) -> TransferResult<TransferSummary> {
        let result = self.send_inner();
        if let Err(e) = self.transport.close_session() {
            warn!(error = %e, "failed to release session");
        }
        result
    }

    /// Pulls the peer's database into the local one.
    pub fn receive(&self) -> TransferResult<TransferSummary> {
        let result = self.receive_inner();
        if let Err(e) = self.transport.close_session() {
            warn!(error = %e, "failed to release session");
        }
        result
    }

    fn send_inner(&self) -> TransferResult<TransferSummary> {
        let started = Instant::now();
        let mut summary = TransferSummary::default();

        self.verify()?;
        self.transport.open_session()?;

        info!("sending schema");
        self.transport.push_schema(&self.db.dump_schema()?)?;

        let inventory = TableInventory::from_pairs(self.db.inventory()?);
        info!(
            tables = inventory.len(),
            records = %format_count(inventory.total_rows()),
            "sending data"
        );
        for (table, count) in &inventory.tables {
            self.send_table(table, *count, &mut summary)?;
            summary.tables += 1;
        }

        info!("sending indexes");
        self.transport.push_indexes(&self.db.dump_indexes()?)?;

        info!("resetting sequences");
        self.transport.reset_sequences()?;

        summary.duration = started.elapsed();
        Ok(summary)
    }

    fn receive_inner(&self) -> TransferResult<TransferSummary> {
        let started = Instant::now();
        let mut summary = TransferSummary::default();

        self.verify()?;
        self.transport.open_session()?;

        info!("receiving schema");
        let schema = self.transport.pull_schema()?;
        self.db.apply_schema(&schema)?;

        let inventory = self.fetch_inventory()?;
        info!(
            tables = inventory.len(),
            records = %format_count(inventory.total_rows()),
            "receiving data"
        );
        for (table, count) in &inventory.tables {
            self.receive_table(table, *count, &mut summary)?;
            summary.tables += 1;
        }

        info!("receiving indexes");
        let indexes = self.transport.pull_indexes()?;
        self.db.apply_indexes(&indexes)?;

        // Local, not a peer request: sequences must reflect the rows that
        // were just inserted here.
        info!("resetting sequences");
        self.db.reset_sequences()?;

        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Checks protocol compatibility before anything else happens.
    fn verify(&self) -> TransferResult<()> {
        let mut request = VerifyRequest::new(self.config.version);
        if let Some(credentials) = &self.config.credentials {
            request = request.with_credentials(credentials.clone());
        }

        let response = self.transport.verify_compatibility(&request)?;
        if !self.config.version.compatible_with(&response.server_version) {
            return Err(TransferError::IncompatibleVersion {
                url: safe_url(&self.config.remote_url),
                local: self.config.version,
                remote: response.server_version.to_string(),
            });
        }
        Ok(())
    }

    /// Fetches the peer's inventory, retrying on transport failure before
    /// aborting the run.
    fn fetch_inventory(&self) -> TransferResult<TableInventory> {
        let mut attempts = 0;
        loop {
            match self.transport.pull_inventory() {
                Ok(response) => return Ok(response.inventory),
                Err(e) => {
                    attempts += 1;
                    if attempts > self.config.inventory_retries {
                        warn!(error = %e, "inventory fetch failed");
                        return Err(TransferError::InventoryUnavailable {
                            url: safe_url(&self.config.remote_url),
                        });
                    }
                }
            }
        }
    }

    /// Streams one table to the peer.
    fn send_table(
        &self,
        table: &str,
        total: u64,
        summary: &mut TransferSummary,
    ) -> TransferResult<()> {
        self.progress.begin_table(table, total);
        let mut stream =
            SourceTableStream::new(Arc::clone(&self.db), table, self.config.initial_chunk_size);

        loop {
            self.check_cancelled()?;

            let chunk = stream.produce()?;
            if stream.is_complete() {
                break;
            }

            let request = PushChunkRequest {
                state: stream.state().clone(),
                checksum: chunk.checksum,
                payload: chunk.payload,
            };

            match self.transport.push_chunk(&request)? {
                ChunkAck::Accepted => {
                    stream.advance(chunk.row_count);
                    summary.rows += chunk.row_count;
                    summary.payload_bytes += request.payload.len() as u64;
                    self.progress.rows_transferred(table, chunk.row_count);

                    let next = self.sizer.next_size(stream.chunk_size(), chunk.elapsed);
                    stream.set_chunk_size(next);
                }
                ChunkAck::ChecksumMismatch => {
                    // The payload got corrupted in flight. Resend the
                    // identical chunk: cursor and size stay untouched.
                    summary.corruption_retries += 1;
                    warn!(
                        table,
                        cursor = stream.state().cursor,
                        "peer rejected chunk, resending"
                    );
                    stream.mark_error();
                }
            }
        }

        self.progress.finish_table(table);
        Ok(())
    }

    /// Streams one table from the peer.
    fn receive_table(
        &self,
        table: &str,
        total: u64,
        summary: &mut TransferSummary,
    ) -> TransferResult<()> {
        self.progress.begin_table(table, total);
        let mut stream = DestinationTableStream::new(
            Arc::clone(&self.db),
            table,
            self.config.initial_chunk_size,
        );

        loop {
            self.check_cancelled()?;

            let request = PullChunkRequest {
                state: stream.state().clone(),
            };
            let started = Instant::now();
            let response = self.transport.pull_chunk(&request)?;
            let elapsed = started.elapsed();

            match stream.apply(&response.payload, response.checksum) {
                Ok(0) => break,
                Ok(rows) => {
                    summary.rows += rows;
                    summary.payload_bytes += response.payload.len() as u64;
                    self.progress.rows_transferred(table, rows);

                    let next = self.sizer.next_size(stream.chunk_size(), elapsed);
                    stream.set_chunk_size(next);
                }
                Err(e) if e.is_recoverable() => {
                    // Re-request the same state; the peer serves identical
                    // bytes for an unmoved cursor.
                    summary.corruption_retries += 1;
                    warn!(
                        table,
                        cursor = stream.state().cursor,
                        "received corrupted chunk, re-requesting"
                    );
                    stream.mark_error();
                }
                Err(e) => return Err(e),
            }
        }

        self.progress.finish_table(table);
        Ok(())
    }
}
