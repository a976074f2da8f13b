//! `siphon pull` - pull a remote peer's database into a local file.

use crate::http_client::ReqwestClient;
use crate::jsondb;
use siphon_engine::{
    format_count, safe_url, HttpTransport, TransferConfig, TransferOrchestrator,
};
use siphon_store::{Database, MemoryDatabase};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Runs the pull command.
pub fn run(
    db_path: &Path,
    remote: &str,
    chunk_size: u64,
    credentials: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let db = Arc::new(MemoryDatabase::new());

    let mut config = TransferConfig::new(remote).with_initial_chunk_size(chunk_size);
    if let Some(credentials) = credentials {
        config = config.with_credentials(credentials);
    }

    let transport = HttpTransport::new(remote, ReqwestClient::new());
    let handle: Arc<dyn Database> = Arc::clone(&db) as Arc<dyn Database>;
    let orchestrator = TransferOrchestrator::new(config, transport, handle);

    println!("Pulling {} into {}", safe_url(remote), db_path.display());
    let summary = orchestrator.receive()?;
    jsondb::dump(&db, db_path)?;
    println!(
        "{} tables, {} records pulled in {:.1?}",
        summary.tables,
        format_count(summary.rows),
        summary.duration
    );
    Ok(())
}
