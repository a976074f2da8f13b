//! `siphon push` - push a local database file to a remote peer.

use crate::http_client::ReqwestClient;
use crate::jsondb;
use siphon_engine::{
    format_count, safe_url, HttpTransport, TransferConfig, TransferOrchestrator,
};
use siphon_store::Database;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Runs the push command.
pub fn run(
    db_path: &Path,
    remote: &str,
    chunk_size: u64,
    credentials: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let db: Arc<dyn Database> = Arc::new(jsondb::load(db_path)?);

    let mut config = TransferConfig::new(remote).with_initial_chunk_size(chunk_size);
    if let Some(credentials) = credentials {
        config = config.with_credentials(credentials);
    }

    let transport = HttpTransport::new(remote, ReqwestClient::new());
    let orchestrator = TransferOrchestrator::new(config, transport, db);

    println!("Pushing {} to {}", db_path.display(), safe_url(remote));
    let summary = orchestrator.send()?;
    println!(
        "{} tables, {} records pushed in {:.1?}",
        summary.tables,
        format_count(summary.rows),
        summary.duration
    );
    Ok(())
}
