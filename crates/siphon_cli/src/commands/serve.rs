//! `siphon serve` - run a transfer peer over HTTP.

use crate::jsondb;
use siphon_server::{ServerConfig, SiphonServer};
use siphon_store::{Database, MemoryDatabase};
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

/// Runs the serve command until interrupted.
pub fn run(
    addr: SocketAddr,
    db_path: Option<&Path>,
    credentials: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let db: Arc<dyn Database> = match db_path {
        Some(path) => Arc::new(jsondb::load(path)?),
        None => Arc::new(MemoryDatabase::new()),
    };

    let mut config = ServerConfig::default();
    if let Some(credentials) = credentials {
        config = config.with_credentials(credentials);
    }

    let server = Arc::new(SiphonServer::new(config, db));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(siphon_server::serve(addr, server))?;
    Ok(())
}
