//! Configuration for a transfer run.

use crate::sizer::SizerConfig;
use siphon_protocol::{ProtocolVersion, PROTOCOL_VERSION};

/// Configuration handed to a [`crate::TransferOrchestrator`] at
/// construction.
///
/// There is no global state: everything a run needs arrives through this
/// struct, and the session resource it implies is acquired at run start
/// and released on every exit path.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Peer URL.
    pub remote_url: String,
    /// Chunk size used before any tuning feedback.
    pub initial_chunk_size: u64,
    /// Optional shared-secret credentials presented at verify time.
    pub credentials: Option<String>,
    /// Extra attempts for the inventory fetch before aborting.
    pub inventory_retries: u32,
    /// Chunk-size controller tuning.
    pub sizer: SizerConfig,
    /// Protocol version to present to the peer.
    pub version: ProtocolVersion,
}

impl TransferConfig {
    /// Creates a configuration for the given peer.
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            initial_chunk_size: 1_000,
            credentials: None,
            inventory_retries: 1,
            sizer: SizerConfig::default(),
            version: PROTOCOL_VERSION,
        }
    }

    /// Sets the starting chunk size (clamped to at least 1).
    pub fn with_initial_chunk_size(mut self, size: u64) -> Self {
        self.initial_chunk_size = size.max(1);
        self
    }

    /// Sets the credentials presented at verify time.
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Sets the number of inventory fetch retries.
    pub fn with_inventory_retries(mut self, retries: u32) -> Self {
        self.inventory_retries = retries;
        self
    }

    /// Sets the chunk-size controller tuning.
    pub fn with_sizer(mut self, sizer: SizerConfig) -> Self {
        self.sizer = sizer;
        self
    }
}
