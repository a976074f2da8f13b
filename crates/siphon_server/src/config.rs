//! Server configuration.

use siphon_protocol::{ProtocolVersion, PROTOCOL_VERSION};

/// Default cap on a single compressed chunk payload.
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Configuration for a transfer peer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Protocol version this peer speaks.
    pub version: ProtocolVersion,
    /// Shared-secret credentials clients must present, when set.
    pub credentials: Option<String>,
    /// Key used to sign session handles.
    pub session_secret: Vec<u8>,
    /// Largest compressed chunk payload accepted on push.
    pub max_payload_bytes: usize,
}

impl ServerConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            credentials: None,
            session_secret: b"siphon-session-handle-key".to_vec(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Requires clients to present these credentials at verify time.
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Sets the session-handle signing key.
    pub fn with_session_secret(mut self, secret: Vec<u8>) -> Self {
        self.session_secret = secret;
        self
    }

    /// Sets the maximum accepted chunk payload size.
    pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.version, PROTOCOL_VERSION);
        assert!(config.credentials.is_none());
        assert_eq!(config.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_credentials("s3cret")
            .with_session_secret(vec![1, 2, 3])
            .with_max_payload_bytes(1024);

        assert_eq!(config.credentials.as_deref(), Some("s3cret"));
        assert_eq!(config.session_secret, vec![1, 2, 3]);
        assert_eq!(config.max_payload_bytes, 1024);
    }
}
