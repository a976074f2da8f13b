//! Protocol version and compatibility rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The protocol version spoken by this build.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 1, minor: 0 };

/// A transfer protocol version.
///
/// Two peers are compatible exactly when their `major.minor` pairs are
/// equal. Patch levels never travel on the wire: a chunk format change of
/// any kind bumps the minor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
}

impl ProtocolVersion {
    /// Creates a version from its components.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Returns true if a peer speaking `other` can exchange chunks with us.
    pub fn compatible_with(&self, other: &ProtocolVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
