//! Session-handle signing.
//!
//! Session handles have the form `<id>-<signature>` where the signature is
//! the hex HMAC-SHA256 of the numeric id under the server's session
//! secret. Clients cannot forge a handle without the secret, and the
//! server needs no lookup to reject garbage before touching the registry.

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and validates session handles.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
}

impl SessionSigner {
    /// Creates a signer over the given secret.
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Produces the handle for a session id.
    pub fn handle(&self, id: u64) -> String {
        format!("{}-{}", id, self.sign(id))
    }

    /// Validates a handle and returns the session id it names.
    pub fn validate(&self, handle: &str) -> ServerResult<u64> {
        let (id, signature) = handle
            .split_once('-')
            .ok_or_else(|| ServerError::UnknownSession(handle.to_string()))?;

        let id: u64 = id
            .parse()
            .map_err(|_| ServerError::UnknownSession(handle.to_string()))?;

        if signature != self.sign(id) {
            return Err(ServerError::UnknownSession(handle.to_string()));
        }

        Ok(id)
    }

    fn sign(&self, id: u64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(&id.to_be_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SessionSigner {
        SessionSigner::new(b"test-secret".to_vec())
    }

    #[test]
    fn handle_roundtrip() {
        let handle = signer().handle(42);
        assert_eq!(signer().validate(&handle).unwrap(), 42);
    }

    #[test]
    fn forged_signature_rejected() {
        let mut handle = signer().handle(42);
        let last = handle.pop().unwrap();
        handle.push(if last == '0' { '1' } else { '0' });
        assert!(matches!(
            signer().validate(&handle),
            Err(ServerError::UnknownSession(_))
        ));
    }

    #[test]
    fn malformed_handles_rejected() {
        assert!(signer().validate("garbage").is_err());
        assert!(signer().validate("notanumber-abcdef").is_err());
        assert!(signer().validate("").is_err());
    }

    #[test]
    fn different_secrets_do_not_cross_validate() {
        let other = SessionSigner::new(b"other-secret".to_vec());
        let handle = signer().handle(7);
        assert!(other.validate(&handle).is_err());
    }
}
