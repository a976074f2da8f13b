//! # Siphon Server
//!
//! The reference HTTP peer for siphon transfers.
//!
//! This crate provides:
//! - [`SiphonServer`], the in-process facade over every transfer operation
//! - [`SessionRegistry`], HMAC-signed session handles with per-session
//!   transfer bookkeeping
//! - An axum [`router`] binding the operations to the HTTP surface
//!
//! ## Key Invariants
//!
//! - A pushed chunk's declared checksum is verified before anything is
//!   written; a mismatch answers 412 and advances no state
//! - A pushed chunk's cursor must equal the session's ingest cursor for
//!   that table; divergence answers 409 and aborts the client's run
//! - A pulled chunk for an unmoved cursor is re-served byte-identically

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod handler;
mod router;
mod server;
mod session;

pub use auth::SessionSigner;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use router::{router, serve};
pub use server::SiphonServer;
pub use session::{ServedChunk, SessionRegistry, SessionState};
