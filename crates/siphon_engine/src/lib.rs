//! # Siphon Engine
//!
//! The adaptive chunked transfer engine.
//!
//! This crate provides:
//! - [`ChunkSizer`], the feedback controller that keeps per-chunk latency
//!   inside a target band
//! - [`SourceTableStream`] / [`DestinationTableStream`], the per-table
//!   transfer state machines
//! - [`TransferOrchestrator`], the send/receive control loops
//! - [`SessionTransport`], the peer abstraction, with an HTTP
//!   implementation and a scriptable mock
//!
//! ## Key Invariants
//!
//! - A table's cursor advances only after the consuming side confirms
//!   durable application of the corresponding chunk
//! - While a chunk attempt is marked failed, the identical chunk (same
//!   bytes, same checksum) is retried; cursor and chunk size never change
//!   under retry
//! - Checksum verification precedes every mutation on the receiving side
//! - Chunk attempts within one table are strictly serialized
//!
//! Only corruption and peer rejection are handled inside the chunk loop;
//! every other failure unwinds the whole transfer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod orchestrator;
mod progress;
mod sizer;
mod stream;
mod transport;

pub use config::TransferConfig;
pub use error::{safe_url, TransferError, TransferResult};
pub use http::{HttpClient, HttpResponse, HttpTransport};
pub use orchestrator::{TransferOrchestrator, TransferSummary};
pub use progress::{format_count, LogProgress, NullProgress, ProgressSink};
pub use sizer::{ChunkSizer, SizerConfig};
pub use stream::{Chunk, DestinationTableStream, SourceTableStream};
pub use transport::{MockTransport, SessionTransport};
