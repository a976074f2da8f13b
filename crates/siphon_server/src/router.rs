//! HTTP surface for the transfer peer.
//!
//! Thin axum bindings over [`SiphonServer`]: each endpoint decodes the
//! CBOR body, calls the matching handler, and maps [`ServerError`] to its
//! HTTP status. A checksum rejection answers 412 so the client resends the
//! identical chunk; a 417 body carries just the server's protocol version.

use crate::error::ServerError;
use crate::server::SiphonServer;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use siphon_protocol::{from_cbor, to_cbor, ChunkAck, VerifyRequest};
use std::net::SocketAddr;
use std::sync::Arc;

/// Builds the router exposing every transfer operation.
pub fn router(server: Arc<SiphonServer>) -> Router {
    Router::new()
        .route("/verify", post(verify))
        .route("/sessions", post(open_session))
        .route("/sessions/{sid}", delete(close_session))
        .route("/sessions/{sid}/push/schema", post(push_schema))
        .route("/sessions/{sid}/pull/schema", get(pull_schema))
        .route("/sessions/{sid}/push/indexes", post(push_indexes))
        .route("/sessions/{sid}/pull/indexes", get(pull_indexes))
        .route("/sessions/{sid}/pull/tables", get(pull_tables))
        .route("/sessions/{sid}/push/table", post(push_table))
        .route("/sessions/{sid}/pull/table", post(pull_table))
        .route("/sessions/{sid}/push/reset_sequences", post(reset_sequences))
        .with_state(server)
}

/// Binds `addr` and serves the router until the task is stopped.
pub async fn serve(addr: SocketAddr, server: Arc<SiphonServer>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "siphon peer listening");
    axum::serve(listener, router(server)).await
}

fn cbor_response<T: serde::Serialize>(status: StatusCode, message: &T) -> Response {
    match to_cbor(message) {
        Ok(body) => (status, body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn error_response(error: ServerError) -> Response {
    let status =
        StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match &error {
        // The client surfaces this body as the remote version.
        ServerError::IncompatibleVersion { server, .. } => server.to_string(),
        other => other.to_string(),
    };
    (status, body).into_response()
}

async fn verify(State(server): State<Arc<SiphonServer>>, body: Bytes) -> Response {
    let request: VerifyRequest = match from_cbor(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match server.handle_verify(request) {
        Ok(response) => cbor_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn open_session(State(server): State<Arc<SiphonServer>>) -> Response {
    let handle = server.handle_open_session();
    (StatusCode::OK, handle).into_response()
}

async fn close_session(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
) -> Response {
    match server.handle_close_session(&sid) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

async fn push_schema(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
    body: Bytes,
) -> Response {
    match server.handle_push_schema(&sid, &body) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

async fn pull_schema(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
) -> Response {
    match server.handle_pull_schema(&sid) {
        Ok(blob) => (StatusCode::OK, blob).into_response(),
        Err(e) => error_response(e),
    }
}

async fn push_indexes(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
    body: Bytes,
) -> Response {
    match server.handle_push_indexes(&sid, &body) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

async fn pull_indexes(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
) -> Response {
    match server.handle_pull_indexes(&sid) {
        Ok(blob) => (StatusCode::OK, blob).into_response(),
        Err(e) => error_response(e),
    }
}

async fn pull_tables(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
) -> Response {
    match server.handle_inventory(&sid) {
        Ok(response) => cbor_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn push_table(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
    body: Bytes,
) -> Response {
    let request = match from_cbor(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match server.handle_push_chunk(&sid, request) {
        Ok(ack @ ChunkAck::Accepted) => cbor_response(StatusCode::OK, &ack),
        Ok(ack @ ChunkAck::ChecksumMismatch) => {
            cbor_response(StatusCode::PRECONDITION_FAILED, &ack)
        }
        Err(e) => error_response(e),
    }
}

async fn pull_table(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
    body: Bytes,
) -> Response {
    let request = match from_cbor(&body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match server.handle_pull_chunk(&sid, request) {
        Ok(response) => cbor_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn reset_sequences(
    State(server): State<Arc<SiphonServer>>,
    Path(sid): Path<String>,
) -> Response {
    match server.handle_reset_sequences(&sid) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}
