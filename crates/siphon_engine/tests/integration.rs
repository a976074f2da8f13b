//! End-to-end transfers against a real in-process peer.

use parking_lot::Mutex;
use siphon_codec::{Row, Value};
use siphon_engine::{
    NullProgress, SessionTransport, SizerConfig, TransferConfig, TransferError,
    TransferOrchestrator, TransferResult,
};
use siphon_protocol::{
    ChunkAck, InventoryResponse, ProtocolVersion, PullChunkRequest, PullChunkResponse,
    PushChunkRequest, VerifyRequest, VerifyResponse, PROTOCOL_VERSION,
};
use siphon_server::{ServerConfig, ServerError, SiphonServer};
use siphon_store::{Database, MemoryDatabase};
use siphon_testkit::{seeded_database, users_rows};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A transport that calls the peer's handlers directly.
struct InProcessTransport {
    server: Arc<SiphonServer>,
    session: Mutex<Option<String>>,
}

impl InProcessTransport {
    fn new(server: Arc<SiphonServer>) -> Self {
        Self {
            server,
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> TransferResult<String> {
        self.session
            .lock()
            .clone()
            .ok_or_else(|| TransferError::Transport("no open session".into()))
    }
}

fn convert(error: ServerError) -> TransferError {
    match error {
        ServerError::IncompatibleVersion { server, .. } => TransferError::IncompatibleVersion {
            url: "mem://peer".into(),
            local: PROTOCOL_VERSION,
            remote: server.to_string(),
        },
        ServerError::NotAuthorized(_) => TransferError::Unauthorized {
            url: "mem://peer".into(),
        },
        other => TransferError::ServerFailure {
            status: other.status(),
            body: other.to_string(),
        },
    }
}

impl SessionTransport for InProcessTransport {
    fn verify_compatibility(&self, request: &VerifyRequest) -> TransferResult<VerifyResponse> {
        self.server.handle_verify(request.clone()).map_err(convert)
    }

    fn open_session(&self) -> TransferResult<()> {
        *self.session.lock() = Some(self.server.handle_open_session());
        Ok(())
    }

    fn close_session(&self) -> TransferResult<()> {
        if let Some(handle) = self.session.lock().take() {
            self.server.handle_close_session(&handle).map_err(convert)?;
        }
        Ok(())
    }

    fn push_schema(&self, blob: &[u8]) -> TransferResult<()> {
        self.server
            .handle_push_schema(&self.session()?, blob)
            .map_err(convert)
    }

    fn pull_schema(&self) -> TransferResult<Vec<u8>> {
        self.server
            .handle_pull_schema(&self.session()?)
            .map_err(convert)
    }

    fn push_indexes(&self, blob: &[u8]) -> TransferResult<()> {
        self.server
            .handle_push_indexes(&self.session()?, blob)
            .map_err(convert)
    }

    fn pull_indexes(&self) -> TransferResult<Vec<u8>> {
        self.server
            .handle_pull_indexes(&self.session()?)
            .map_err(convert)
    }

    fn pull_inventory(&self) -> TransferResult<InventoryResponse> {
        self.server
            .handle_inventory(&self.session()?)
            .map_err(convert)
    }

    fn push_chunk(&self, request: &PushChunkRequest) -> TransferResult<ChunkAck> {
        self.server
            .handle_push_chunk(&self.session()?, request.clone())
            .map_err(convert)
    }

    fn pull_chunk(&self, request: &PullChunkRequest) -> TransferResult<PullChunkResponse> {
        self.server
            .handle_pull_chunk(&self.session()?, request.clone())
            .map_err(convert)
    }

    fn reset_sequences(&self) -> TransferResult<()> {
        self.server
            .handle_reset_sequences(&self.session()?)
            .map_err(convert)
    }
}

/// Wraps a transport and corrupts the first `n` chunk payloads in flight,
/// in whichever direction they travel.
struct CorruptingTransport<T> {
    inner: T,
    remaining: AtomicU32,
    /// Only corrupt chunks at this cursor, when set.
    only_at_cursor: Option<u64>,
}

impl<T> CorruptingTransport<T> {
    fn new(inner: T, n: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(n),
            only_at_cursor: None,
        }
    }

    fn at_cursor(inner: T, n: u32, cursor: u64) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(n),
            only_at_cursor: Some(cursor),
        }
    }

    fn should_corrupt(&self, cursor: u64) -> bool {
        if let Some(target) = self.only_at_cursor {
            if cursor != target {
                return false;
            }
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<T: SessionTransport> SessionTransport for CorruptingTransport<T> {
    fn verify_compatibility(&self, request: &VerifyRequest) -> TransferResult<VerifyResponse> {
        self.inner.verify_compatibility(request)
    }

    fn open_session(&self) -> TransferResult<()> {
        self.inner.open_session()
    }

    fn close_session(&self) -> TransferResult<()> {
        self.inner.close_session()
    }

    fn push_schema(&self, blob: &[u8]) -> TransferResult<()> {
        self.inner.push_schema(blob)
    }

    fn pull_schema(&self) -> TransferResult<Vec<u8>> {
        self.inner.pull_schema()
    }

    fn push_indexes(&self, blob: &[u8]) -> TransferResult<()> {
        self.inner.push_indexes(blob)
    }

    fn pull_indexes(&self) -> TransferResult<Vec<u8>> {
        self.inner.pull_indexes()
    }

    fn pull_inventory(&self) -> TransferResult<InventoryResponse> {
        self.inner.pull_inventory()
    }

    fn push_chunk(&self, request: &PushChunkRequest) -> TransferResult<ChunkAck> {
        if !request.payload.is_empty() && self.should_corrupt(request.state.cursor) {
            let mut corrupted = request.clone();
            corrupted.payload[0] ^= 0x01;
            return self.inner.push_chunk(&corrupted);
        }
        self.inner.push_chunk(request)
    }

    fn pull_chunk(&self, request: &PullChunkRequest) -> TransferResult<PullChunkResponse> {
        let mut response = self.inner.pull_chunk(request)?;
        if !response.payload.is_empty()
            && response.row_count > 0
            && self.should_corrupt(request.state.cursor)
        {
            response.payload[0] ^= 0x01;
        }
        Ok(response)
    }

    fn reset_sequences(&self) -> TransferResult<()> {
        self.inner.reset_sequences()
    }
}

fn peer_with_db(db: Arc<dyn Database>) -> Arc<SiphonServer> {
    Arc::new(SiphonServer::new(ServerConfig::default(), db))
}

fn config(chunk_size: u64) -> TransferConfig {
    TransferConfig::new("mem://peer").with_initial_chunk_size(chunk_size)
}

/// A sizer band nothing can leave: chunk size stays at its initial value.
fn fixed_size_config(chunk_size: u64) -> TransferConfig {
    config(chunk_size).with_sizer(
        SizerConfig::default()
            .with_band(Duration::ZERO, Duration::from_secs(3600))
            .with_max_growth(1.0),
    )
}

fn orchestrate<T: SessionTransport>(
    cfg: TransferConfig,
    transport: T,
    db: Arc<dyn Database>,
) -> TransferOrchestrator<T> {
    TransferOrchestrator::new(cfg, transport, db).with_progress(Arc::new(NullProgress))
}

#[test]
fn users_table_of_250k_rows_pushes_completely() {
    let source = MemoryDatabase::new();
    source.create_table("users").unwrap();
    source.append_rows("users", &users_rows(250_000)).unwrap();

    let dest = Arc::new(MemoryDatabase::new());
    let dest_handle: Arc<dyn Database> = Arc::clone(&dest) as Arc<dyn Database>;
    let peer = peer_with_db(dest_handle);

    let source_handle: Arc<dyn Database> = Arc::new(source);
    let orch = orchestrate(
        config(1_000),
        InProcessTransport::new(Arc::clone(&peer)),
        Arc::clone(&source_handle),
    );

    let summary = orch.send().unwrap();
    assert_eq!(summary.rows, 250_000);
    assert_eq!(summary.corruption_retries, 0);

    assert_eq!(dest.row_count("users").unwrap(), 250_000);
    // Tuple-for-tuple equality; append order is preserved end to end.
    assert_eq!(
        dest.all_rows("users").unwrap(),
        source_handle.read_rows("users", 0, 250_000).unwrap()
    );
    // Session released on the success path.
    assert_eq!(peer.session_count(), 0);
}

#[test]
fn rejected_chunk_at_cursor_5000_converges_to_the_clean_result() {
    let run = |fault: bool| -> (Vec<Row>, u64) {
        let source = seeded_database(10_000, 0).unwrap();
        let source_handle: Arc<dyn Database> = Arc::new(source);

        let dest = Arc::new(MemoryDatabase::new());
        let peer = peer_with_db(Arc::clone(&dest) as Arc<dyn Database>);

        let inner = InProcessTransport::new(peer);
        let transport = if fault {
            CorruptingTransport::at_cursor(inner, 1, 5_000)
        } else {
            CorruptingTransport::at_cursor(inner, 0, 5_000)
        };

        let orch = orchestrate(fixed_size_config(1_000), transport, source_handle);
        let summary = orch.send().unwrap();
        (dest.all_rows("users").unwrap(), summary.corruption_retries)
    };

    let (clean_rows, clean_retries) = run(false);
    let (faulted_rows, faulted_retries) = run(true);

    assert_eq!(clean_retries, 0);
    assert_eq!(faulted_retries, 1);
    assert_eq!(clean_rows.len(), 10_000);
    // One rejection then acceptance leaves exactly the no-failure state.
    assert_eq!(faulted_rows, clean_rows);
}

#[test]
fn version_mismatch_aborts_before_schema_or_data() {
    let source = seeded_database(100, 10).unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);

    let dest = Arc::new(MemoryDatabase::new());
    let newer = ProtocolVersion::new(PROTOCOL_VERSION.major, PROTOCOL_VERSION.minor + 1);
    let peer = Arc::new(SiphonServer::new(
        ServerConfig::default(),
        Arc::clone(&dest) as Arc<dyn Database>,
    ));

    // The client pretends to speak a newer minor version.
    let mut cfg = config(1_000);
    cfg.version = newer;

    let orch = orchestrate(cfg, InProcessTransport::new(peer), source_handle);
    let result = orch.send();
    assert!(matches!(
        result,
        Err(TransferError::IncompatibleVersion { .. })
    ));

    // Nothing reached the destination: no tables, no rows, no session.
    assert!(dest.inventory().unwrap().is_empty());
}

#[test]
fn receive_recovers_from_injected_corruption() {
    let source = seeded_database(5_000, 1_200).unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);
    let peer = peer_with_db(Arc::clone(&source_handle));

    let dest = Arc::new(MemoryDatabase::new());
    let transport = CorruptingTransport::new(InProcessTransport::new(peer), 2);

    let orch = orchestrate(
        fixed_size_config(500),
        transport,
        Arc::clone(&dest) as Arc<dyn Database>,
    );
    let summary = orch.receive().unwrap();

    assert_eq!(summary.rows, 6_200);
    assert_eq!(summary.corruption_retries, 2);

    assert_eq!(
        dest.all_rows("users").unwrap(),
        source_handle.read_rows("users", 0, 5_000).unwrap()
    );
    assert_eq!(
        dest.all_rows("orders").unwrap(),
        source_handle.read_rows("orders", 0, 1_200).unwrap()
    );
}

#[test]
fn receive_applies_schema_indexes_and_sequences() {
    let source = seeded_database(250, 40).unwrap();
    source.apply_indexes(b"CREATE INDEX users_email").unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);
    let peer = peer_with_db(source_handle);

    let dest = Arc::new(MemoryDatabase::new());
    let orch = orchestrate(
        config(100),
        InProcessTransport::new(peer),
        Arc::clone(&dest) as Arc<dyn Database>,
    );
    let summary = orch.receive().unwrap();

    assert_eq!(summary.tables, 2);
    assert_eq!(summary.rows, 290);

    // Schema created both tables; indexes arrived opaquely; sequences
    // reflect the just-inserted rows.
    assert_eq!(dest.row_count("users").unwrap(), 250);
    assert_eq!(dest.row_count("orders").unwrap(), 40);
    assert_eq!(dest.dump_indexes().unwrap(), b"CREATE INDEX users_email");
    assert_eq!(dest.sequence("users").unwrap(), 251);
}

#[test]
fn empty_table_ships_no_chunks() {
    let source = MemoryDatabase::new();
    source.create_table("empty").unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);

    let dest = Arc::new(MemoryDatabase::new());
    let peer = peer_with_db(Arc::clone(&dest) as Arc<dyn Database>);

    let orch = orchestrate(
        config(1_000),
        InProcessTransport::new(peer),
        source_handle,
    );
    let summary = orch.send().unwrap();

    assert_eq!(summary.tables, 1);
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.payload_bytes, 0);
    // The table itself still exists on the destination via the schema.
    assert_eq!(dest.row_count("empty").unwrap(), 0);
}

#[test]
fn wrong_credentials_are_fatal() {
    let source = seeded_database(10, 0).unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);

    let dest: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
    let peer = Arc::new(SiphonServer::new(
        ServerConfig::default().with_credentials("right"),
        dest,
    ));

    let orch = orchestrate(
        config(1_000).with_credentials("wrong"),
        InProcessTransport::new(peer),
        source_handle,
    );
    assert!(matches!(
        orch.send(),
        Err(TransferError::Unauthorized { .. })
    ));
}

#[test]
fn mixed_value_types_survive_the_full_path() {
    let source = MemoryDatabase::new();
    source.create_table("blobs").unwrap();
    let rows: Vec<Row> = vec![
        vec![
            Value::Integer(1),
            Value::Bytes(vec![0x00, 0xFF, 0x7F]),
            Value::Real(-0.5),
        ],
        vec![Value::Integer(2), Value::Null, Value::Bool(false)],
        vec![
            Value::Integer(3),
            Value::Text("snowman \u{2603}".into()),
            Value::Real(1.0e9),
        ],
    ];
    source.append_rows("blobs", &rows).unwrap();
    let source_handle: Arc<dyn Database> = Arc::new(source);

    let dest = Arc::new(MemoryDatabase::new());
    let peer = peer_with_db(Arc::clone(&dest) as Arc<dyn Database>);

    let orch = orchestrate(
        config(2),
        InProcessTransport::new(peer),
        source_handle,
    );
    orch.send().unwrap();

    assert_eq!(dest.all_rows("blobs").unwrap(), rows);
}
