//! Unix-socket daemon for rollcall.
//!
//! The daemon accepts connections on a Unix domain socket and serves
//! newline-delimited JSON requests: register a submission, list the stored
//! records, or ping. Each connection is handled on its own task; store
//! operations run on the blocking pool under a per-request timeout.
//!
//! The timeout bounds the client's wait, not the store operation itself: a
//! `register` that times out keeps running on the blocking pool and may
//! still persist the record after the `timeout` error frame is sent.

pub mod protocol;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::registry::Registry;
use self::protocol::{DaemonRequest, DaemonResponse, ErrorCode, RequestBody, ResponseBody};

/// The registration daemon.
#[derive(Debug)]
pub struct RegistrationServer {
    socket_path: PathBuf,
    request_timeout: Duration,
    registry: Arc<Registry>,
}

impl RegistrationServer {
    /// Create a server that listens on the given socket and dispatches to
    /// the given registry.
    #[must_use]
    pub fn new(socket_path: PathBuf, request_timeout: Duration, registry: Registry) -> Self {
        Self {
            socket_path,
            request_timeout,
            registry: Arc::new(registry),
        }
    }

    /// Bind the socket and serve connections until the process is stopped.
    ///
    /// A stale socket file from a previous run is removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket directory cannot be prepared, the
    /// socket cannot be bound, or accepting a connection fails.
    pub async fn run(&self) -> Result<()> {
        self.prepare_socket_path().await?;
        if self.socket_path.exists() {
            fs::remove_file(&self.socket_path).await.with_context(|| {
                format!("failed to cleanup stale socket {}", self.socket_path.display())
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path).with_context(|| {
            format!("failed to bind unix socket at {}", self.socket_path.display())
        })?;
        info!(
            "rollcall daemon listening on {} (records in {})",
            self.socket_path.display(),
            self.registry.store().path().display()
        );

        loop {
            let (stream, _) = listener.accept().await?;
            let registry = self.registry.clone();
            let request_timeout = self.request_timeout;
            tokio::spawn(async move {
                if let Err(error) = handle_connection(stream, registry, request_timeout).await {
                    warn!("connection closed with error: {error:#}");
                }
            });
        }
    }

    async fn prepare_socket_path(&self) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create socket directory {}", parent.display())
            })?;
        }
        Ok(())
    }
}

async fn handle_connection(
    stream: UnixStream,
    registry: Arc<Registry>,
    request_timeout: Duration,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = process_line(line, registry.clone(), request_timeout).await;
        let payload = serde_json::to_string(&response)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

async fn process_line(
    line: String,
    registry: Arc<Registry>,
    request_timeout: Duration,
) -> DaemonResponse {
    match serde_json::from_str::<DaemonRequest>(&line) {
        Ok(request) => handle_request(request, registry, request_timeout).await,
        Err(error) => {
            error!("invalid request JSON: {error}");
            DaemonResponse::error(
                String::new(),
                ErrorCode::InvalidRequest,
                format!("invalid JSON payload: {error}"),
            )
        }
    }
}

async fn handle_request(
    request: DaemonRequest,
    registry: Arc<Registry>,
    request_timeout: Duration,
) -> DaemonResponse {
    let id = request.id;
    match request.body {
        RequestBody::Ping => DaemonResponse {
            id,
            body: ResponseBody::Pong,
        },
        RequestBody::Register(submission) => {
            let result = timeout(
                request_timeout,
                tokio::task::spawn_blocking(move || registry.register(submission)),
            )
            .await;
            match result {
                Ok(Ok(Ok(record))) => DaemonResponse {
                    id,
                    body: ResponseBody::Registered { record },
                },
                Ok(Ok(Err(error))) => failure_response(id, &error),
                Ok(Err(join_error)) => DaemonResponse::error(
                    id,
                    ErrorCode::Internal,
                    format!("register task failed: {join_error}"),
                ),
                Err(_) => timeout_response(id, request_timeout),
            }
        }
        RequestBody::List => {
            let result = timeout(
                request_timeout,
                tokio::task::spawn_blocking(move || registry.list()),
            )
            .await;
            match result {
                Ok(Ok(Ok(records))) => DaemonResponse {
                    id,
                    body: ResponseBody::Records { records },
                },
                Ok(Ok(Err(error))) => failure_response(id, &error),
                Ok(Err(join_error)) => DaemonResponse::error(
                    id,
                    ErrorCode::Internal,
                    format!("list task failed: {join_error}"),
                ),
                Err(_) => timeout_response(id, request_timeout),
            }
        }
    }
}

/// Map a registry failure to a wire error response.
fn failure_response(id: String, error: &Error) -> DaemonResponse {
    let code = match error {
        Error::MissingField { .. } => ErrorCode::MissingField,
        Error::StoreRead { .. }
        | Error::StoreWrite { .. }
        | Error::StoreDecode { .. }
        | Error::DirectoryCreate { .. }
        | Error::Io(_) => ErrorCode::Storage,
        _ => ErrorCode::Internal,
    };
    DaemonResponse::error(id, code, error.to_string())
}

fn timeout_response(id: String, request_timeout: Duration) -> DaemonResponse {
    DaemonResponse::error(
        id,
        ErrorCode::Timeout,
        format!("request exceeded {}ms", request_timeout.as_millis()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Submission;
    use crate::store::{DecodeErrorPolicy, RecordStore};
    use std::path::PathBuf;

    struct TestDir(PathBuf);

    impl TestDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "rollcall_server_{name}_{}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            Self(dir)
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn test_registry(dir: &TestDir) -> Arc<Registry> {
        let store =
            RecordStore::open(dir.0.join("students.json"), DecodeErrorPolicy::default()).unwrap();
        Arc::new(Registry::new(store))
    }

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn handles_ping() {
        let dir = TestDir::new("ping");
        let registry = test_registry(&dir);
        let request = DaemonRequest {
            id: "1".to_string(),
            body: RequestBody::Ping,
        };

        let response = handle_request(request, registry, TEST_TIMEOUT).await;
        assert!(matches!(response.body, ResponseBody::Pong));
        assert_eq!(response.id, "1");
    }

    #[tokio::test]
    async fn handles_register_then_list() {
        let dir = TestDir::new("register");
        let registry = test_registry(&dir);

        let request = DaemonRequest {
            id: "2".to_string(),
            body: RequestBody::Register(Submission::new("Ann", "a@x.com", "CS", "")),
        };
        let response = handle_request(request, registry.clone(), TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Registered { record } => {
                assert_eq!(record.name, "Ann");
                assert_eq!(record.email, "a@x.com");
            }
            other => panic!("unexpected response: {other:?}"),
        }

        let request = DaemonRequest {
            id: "3".to_string(),
            body: RequestBody::List,
        };
        let response = handle_request(request, registry, TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Records { records } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].name, "Ann");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_missing_required_field() {
        let dir = TestDir::new("missing");
        let registry = test_registry(&dir);

        let request = DaemonRequest {
            id: "4".to_string(),
            body: RequestBody::Register(Submission::new("  ", "a@x.com", "", "")),
        };
        let response = handle_request(request, registry.clone(), TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Error(err) => {
                assert_eq!(err.code, ErrorCode::MissingField);
                assert!(err.message.contains("name"));
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // The rejected submission never reached the store.
        let request = DaemonRequest {
            id: "5".to_string(),
            body: RequestBody::List,
        };
        let response = handle_request(request, registry, TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Records { records } => assert!(records.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_yields_invalid_request() {
        let dir = TestDir::new("badjson");
        let registry = test_registry(&dir);

        let response =
            process_line("this is not json".to_string(), registry, TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Error(err) => assert_eq!(err.code, ErrorCode::InvalidRequest),
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(response.id, "");
    }

    #[tokio::test]
    async fn list_on_empty_store_is_empty() {
        let dir = TestDir::new("empty");
        let registry = test_registry(&dir);

        let request = DaemonRequest {
            id: String::new(),
            body: RequestBody::List,
        };
        let response = handle_request(request, registry, TEST_TIMEOUT).await;
        match response.body {
            ResponseBody::Records { records } => assert!(records.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
