//! Wire protocol for the rollcall daemon.
//!
//! Requests and responses are newline-delimited JSON frames over a Unix
//! socket. Each frame carries an optional client-chosen `id` that is echoed
//! back, and a `type` tag selecting the operation.

use serde::{Deserialize, Serialize};

use crate::record::{Record, Submission};

/// A single request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    /// Client-chosen correlation id, echoed back in the response.
    #[serde(default)]
    pub id: String,
    /// The operation to perform.
    #[serde(flatten)]
    pub body: RequestBody,
}

/// Request payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    /// Submit a registration.
    Register(Submission),
    /// Fetch the full registration list.
    List,
    /// Liveness check.
    Ping,
}

/// A single response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    /// Correlation id copied from the request.
    #[serde(default)]
    pub id: String,
    /// The response payload.
    #[serde(flatten)]
    pub body: ResponseBody,
}

/// Response payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    /// The submission was accepted; echoes the record as stored.
    Registered {
        /// The stored record (trimmed fields).
        record: Record,
    },
    /// The full registration list, in insertion order.
    Records {
        /// All stored records.
        records: Vec<Record>,
    },
    /// Reply to a ping.
    Pong,
    /// The request failed.
    Error(ErrorResponse),
}

/// An error response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error category.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

/// Machine-readable error categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request frame was not valid JSON or not a known request.
    InvalidRequest,
    /// A required submission field was empty after trimming.
    MissingField,
    /// The operation did not complete within the request timeout.
    Timeout,
    /// Reading or writing the record store failed.
    Storage,
    /// Unexpected server-side failure.
    Internal,
}

impl DaemonResponse {
    /// Build an error response with the given id, code, and message.
    #[must_use]
    pub fn error(id: String, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            body: ResponseBody::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        }
    }
}
