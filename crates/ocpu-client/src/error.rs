//! Error types for OpenCPU task execution.

use serde::{Deserialize, Serialize};

/// The fault behind a failed execution attempt.
///
/// Variants carry only strings and scalars so a failed result stays
/// serializable end to end, the same as a successful one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum OcpuError {
    /// A required task field was never supplied to the builder.
    #[error("Task specification incomplete.")]
    Spec,

    /// The server answered the primary call with a non-2xx status.
    #[error("HTTP {message}, error code {status}.")]
    Remote { status: u16, message: String },

    /// Network, connection or I/O failure while talking to the server.
    #[error("{0}")]
    Transport(String),

    /// Task input could not be serialized to JSON.
    #[error("Task input data invalid: {0}")]
    Input(String),
}
