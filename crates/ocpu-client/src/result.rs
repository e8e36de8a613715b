//! Execution results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OcpuError;

/// Outcome of one task execution attempt.
///
/// Created fresh per [`execute`](crate::OcpuTask::execute) call, owned by
/// the caller, never mutated afterward. Failures are carried here as data
/// rather than raised, so results serialize and inspect uniformly whatever
/// the outcome.
///
/// A successful result can still hold an absent output value: when a script
/// ran but the requested workspace object could not be retrieved,
/// [`success`](Self::success) stays `true` and [`output`](Self::output)
/// reports `(name, None)`. "The script ran; we could not retrieve this
/// object" is distinct from "the task failed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcpuResult {
    success: bool,
    input: Option<String>,
    output: Option<(String, Option<String>)>,
    error: Option<String>,
    cause: Option<OcpuError>,
    time_taken_ms: u64,
}

impl OcpuResult {
    pub(crate) fn completed(
        input: Option<String>,
        output: Option<(String, Option<String>)>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            input,
            output,
            error: None,
            cause: None,
            time_taken_ms: elapsed.as_millis() as u64,
        }
    }

    pub(crate) fn failed(error: String, cause: OcpuError) -> Self {
        Self {
            success: false,
            input: None,
            output: None,
            error: Some(error),
            cause: Some(cause),
            time_taken_ms: 0,
        }
    }

    /// Whether the task executed successfully on the server.
    pub fn success(&self) -> bool {
        self.success
    }

    /// JSON input submitted with the task, echoed back on success.
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// `(name, value)` of the captured output. The name is the invoked
    /// function or the requested workspace object; the value is its raw
    /// JSON, or `None` when the output fetch failed.
    pub fn output(&self) -> Option<(&str, Option<&str>)> {
        self.output
            .as_ref()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Human-readable failure description; `None` on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Underlying fault behind a failure; `None` on success.
    pub fn cause(&self) -> Option<&OcpuError> {
        self.cause.as_ref()
    }

    /// Wall-clock duration of the whole attempt in milliseconds, covering
    /// the primary call and any output fetch. 0 when the attempt failed
    /// before or during the request.
    pub fn time_taken(&self) -> u64 {
        self.time_taken_ms
    }
}
