//! OpenCPU Client - HTTP client for executing R tasks on an OpenCPU server
//!
//! OpenCPU exposes R packages over HTTP for scientific computing and data
//! analysis. This crate builds executable task specifications against that
//! API and collapses every outcome into one uniform [`OcpuResult`]:
//!
//! ```no_run
//! # use ocpu_client::{OcpuClient, OcpuTask};
//! # async fn demo() -> Result<(), ocpu_client::OcpuError> {
//! let task = OcpuTask::builder()
//!     .pkg("stats")
//!     .function("rnorm")
//!     .input(&serde_json::json!({"n": 10, "mean": 5}))?
//!     .library();
//!
//! let client = OcpuClient::new();
//! let result = client.execute(&task).await;
//!
//! if result.success() {
//!     println!("rnorm: {:?}", result.output());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Two call flavors exist. A *function* call returns its JSON value
//! directly on the response body. A *script* call runs server-side and
//! leaves its results in a session workspace; the requested object is
//! retrieved with a second request. When that second fetch fails the task
//! still reports success with an absent output value, because the script
//! itself already ran. See [`OcpuResult::output`].
//!
//! `execute` never raises for remote or network faults; failures come back
//! as data inside the result. Tasks are immutable plain data, safe to
//! execute concurrently and to ship to distributed batch executors.

mod endpoint;
mod error;
mod executor;
mod result;
mod task;
mod transport;

pub use error::OcpuError;
pub use result::OcpuResult;
pub use task::{OcpuTask, OcpuTaskBuilder, Provider};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};

/// Default OpenCPU server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8004/ocpu";

/// Client binding a server endpoint to a pooled [`ReqwestTransport`].
///
/// Clone freely; clones share the underlying connection pool. For a custom
/// transport (tests, instrumentation) call [`OcpuTask::execute_at`]
/// directly.
#[derive(Debug, Clone)]
pub struct OcpuClient {
    endpoint: String,
    transport: ReqwestTransport,
}

impl OcpuClient {
    /// Client against the default endpoint, `http://localhost:8004/ocpu`.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Client against a specific server endpoint.
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport: ReqwestTransport::new(),
        }
    }

    /// Client against the endpoint named by `OCPU_ENDPOINT`, falling back
    /// to the default when unset.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("OCPU_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::with_endpoint(&endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a task against this client's endpoint.
    pub async fn execute(&self, task: &OcpuTask) -> OcpuResult {
        task.execute_at(&self.transport, &self.endpoint).await
    }
}

impl Default for OcpuClient {
    fn default() -> Self {
        Self::new()
    }
}
