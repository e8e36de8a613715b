//! Task specifications and the fluent builder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::endpoint::{self, CallKind};
use crate::error::OcpuError;
use crate::executor;
use crate::result::OcpuResult;
use crate::transport::Transport;
use crate::DEFAULT_ENDPOINT;

/// Placeholder substituted for a missing required field. Validation spots
/// an incomplete specification by finding it in the built endpoint.
pub(crate) const UNDEFINED: &str = "UNDEFINED";

/// Package source, selecting the URL prefix and which fields are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Library,
    Cran,
    Bioc,
    GitHub,
    Gist,
}

impl Provider {
    /// URL prefix for calls against this provider.
    pub fn base(&self) -> &'static str {
        match self {
            Provider::Library => "/library/",
            Provider::Cran => "/cran/",
            Provider::Bioc => "/bioc/",
            Provider::GitHub => "/github/",
            Provider::Gist => "/gist/",
        }
    }

    fn user_rule(&self) -> UserRule {
        match self {
            Provider::GitHub | Provider::Gist => UserRule::Required,
            Provider::Library => UserRule::Optional,
            Provider::Cran | Provider::Bioc => UserRule::Ignored,
        }
    }
}

/// How a provider treats the `user` field when the endpoint is built.
enum UserRule {
    /// Missing user is sentinel-substituted and fails validation.
    Required,
    /// Included in the path when present, omitted otherwise.
    Optional,
    /// Dropped even when supplied.
    Ignored,
}

/// Immutable specification of one R task targeting an OpenCPU server.
///
/// Built once via [`OcpuTask::builder`] and executable any number of times;
/// a task carries no mutable state, so independent executions are safe from
/// concurrent callers. All fields are plain data and the whole task serde
/// round-trips, so specifications can be shipped across process or machine
/// boundaries to distributed batch executors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcpuTask {
    user: Option<String>,
    pkg: String,
    function: String,
    input: Option<String>,
    output: Option<String>,
    provider: Provider,
    kind: CallKind,
    endpoint: String,
}

impl OcpuTask {
    pub fn builder() -> OcpuTaskBuilder {
        OcpuTaskBuilder::default()
    }

    /// Execute against the default server endpoint.
    pub async fn execute<T: Transport + ?Sized>(&self, transport: &T) -> OcpuResult {
        self.execute_at(transport, DEFAULT_ENDPOINT).await
    }

    /// Execute against an explicit server endpoint, e.g.
    /// `http://public.opencpu.org/ocpu`.
    ///
    /// Never returns an error: every outcome, including validation and
    /// network failures, comes back inside the [`OcpuResult`].
    pub async fn execute_at<T: Transport + ?Sized>(
        &self,
        transport: &T,
        server: &str,
    ) -> OcpuResult {
        executor::run(self, transport, server).await
    }

    /// Relative API path for the primary call.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn is_script(&self) -> bool {
        self.kind == CallKind::Script
    }

    /// Invoked function name, or script file name for script tasks.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Workspace object fetched after a script run.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub(crate) fn kind(&self) -> CallKind {
        self.kind
    }

    pub(crate) fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }
}

impl fmt::Display for OcpuTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

/// Fluent builder for [`OcpuTask`].
///
/// ```no_run
/// # use ocpu_client::OcpuTask;
/// let task = OcpuTask::builder()
///     .pkg("stats")
///     .function("rnorm")
///     .library();
/// ```
///
/// Missing required fields do not fail the build; they are replaced by a
/// sentinel and the task fails validation at execution time, as a failed
/// result rather than an error.
#[derive(Debug, Default)]
pub struct OcpuTaskBuilder {
    user: Option<String>,
    pkg: Option<String>,
    function: Option<String>,
    script: bool,
    input: Option<String>,
    output: Option<String>,
}

impl OcpuTaskBuilder {
    /// Package owner. Consulted for private-library, GitHub and Gist
    /// packages; CRAN and Bioconductor calls ignore it.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn pkg(mut self, pkg: impl Into<String>) -> Self {
        self.pkg = Some(pkg.into());
        self
    }

    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Run a script instead of calling a function. The script's results
    /// live in a server-side session; name the object to retrieve with
    /// [`output`](Self::output).
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.function = Some(script.into());
        self.script = true;
        self
    }

    /// Workspace object to fetch once a script run completes. Unused for
    /// function calls.
    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Call arguments, serialized to JSON immediately.
    ///
    /// This is the one builder step that can fail; everything downstream
    /// reports faults through the execution result instead.
    pub fn input<I: Serialize>(mut self, input: &I) -> Result<Self, OcpuError> {
        self.input =
            Some(serde_json::to_string(input).map_err(|e| OcpuError::Input(e.to_string()))?);
        Ok(self)
    }

    /// Build a task against a package in the server's private library.
    pub fn library(self) -> OcpuTask {
        self.build(Provider::Library)
    }

    /// Build a task against a CRAN package.
    pub fn cran(self) -> OcpuTask {
        self.build(Provider::Cran)
    }

    /// Build a task against a Bioconductor package.
    pub fn bioc(self) -> OcpuTask {
        self.build(Provider::Bioc)
    }

    /// Build a task against a GitHub-hosted package; requires `user`.
    pub fn github(self) -> OcpuTask {
        self.build(Provider::GitHub)
    }

    /// Build a task against a Gist-hosted script; requires `user`.
    pub fn gist(self) -> OcpuTask {
        self.build(Provider::Gist)
    }

    fn build(self, provider: Provider) -> OcpuTask {
        let user = match provider.user_rule() {
            UserRule::Required => Some(self.user.unwrap_or_else(|| UNDEFINED.to_string())),
            UserRule::Optional => self.user,
            UserRule::Ignored => None,
        };
        let pkg = self.pkg.unwrap_or_else(|| UNDEFINED.to_string());
        let function = self.function.unwrap_or_else(|| UNDEFINED.to_string());
        let kind = if self.script {
            CallKind::Script
        } else {
            CallKind::Function
        };
        let endpoint = endpoint::build(provider.base(), user.as_deref(), &pkg, kind, &function);

        OcpuTask {
            user,
            pkg,
            function,
            input: self.input,
            output: self.output,
            provider,
            kind,
            endpoint,
        }
    }
}
