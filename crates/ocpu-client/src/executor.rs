//! Task execution: validation, the primary POST, response dispatch, the
//! optional session-workspace fetch, and result assembly.

use std::time::Instant;

use tracing::{debug, warn};

use crate::endpoint::{self, CallKind};
use crate::error::OcpuError;
use crate::result::OcpuResult;
use crate::task::{OcpuTask, UNDEFINED};
use crate::transport::{HttpRequest, Method, Transport, SESSION_HEADER};

const EXECUTION_FAILED: &str = "Task execution failed.";

/// Run one task against `server`.
///
/// Every outcome, including every failure, comes back as an [`OcpuResult`];
/// this function never errors. Elapsed time is measured from just before
/// validation through result assembly, so it covers the primary call and
/// any output fetch end to end. Failed attempts report 0.
pub(crate) async fn run<T: Transport + ?Sized>(
    task: &OcpuTask,
    transport: &T,
    server: &str,
) -> OcpuResult {
    let start = Instant::now();

    // Incomplete specifications never reach the network.
    if task.endpoint().contains(UNDEFINED) {
        return OcpuResult::failed("Task specification incomplete.".to_string(), OcpuError::Spec);
    }

    let url = format!("{}{}", server, task.endpoint());
    debug!(%url, "executing OpenCPU task");

    let request = HttpRequest {
        method: Method::Post,
        url,
        body: Some(task.input().unwrap_or("{}").to_string()),
    };

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(cause) => return OcpuResult::failed(EXECUTION_FAILED.to_string(), cause),
    };

    if !response.is_success() {
        let status = response.status();
        let message = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        let cause = OcpuError::Remote { status, message };
        return OcpuResult::failed(format!("{task}: {cause}"), cause);
    }

    let input = task.input().map(str::to_string);

    match task.kind() {
        // Function call: the response body is the JSON return value.
        CallKind::Function => {
            let output = Some((task.function().to_string(), Some(response.into_body())));
            OcpuResult::completed(input, output, start.elapsed())
        }
        // Script call: results live in the session workspace and the
        // requested object is fetched with a second request.
        CallKind::Script => {
            let output = match task.output() {
                Some(name) => {
                    let session = response.header(SESSION_HEADER);
                    let value = fetch_output(transport, server, session, name).await;
                    Some((name.to_string(), value))
                }
                None => None,
            };
            OcpuResult::completed(input, output, start.elapsed())
        }
    }
}

/// Fetch a named workspace object from the session created by a script run.
///
/// Failures here never fail the task. The script already completed
/// server-side, so the success outcome stands and the object value is
/// reported absent. This is a deliberate partial-success contract, not an
/// oversight; the only trace of the fault is the warning emitted here.
async fn fetch_output<T: Transport + ?Sized>(
    transport: &T,
    server: &str,
    session: Option<&str>,
    object: &str,
) -> Option<String> {
    let Some(session) = session else {
        warn!(object, "script response carried no session header; output unavailable");
        return None;
    };

    let request = HttpRequest {
        method: Method::Get,
        url: format!("{}{}", server, endpoint::session_data(session, object)),
        body: None,
    };

    match transport.send(request).await {
        Ok(response) if response.is_success() => Some(response.into_body()),
        Ok(response) => {
            warn!(
                object,
                status = response.status(),
                "output fetch failed; task result stays successful without a value"
            );
            None
        }
        Err(error) => {
            warn!(
                object,
                %error,
                "output fetch failed; task result stays successful without a value"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::transport::HttpResponse;

    const SERVER: &str = "http://ocpu.test/ocpu";

    /// Transport stub: records every request, replays queued responses.
    struct MockTransport {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<VecDeque<Result<HttpResponse, OcpuError>>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<HttpResponse, OcpuError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OcpuError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport received an unexpected request")
        }
    }

    fn rnorm_task() -> OcpuTask {
        OcpuTask::builder()
            .pkg("stats")
            .function("rnorm")
            .input(&serde_json::json!({"n": 10, "mean": 5}))
            .unwrap()
            .library()
    }

    fn script_task() -> OcpuTask {
        OcpuTask::builder()
            .pkg("MASS")
            .script("ch01.R")
            .output("dd")
            .library()
    }

    #[tokio::test]
    async fn function_call_takes_the_value_from_the_response_body() {
        let transport = MockTransport::new(vec![Ok(HttpResponse::new(200, "[4.1,5.9]"))]);
        let result = rnorm_task().execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert_eq!(result.output(), Some(("rnorm", Some("[4.1,5.9]"))));
        assert_eq!(result.input(), Some(r#"{"mean":5,"n":10}"#));
        assert!(result.error().is_none());
        assert!(result.cause().is_none());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(
            requests[0].url,
            "http://ocpu.test/ocpu/library/stats/R/rnorm/json"
        );
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"mean":5,"n":10}"#));
    }

    #[tokio::test]
    async fn missing_input_posts_an_empty_json_object() {
        let transport = MockTransport::new(vec![Ok(HttpResponse::new(200, "[]"))]);
        let task = OcpuTask::builder().pkg("stats").function("rnorm").library();
        let result = task.execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert!(result.input().is_none());
        assert_eq!(transport.requests()[0].body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn incomplete_spec_fails_before_any_network_call() {
        let transport = MockTransport::new(vec![]);
        let task = OcpuTask::builder().function("rnorm").library();
        let result = task.execute_at(&transport, SERVER).await;

        assert!(!result.success());
        assert_eq!(result.error(), Some("Task specification incomplete."));
        assert_eq!(result.cause(), Some(&OcpuError::Spec));
        assert_eq!(result.time_taken(), 0);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_function_is_an_incomplete_spec_too() {
        let transport = MockTransport::new(vec![]);
        let task = OcpuTask::builder().pkg("stats").library();
        let result = task.execute_at(&transport, SERVER).await;

        assert!(!result.success());
        assert_eq!(result.cause(), Some(&OcpuError::Spec));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_failure_stops_the_attempt() {
        let transport = MockTransport::new(vec![Ok(HttpResponse::new(500, "boom"))]);
        let result = script_task().execute_at(&transport, SERVER).await;

        assert!(!result.success());
        assert_eq!(
            result.cause(),
            Some(&OcpuError::Remote {
                status: 500,
                message: "Internal Server Error".to_string()
            })
        );
        assert_eq!(
            result.error(),
            Some("/library/MASS/scripts/ch01.R: HTTP Internal Server Error, error code 500.")
        );
        assert_eq!(result.time_taken(), 0);
        // No output fetch after a failed primary call.
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_returned_as_data() {
        let transport = MockTransport::new(vec![Err(OcpuError::Transport(
            "connection refused".to_string(),
        ))]);
        let result = rnorm_task().execute_at(&transport, SERVER).await;

        assert!(!result.success());
        assert_eq!(result.error(), Some("Task execution failed."));
        assert_eq!(
            result.cause(),
            Some(&OcpuError::Transport("connection refused".to_string()))
        );
        assert_eq!(result.time_taken(), 0);
    }

    #[tokio::test]
    async fn script_call_fetches_the_output_from_the_session() {
        let transport = MockTransport::new(vec![
            Ok(HttpResponse::new(201, "").with_header("X-ocpu-session", "x0a1b2c")),
            Ok(HttpResponse::new(200, r#"{"dd":[1,2,3]}"#)),
        ]);
        let result = script_task().execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert_eq!(result.output(), Some(("dd", Some(r#"{"dd":[1,2,3]}"#))));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url,
            "http://ocpu.test/ocpu/library/MASS/scripts/ch01.R"
        );
        assert_eq!(requests[1].method, Method::Get);
        assert_eq!(
            requests[1].url,
            "http://ocpu.test/ocpu/tmp/x0a1b2c/R/dd/json"
        );
        assert!(requests[1].body.is_none());
    }

    #[tokio::test]
    async fn failed_output_fetch_keeps_the_task_successful() {
        let transport = MockTransport::new(vec![
            Ok(HttpResponse::new(201, "").with_header("X-ocpu-session", "x0a1b2c")),
            Ok(HttpResponse::new(404, "object not found")),
        ]);
        let result = script_task().execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert_eq!(result.output(), Some(("dd", None)));
        assert!(result.error().is_none());
        assert!(result.cause().is_none());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn output_fetch_transport_error_is_swallowed_as_well() {
        let transport = MockTransport::new(vec![
            Ok(HttpResponse::new(201, "").with_header("X-ocpu-session", "x0a1b2c")),
            Err(OcpuError::Transport("broken pipe".to_string())),
        ]);
        let result = script_task().execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert_eq!(result.output(), Some(("dd", None)));
    }

    #[tokio::test]
    async fn script_without_requested_output_skips_the_fetch() {
        let transport = MockTransport::new(vec![Ok(
            HttpResponse::new(201, "").with_header("X-ocpu-session", "x0a1b2c")
        )]);
        let task = OcpuTask::builder().pkg("MASS").script("ch01.R").library();
        let result = task.execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert!(result.output().is_none());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_session_header_behaves_like_a_failed_fetch() {
        let transport = MockTransport::new(vec![Ok(HttpResponse::new(201, ""))]);
        let result = script_task().execute_at(&transport, SERVER).await;

        assert!(result.success());
        assert_eq!(result.output(), Some(("dd", None)));
        // No fetch can be issued without a session identifier.
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn executing_the_same_task_twice_yields_identical_outputs() {
        let task = rnorm_task();
        let body = "[0.8,1.3]";

        let first = task
            .execute_at(&MockTransport::new(vec![Ok(HttpResponse::new(200, body))]), SERVER)
            .await;
        let second = task
            .execute_at(&MockTransport::new(vec![Ok(HttpResponse::new(200, body))]), SERVER)
            .await;

        assert_eq!(first.output(), second.output());
        assert_eq!(first.input(), second.input());
        assert_eq!(first.success(), second.success());
    }
}
