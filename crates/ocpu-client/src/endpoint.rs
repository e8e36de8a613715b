//! Construction of relative OpenCPU API paths.

use serde::{Deserialize, Serialize};

/// Path segment selecting function-call execution.
const FUNCTION_SEGMENT: &str = "R";
/// Path segment selecting script execution.
const SCRIPT_SEGMENT: &str = "scripts";
/// Suffix asking the server to put the return value on the response body.
const JSON_SUFFIX: &str = "/json";

/// The two response flows an OpenCPU call can take.
///
/// A function call carries its JSON return value directly on the response
/// body. A script call only creates a server-side session; any result must
/// be fetched afterwards by object name from the session workspace. The
/// discriminant is decided at build time and carried on the task, so
/// dispatch never depends on matching the `/json` suffix in the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Function,
    Script,
}

/// Build the relative API path for a task:
/// `{base}[{user}/]{pkg}/{R|scripts}/{function}[/json]`.
///
/// The `user` segment is omitted entirely when absent. The `/json` suffix
/// is appended only for function calls.
pub(crate) fn build(
    base: &str,
    user: Option<&str>,
    pkg: &str,
    kind: CallKind,
    function: &str,
) -> String {
    let mut path = String::from(base);
    if let Some(user) = user {
        path.push_str(user);
        path.push('/');
    }
    path.push_str(pkg);
    path.push('/');
    path.push_str(match kind {
        CallKind::Function => FUNCTION_SEGMENT,
        CallKind::Script => SCRIPT_SEGMENT,
    });
    path.push('/');
    path.push_str(function);
    if kind == CallKind::Function {
        path.push_str(JSON_SUFFIX);
    }
    path
}

/// Relative path of a named object in a session workspace.
pub(crate) fn session_data(session: &str, object: &str) -> String {
    format!("/tmp/{session}/R/{object}/json")
}
