//! Serve command - answer mount calls as JSON lines on stdin/stdout.
//!
//! Each input line is a request:
//!
//! ```json
//! {"id": 1, "path": "mount/mount", "params": {"source": "/srv/data", "mountPoint": "/mnt/data", "backendName": "bind"}}
//! ```
//!
//! and produces exactly one response line:
//!
//! ```json
//! {"id": 1, "ok": true, "result": {}}
//! {"id": 2, "ok": false, "error": {"kind": "NotFound", "message": "Mount not found: /mnt/x"}}
//! ```
//!
//! The stream is trusted: whoever owns this process's stdin is the caller.
//! On end of input every remaining mount is torn down.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use tracing::instrument;

use mountctl_core::rc::{CallTable, Params};
use mountctl_core::{ControlConfig, ControlError, MountControl};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Leave mounts in place when input ends instead of unmounting them
    #[arg(long)]
    pub keep_mounts: bool,
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    path: String,
    #[serde(default)]
    params: Params,
}

#[derive(Debug, Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl Response {
    fn success(id: Option<Value>, result: Params) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, kind: &'static str, message: String) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorBody { kind, message }),
        }
    }
}

impl From<(Option<Value>, Result<Params, ControlError>)> for Response {
    fn from((id, result): (Option<Value>, Result<Params, ControlError>)) -> Self {
        match result {
            Ok(params) => Response::success(id, params),
            Err(e) => Response::failure(id, e.kind(), e.to_string()),
        }
    }
}

#[instrument(level = "info", name = "cmd::serve", skip_all)]
pub fn execute(args: &Args, config: ControlConfig) -> Result<()> {
    let control = super::build_control(config);
    let table = CallTable::new();

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_until_closed(&control, &table, stdin.lock(), stdout.lock(), args.keep_mounts)
}

/// Serve `input` until it ends or the stream breaks, then release mounts.
///
/// Mounts are torn down (unless `keep_mounts`) before any I/O error is
/// returned, so a broken stream never leaves them behind.
fn serve_until_closed<R, W>(
    control: &MountControl,
    table: &CallTable,
    input: R,
    output: W,
    keep_mounts: bool,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let served = serve_lines(control, table, input, output);
    match &served {
        Ok(handled) => tracing::info!("Input closed after {handled} request(s)"),
        Err(e) => tracing::error!("Stopped serving: {e:#}"),
    }

    if keep_mounts {
        let left = control.list_active_mounts().len();
        if left > 0 {
            tracing::warn!("Leaving {left} mount(s) in place");
        }
    } else {
        shutdown(control);
    }
    served.map(|_| ())
}

/// Answer every request line from `input` on `output`; returns the number handled.
///
/// Lines that are not UTF-8 or not a valid request get an `InvalidRequest`
/// response. Only failures of the streams themselves end the loop early.
pub fn serve_lines<R, W>(
    control: &MountControl,
    table: &CallTable,
    mut input: R,
    mut output: W,
) -> Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut handled = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = input
            .read_until(b'\n', &mut buf)
            .context("Failed to read request")?;
        if read == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match serde_json::from_str::<Request>(line) {
                Ok(request) => {
                    tracing::debug!("Call {}", request.path);
                    let result = table.call(control, &request.path, &request.params);
                    Response::from((request.id, result))
                }
                Err(e) => Response::failure(None, "InvalidRequest", e.to_string()),
            },
            Err(e) => Response::failure(
                None,
                "InvalidRequest",
                format!("Request is not valid UTF-8: {e}"),
            ),
        };

        serde_json::to_writer(&mut output, &response).context("Failed to write response")?;
        output
            .write_all(b"\n")
            .and_then(|()| output.flush())
            .context("Failed to write response")?;
        handled += 1;
    }
    Ok(handled)
}

fn shutdown(control: &MountControl) {
    for outcome in control.remove_all() {
        match outcome.result {
            Ok(()) => tracing::info!("Unmounted {}", outcome.mount_point.display()),
            Err(e) => tracing::warn!(
                "Failed to unmount {}: {}",
                outcome.mount_point.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mountctl_core::testing::{MockBackend, StaticResolver};
    use mountctl_core::{BackendRegistry, MountDirectory};
    use std::sync::Arc;

    fn run(control: &MountControl, input: &str) -> Vec<Value> {
        run_bytes(control, input.as_bytes())
    }

    fn run_bytes(control: &MountControl, input: &[u8]) -> Vec<Value> {
        let mut out = Vec::new();
        serve_lines(control, &CallTable::new(), input, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn mock_control() -> (MountControl, Arc<MockBackend>) {
        let registry = Arc::new(BackendRegistry::new());
        let backend = Arc::new(MockBackend::new());
        registry.register_arc("mount", backend.clone());
        let control = MountControl::new(
            registry,
            Arc::new(MountDirectory::new()),
            Arc::new(StaticResolver::new()),
        );
        (control, backend)
    }

    #[test]
    fn one_response_per_request() {
        let (control, backend) = mock_control();
        let input = r#"
{"id": 1, "path": "mount/mount", "params": {"source": "remote:", "mountPoint": "/mnt/r"}}
{"id": 2, "path": "mount/listmounts"}
{"id": 3, "path": "mount/unmount", "params": {"mountPoint": "/mnt/r"}}
{"id": 4, "path": "mount/unmount", "params": {"mountPoint": "/mnt/r"}}
"#;
        let responses = run(&control, input);
        assert_eq!(responses.len(), 4);

        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["ok"], true);
        assert_eq!(responses[1]["result"]["mounts"][0]["mountPoint"], "/mnt/r");
        assert_eq!(responses[2]["ok"], true);
        assert_eq!(responses[3]["ok"], false);
        assert_eq!(responses[3]["error"]["kind"], "NotFound");
        assert_eq!(backend.teardown_count(), 1);
    }

    #[test]
    fn malformed_lines_get_an_error_response() {
        let (control, _backend) = mock_control();
        let responses = run(&control, "not json\n{\"id\": \"x\", \"path\": \"mount/what\"}\n");
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["kind"], "InvalidRequest");
        assert!(responses[0].get("id").is_none());
        assert_eq!(responses[1]["id"], "x");
        assert_eq!(responses[1]["error"]["kind"], "UnknownCall");
    }

    #[test]
    fn shutdown_unmounts_everything() {
        let (control, backend) = mock_control();
        run(
            &control,
            r#"{"path": "mount/mount", "params": {"source": "a:", "mountPoint": "/mnt/a"}}
{"path": "mount/mount", "params": {"source": "b:", "mountPoint": "/mnt/b"}}
"#,
        );
        assert_eq!(control.list_active_mounts().len(), 2);

        shutdown(&control);
        assert!(control.list_active_mounts().is_empty());
        assert_eq!(backend.teardown_count(), 2);
    }

    #[test]
    fn invalid_utf8_line_does_not_stop_serving() {
        let (control, _backend) = mock_control();
        let mut input = Vec::new();
        input.extend_from_slice(
            br#"{"id": 1, "path": "mount/mount", "params": {"source": "a:", "mountPoint": "/mnt/a"}}"#,
        );
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"id": 3, "path": "mount/listmounts"}"#);
        input.push(b'\n');

        let responses = run_bytes(&control, &input);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["ok"], true);
        assert_eq!(responses[1]["error"]["kind"], "InvalidRequest");
        assert!(
            responses[1]["error"]["message"]
                .as_str()
                .unwrap()
                .contains("UTF-8")
        );
        assert_eq!(responses[2]["id"], 3);
        assert_eq!(responses[2]["result"]["mounts"][0]["mountPoint"], "/mnt/a");
    }

    #[test]
    fn last_line_without_newline_is_answered() {
        let (control, _backend) = mock_control();
        let responses = run(&control, r#"{"id": 7, "path": "mount/types"}"#);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"]["types"], serde_json::json!(["mount"]));
    }

    /// Writer whose every write fails, like a closed pipe
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_output_still_unmounts_everything() {
        let (control, backend) = mock_control();
        let input = br#"{"id": 1, "path": "mount/mount", "params": {"source": "a:", "mountPoint": "/mnt/a"}}
{"id": 2, "path": "mount/listmounts"}
"#;

        let err = serve_until_closed(&control, &CallTable::new(), &input[..], ClosedPipe, false)
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write response"));
        assert_eq!(backend.mount_count(), 1);
        assert_eq!(backend.teardown_count(), 1);
        assert!(control.list_active_mounts().is_empty());
    }

    #[test]
    fn keep_mounts_leaves_them_after_end_of_input() {
        let (control, backend) = mock_control();
        let input = br#"{"path": "mount/mount", "params": {"source": "a:", "mountPoint": "/mnt/a"}}
"#;

        serve_until_closed(&control, &CallTable::new(), &input[..], Vec::<u8>::new(), true)
            .unwrap();
        assert_eq!(control.list_active_mounts().len(), 1);
        assert_eq!(backend.teardown_count(), 0);
    }
}
