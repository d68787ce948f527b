//! End-to-end supervisor tests against a scripted stand-in for the proxy.
//!
//! The stand-in is a small shell script, so these tests only run on unix.
//! Host signal forwarding is disabled: other tests in the workspace raise
//! signals in-process.

#![cfg(unix)]

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devmesh_core::{
    BundleIndicator, DevLogPort, ExitReason, HostSignal, Notice, ProxyConfig, default_log_file,
};
use devmesh_runtime::{MeshSupervisor, SupervisorError, SupervisorOptions};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn wait_for(&self, call: &str) {
        for _ in 0..100 {
            if self.calls().iter().any(|c| c == call) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("'{call}' never recorded, got {:?}", self.calls());
    }
}

impl DevLogPort for Recorder {
    fn emit(&self, notice: &Notice) {
        self.push(format!("{}: {}", notice.level, notice.text));
    }
}

impl BundleIndicator for Recorder {
    fn start(&self, text: &str) {
        self.push(format!("start: {text}"));
    }
    fn succeed(&self, text: &str) {
        self.push(format!("succeed: {text}"));
    }
    fn fail(&self, text: &str) {
        self.push(format!("fail: {text}"));
    }
    fn hide(&self) {
        self.push("hide".to_string());
    }
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-mesh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn config(project: &Path, listen_port: u16) -> ProxyConfig {
    ProxyConfig::new(
        listen_port,
        3999,
        project.join("public"),
        project.join("bundler"),
        default_log_file(project),
    )
}

fn supervisor(binary: PathBuf, recorder: &Arc<Recorder>, options: SupervisorOptions) -> MeshSupervisor {
    MeshSupervisor::new(
        binary,
        Arc::clone(recorder) as Arc<dyn DevLogPort>,
        Arc::clone(recorder) as Arc<dyn BundleIndicator>,
    )
    .with_options(options)
}

fn options(ready_timeout: Duration) -> SupervisorOptions {
    SupervisorOptions {
        ready_timeout,
        exit_grace: Duration::from_millis(200),
        poll_interval: Duration::from_millis(50),
        forward_host_signals: false,
    }
}

#[tokio::test]
async fn test_child_exit_code_is_mirrored() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        r#"echo '{"type":"bundle:start","id":"1"}' >&2
echo '{"type":"bundle:fail","id":"1","error":{"msg":"boom"}}' >&2
exit 3"#,
    );
    let recorder = Arc::new(Recorder::default());
    let config = config(tmp.path(), unused_port());

    let handle = supervisor(script, &recorder, options(Duration::from_secs(10)))
        .start(&config)
        .await
        .unwrap();

    assert!(handle.base_url().is_none());
    assert!(config.log_file.parent().unwrap().is_dir());

    let exit = handle.wait().await.unwrap();
    assert_eq!(exit.code, 3);
    assert_eq!(exit.reason, ExitReason::ChildExited);

    let calls = recorder.calls();
    let bundle_calls: Vec<_> = calls
        .iter()
        .filter(|c| !c.contains("exited before it became ready"))
        .cloned()
        .collect();
    assert_eq!(
        bundle_calls,
        vec![
            "start: Bundling edge handlers...",
            "fail: boom",
            "info: Change any project file to trigger a re-bundle",
        ]
    );
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("error: Forward proxy exited before it became ready"))
    );
}

#[tokio::test]
async fn test_ready_proxy_stops_on_shutdown() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        r#"echo '{"type":"bundle:start","id":"1"}' >&2
exec sleep 30"#,
    );
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let recorder = Arc::new(Recorder::default());

    let handle = supervisor(script, &recorder, options(Duration::from_secs(10)))
        .start(&config(tmp.path(), port))
        .await
        .unwrap();

    assert_eq!(
        handle.base_url().map(ToString::to_string),
        Some(format!("http://localhost:{port}"))
    );
    assert!(handle.pid().is_some());

    recorder.wait_for("start: Bundling edge handlers...").await;
    let exit = handle.shutdown().await.unwrap();

    assert_eq!(exit.code, 0);
    assert_eq!(exit.reason, ExitReason::HostExit);
    assert_eq!(exit.child.signal, Some(15));
    assert_eq!(recorder.calls().last().map(String::as_str), Some("hide"));
}

#[tokio::test]
async fn test_stubborn_proxy_is_killed_after_grace() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "trap '' TERM\nexec sleep 30");
    let recorder = Arc::new(Recorder::default());

    let handle = supervisor(script, &recorder, options(Duration::from_millis(100)))
        .start(&config(tmp.path(), unused_port()))
        .await
        .unwrap();

    let exit = handle.shutdown().await.unwrap();
    assert_eq!(exit.code, 0);
    assert_eq!(exit.child.signal, Some(9));
}

#[tokio::test]
async fn test_forwarded_signals_reach_the_proxy_verbatim() {
    for (signal, number) in [(HostSignal::Quit, 3), (HostSignal::Hangup, 1)] {
        let tmp = TempDir::new().unwrap();
        let script = write_script(tmp.path(), "exec sleep 30");
        let recorder = Arc::new(Recorder::default());

        let handle = supervisor(script, &recorder, options(Duration::from_millis(100)))
            .start(&config(tmp.path(), unused_port()))
            .await
            .unwrap();
        handle.forward_signal(signal);
        let exit = handle.wait().await.unwrap();

        assert_eq!(exit.reason, ExitReason::HostSignal(signal));
        assert_eq!(exit.code, 128 + number);
        assert_eq!(exit.child.signal, Some(number));
    }
}

#[tokio::test]
async fn test_readiness_timeout_is_reported() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "exec sleep 30");
    let port = unused_port();
    let recorder = Arc::new(Recorder::default());

    let handle = supervisor(script, &recorder, options(Duration::from_millis(300)))
        .start(&config(tmp.path(), port))
        .await
        .unwrap();

    assert!(handle.base_url().is_none());
    assert!(recorder.calls().contains(&format!(
        "error: Timed out waiting for forward proxy to be ready on port '{port}'"
    )));

    let exit = handle.shutdown().await.unwrap();
    assert_eq!(exit.reason, ExitReason::HostExit);
}

#[tokio::test]
async fn test_missing_binary_fails_to_spawn() {
    let tmp = TempDir::new().unwrap();
    let recorder = Arc::new(Recorder::default());

    let result = supervisor(
        tmp.path().join("no-such-mesh"),
        &recorder,
        options(Duration::from_millis(100)),
    )
    .start(&config(tmp.path(), unused_port()))
    .await;

    assert!(matches!(result, Err(SupervisorError::Spawn { .. })));
    assert!(recorder.calls().is_empty());
}
