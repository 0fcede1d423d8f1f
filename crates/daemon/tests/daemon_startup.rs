use std::io::Write;
use std::path::Path;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Serve a static catalog listing on an ephemeral port
async fn spawn_catalog(body: &'static str) -> String {
    let app = Router::new().route("/items", get(move || async move { body }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/items", addr)
}

/// A closed local port
fn unused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    format!("http://{}/items", addr)
}

/// Create a valid config using `true` as capture program
fn config(catalog_url: &str, dir: &Path) -> String {
    format!(
        r#"
[catalog]
url = "{}"
retries = 0
timeout_secs = 2

[recorder]
output_root = "{}"

[capture]
program = "true"

[logging]
directory = "{}"
"#,
        catalog_url,
        dir.join("Recordings").display(),
        dir.join("logs").display()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

async fn run_to_exit(config_path: &Path) -> std::process::Output {
    timeout(
        Duration::from_secs(10),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_recwatch"))
            .env("RECWATCH_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_missing_config_writes_template() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config").join("recwatch.toml");

    let result = run_to_exit(&config_path).await;

    assert!(result.status.success());
    let template = std::fs::read_to_string(&config_path).expect("template written");
    assert!(template.contains("[catalog]"));
    assert!(String::from_utf8_lossy(&result.stdout).contains("template"));

    // The untouched template is rejected on the next start
    let result = run_to_exit(&config_path).await;
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("catalog.url"));
}

#[tokio::test]
async fn test_unparseable_config_exits_with_error() {
    let temp_file = write_config("[catalog\nurl = ");

    let result = run_to_exit(temp_file.path()).await;

    assert_eq!(result.status.code(), Some(1));
}

#[tokio::test]
async fn test_invalid_interval_exits_with_error() {
    let temp_file = write_config(
        r#"
[catalog]
url = "http://127.0.0.1:1/items"

[recorder]
interval_secs = 5
"#,
    );

    let result = run_to_exit(temp_file.path()).await;

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("interval"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_capture_program_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let content = config(&unused_url(), dir.path())
        .replace(r#"program = "true""#, r#"program = "/nonexistent/streamlink""#);
    let temp_file = write_config(&content);

    let result = run_to_exit(temp_file.path()).await;

    assert_eq!(result.status.code(), Some(1));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreachable_catalog_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let temp_file = write_config(&config(&unused_url(), dir.path()));

    let result = run_to_exit(temp_file.path()).await;

    assert_eq!(result.status.code(), Some(1));
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_stops_cleanly() {
    let dir = TempDir::new().unwrap();
    let url = spawn_catalog("[]").await;
    let temp_file = write_config(&config(&url, dir.path()));

    let mut daemon = tokio::process::Command::new(env!("CARGO_BIN_EXE_recwatch"))
        .env("RECWATCH_CONFIG", temp_file.path())
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn daemon");

    // Wait for the per-run log file, i.e. startup got past logging init
    let logs = dir.path().join("logs");
    let mut started = false;
    for _ in 0..40 {
        if std::fs::read_dir(&logs).map(|mut d| d.next().is_some()).unwrap_or(false) {
            started = true;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(started, "Daemon did not start in time");
    sleep(Duration::from_millis(500)).await;

    let pid = daemon.id().expect("daemon pid").to_string();
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid])
        .status()
        .unwrap();
    assert!(status.success());

    let exit = timeout(Duration::from_secs(10), daemon.wait())
        .await
        .expect("Daemon did not stop")
        .unwrap();
    assert!(exit.success());

    let run_dir = std::fs::read_dir(&logs).unwrap().next().unwrap().unwrap().path();
    let log = std::fs::read_to_string(run_dir.join("recwatch.log")).unwrap();
    assert!(log.contains("starting"));
}
