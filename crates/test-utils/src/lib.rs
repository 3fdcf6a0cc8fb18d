pub mod builders;

use std::fs;
use std::path::Path;
use std::sync::Once;

use fpga_flow::engine::LOG_FILE_NAME;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Contents of `logfile.txt` in a job work directory, or an empty string.
pub fn read_log(work_dir: &Path) -> String {
    fs::read_to_string(work_dir.join(LOG_FILE_NAME)).unwrap_or_default()
}

/// Message lines of the run log with the `FPGA HH:MM:SS [cfg] ` prefix removed.
pub fn log_messages(work_dir: &Path) -> Vec<String> {
    read_log(work_dir)
        .lines()
        .map(|line| match line.find("] ") {
            Some(pos) => line[pos + 2..].to_string(),
            None => line.to_string(),
        })
        .collect()
}

/// Contents of the `OK`/`ERROR`/`TIMEOUT` marker file, if present.
pub fn read_marker(work_dir: &Path, status: &str) -> Option<String> {
    fs::read_to_string(work_dir.join(status)).ok()
}
