//! Descriptor accounting for a cancelled tail. Kept in its own test binary so
//! no other test opens files while the descriptors are counted.
#![cfg(target_os = "linux")]

use std::fs;
use std::time::Duration;
use tail_cgi::{NotifySource, StreamOutcome, serve};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn open_descriptors() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

#[tokio::test]
async fn test_cancel_releases_file_and_watch_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.log"), "abc").unwrap();
    let (server, mut client) = tokio::io::duplex(64 * 1024);
    let baseline = open_descriptors();

    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let root = dir.path().to_path_buf();
    let task =
        tokio::spawn(async move { serve("/app.log", &root, NotifySource, server, &task_cancel).await });

    // Head plus "abc": by then the file is open and the watch is active.
    let mut seen = Vec::new();
    while !seen.ends_with(b"\n\nabc") {
        let byte = tokio::time::timeout(WAIT, client.read_u8())
            .await
            .expect("timed out reading response")
            .unwrap();
        seen.push(byte);
    }
    assert!(
        open_descriptors() >= baseline + 2,
        "file and watch descriptors should be open while streaming"
    );

    cancel.cancel();
    let outcome = tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(outcome, StreamOutcome::Ok);

    // The watcher's event thread closes its descriptor as it shuts down.
    let released = tokio::time::timeout(WAIT, async {
        while open_descriptors() > baseline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        released.is_ok(),
        "descriptors leaked: {} open, {} before",
        open_descriptors(),
        baseline
    );
}
