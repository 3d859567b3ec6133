#![cfg(unix)]

use std::process::Command;
use std::time::Duration;
use tokio::time::timeout;
use user_event_relay::shutdown::shutdown_signal;

#[tokio::test]
async fn test_sigterm_requests_shutdown() {
    let signal = shutdown_signal().unwrap();
    tokio::pin!(signal);

    assert!(
        timeout(Duration::from_millis(100), &mut signal).await.is_err(),
        "shutdown must wait for a signal"
    );

    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    assert!(
        timeout(Duration::from_secs(5), &mut signal).await.is_ok(),
        "SIGTERM did not complete the shutdown future"
    );
}
