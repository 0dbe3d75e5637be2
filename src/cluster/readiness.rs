//! Bounded readiness probes.
//!
//! Each probe polls its condition with exponential backoff until it holds or
//! the deadline passes. A timed-out probe reports failure to the caller,
//! which turns it into a typed startup error; nothing here sleeps for a
//! fixed amount and hopes.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

const BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Poll `check` until it returns true or `timeout` elapses. The pause
/// between attempts starts at `initial` and doubles up to one second.
pub async fn poll_until<F, Fut>(mut check: F, timeout: Duration, initial: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    let mut pause = initial.max(Duration::from_millis(1));

    loop {
        if check().await {
            return true;
        }
        if Instant::now() + pause > deadline {
            return false;
        }
        tokio::time::sleep(pause).await;
        pause = (pause * 2).min(BACKOFF_CAP);
    }
}

/// The scheduler is ready once its listen socket accepts a connection.
pub async fn wait_for_tcp(addr: &str, timeout: Duration, initial: Duration) -> bool {
    poll_until(
        move || async move { tokio::net::TcpStream::connect(addr).await.is_ok() },
        timeout,
        initial,
    )
    .await
}

/// The rendezvous server is ready once the coordination file exists and is
/// non-empty.
pub async fn wait_for_file(path: &Path, timeout: Duration, initial: Duration) -> bool {
    poll_until(
        move || async move {
            match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len() > 0,
                Err(_) => false,
            }
        },
        timeout,
        initial,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn poll_until_retries_until_true() {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let ready = poll_until(
            move || async move { counter.fetch_add(1, Ordering::SeqCst) >= 2 },
            Duration::from_secs(2),
            FAST,
        )
        .await;
        assert!(ready);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_until_times_out() {
        let ready = poll_until(|| async { false }, Duration::from_millis(30), FAST).await;
        assert!(!ready);
    }

    #[tokio::test]
    async fn tcp_probe_finds_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(wait_for_tcp(&addr, Duration::from_secs(2), FAST).await);
    }

    #[tokio::test]
    async fn tcp_probe_gives_up_without_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(!wait_for_tcp(&addr, Duration::from_millis(50), FAST).await);
    }

    #[tokio::test]
    async fn file_probe_requires_nonempty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");

        assert!(!wait_for_file(&path, Duration::from_millis(30), FAST).await);

        std::fs::write(&path, "").unwrap();
        assert!(!wait_for_file(&path, Duration::from_millis(30), FAST).await);

        std::fs::write(&path, "addr\n").unwrap();
        assert!(wait_for_file(&path, Duration::from_secs(2), FAST).await);
    }
}
