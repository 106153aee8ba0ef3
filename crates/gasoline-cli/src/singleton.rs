//! The singleton daemon bridge (spec.md §4.9): pid-file inspection, health
//! probing, fast-fail bind, and the exponential-backoff reconnect race.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tokio::net::TcpListener;

const BIND_FAST_FAIL: Duration = Duration::from_secs(4);
const BACKOFF_START: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_millis(2000);
const BACKOFF_MAX_TRIES: u32 = 10;
const BACKOFF_MAX_ELAPSED: Duration = Duration::from_secs(6);

/// Result of probing `GET /health` on an existing daemon.
#[derive(Debug, PartialEq, Eq)]
pub enum ProbeResult {
    /// Reachable and `server_version` matches ours.
    Matching,
    /// Reachable but running a different version.
    VersionMismatch,
    /// Not reachable at all (dead process, nothing bound, timeout).
    Unreachable,
}

/// `GET http://127.0.0.1:<port>/health` and compare `server_version`.
/// Shared by the bridge's step 1–2 and by `--check`
/// (`gasoline_cli::singleton::probe_existing_daemon`, spec.md §10).
pub async fn probe_existing_daemon(port: u16, expected_version: &str) -> ProbeResult {
    let url = format!("http://127.0.0.1:{port}/health");
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
        Ok(client) => client,
        Err(_) => return ProbeResult::Unreachable,
    };

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(_) => return ProbeResult::Unreachable,
    };

    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(_) => return ProbeResult::Unreachable,
    };

    match body.get("server_version").and_then(|v| v.as_str()) {
        Some(version) if version == expected_version => ProbeResult::Matching,
        Some(_) => ProbeResult::VersionMismatch,
        None => ProbeResult::Unreachable,
    }
}

/// Reads a single decimal pid from the pid file, if present and parseable.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with this pid currently exists (best-effort; a pid
/// can be recycled, which is why the caller always also checks /health).
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    // Signal 0 performs no action but still validates the pid (man kill(2)).
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

/// Writes the pid atomically: write to a sibling temp file, then rename
/// over the target (spec.md §4.9 step 4).
pub fn write_pid_atomic(path: &Path, pid: u32) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("pid.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        write!(file, "{pid}")?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

pub fn remove_pid_file(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Sends SIGTERM to a running daemon's pid, per `--stop`.
#[cfg(unix)]
pub fn send_sigterm(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
pub fn send_sigterm(_pid: u32) -> bool {
    false
}

/// Attempts to bind the TCP listener within [`BIND_FAST_FAIL`]. `Ok(None)`
/// means the deadline elapsed without the underlying bind call returning
/// (itself be treated as "port busy" for the purposes of fast-fail).
pub async fn bind_with_fast_fail(port: u16) -> std::io::Result<Option<TcpListener>> {
    let addr = format!("127.0.0.1:{port}");
    match tokio::time::timeout(BIND_FAST_FAIL, TcpListener::bind(&addr)).await {
        Ok(Ok(listener)) => Ok(Some(listener)),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::AddrInUse => Ok(None),
        Ok(Err(err)) => Err(err),
        Err(_) => Ok(None),
    }
}

/// Races a reconnect against the winning spawner: exponential backoff
/// starting at [`BACKOFF_START`], doubling up to [`BACKOFF_CAP`], at most
/// [`BACKOFF_MAX_TRIES`] attempts within [`BACKOFF_MAX_ELAPSED`] (spec.md
/// §4.9 step 5). Returns `true` once a matching-version daemon answers.
pub async fn race_reconnect(port: u16, expected_version: &str) -> bool {
    let deadline = tokio::time::Instant::now() + BACKOFF_MAX_ELAPSED;
    let mut delay = BACKOFF_START;

    for _ in 0..BACKOFF_MAX_TRIES {
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(delay).await;
        if probe_existing_daemon(port, expected_version).await == ProbeResult::Matching {
            return true;
        }
        delay = std::cmp::min(delay * 2, BACKOFF_CAP);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gasoline-7890.pid");
        write_pid_atomic(&path, 4242).unwrap();
        assert_eq!(read_pid(&path), Some(4242));
    }

    #[test]
    fn missing_pid_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gasoline-7890.pid");
        assert_eq!(read_pid(&path), None);
    }

    #[test]
    fn unparseable_pid_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gasoline-7890.pid");
        std::fs::write(&path, "not-a-pid").unwrap();
        assert_eq!(read_pid(&path), None);
    }

    #[tokio::test]
    async fn unreachable_port_probes_as_unreachable() {
        // Nothing is listening on this high port in the test sandbox.
        let result = probe_existing_daemon(1, "0.0.0.0").await;
        assert_eq!(result, ProbeResult::Unreachable);
    }

    #[tokio::test]
    async fn binding_a_free_ephemeral_port_succeeds() {
        let listener = bind_with_fast_fail(0).await.unwrap();
        assert!(listener.is_some());
    }
}
