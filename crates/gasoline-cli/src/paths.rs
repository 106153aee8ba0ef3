//! On-disk layout (spec.md §6): pid file, KV root, debug log.

use std::path::PathBuf;

/// `GASOLINE_STATE_DIR`, falling back to the user's home directory.
pub fn state_dir() -> PathBuf {
    std::env::var_os("GASOLINE_STATE_DIR")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.gasoline-<port>.pid` — single line decimal pid, best-effort, may be stale.
pub fn pid_file_path(port: u16) -> PathBuf {
    state_dir().join(format!(".gasoline-{port}.pid"))
}

/// `<state>/kv/` — root for the persistent key/value store.
pub fn kv_root() -> PathBuf {
    state_dir().join("kv")
}

/// `<state>/logs.jsonl` — optional append-only startup/shutdown debug log.
pub fn debug_log_path() -> PathBuf {
    state_dir().join("logs.jsonl")
}
