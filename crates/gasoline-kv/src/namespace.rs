use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gasoline_core::error::{ErrorKind, GasolineError, GasolineResult};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

/// Per-file cap: one key's JSON value, on disk.
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
/// Per-namespace cap across all keys.
pub const MAX_NAMESPACE_BYTES: u64 = 10 * 1024 * 1024;

fn key_file_name(key: &str) -> String {
    format!("{key}.json")
}

/// Usage summary returned by `stats`.
#[derive(Debug, Clone)]
pub struct NamespaceStats {
    pub key_count: usize,
    pub total_bytes: u64,
    pub max_namespace_bytes: u64,
}

/// One project-local bounded key/value namespace. Each namespace owns its
/// own directory; namespaces never see or overwrite each other's keys.
pub struct Namespace {
    dir: PathBuf,
    sizes: HashMap<String, u64>,
}

impl Namespace {
    /// Opens (creating if absent) the namespace directory and indexes
    /// existing key sizes.
    pub async fn open(root: &Path, name: &str) -> GasolineResult<Self> {
        let dir = root.join(sanitize_namespace(name));
        tokio::fs::create_dir_all(&dir).await?;

        let mut sizes = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            sizes.insert(stem.to_string(), metadata.len());
        }

        Ok(Self { dir, sizes })
    }

    fn total_bytes(&self) -> u64 {
        self.sizes.values().sum()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key_file_name(key))
    }

    /// Persist `value` under `key`, write-then-rename for crash safety.
    /// Returns `quota_exceeded` if the write would breach either cap.
    pub async fn save(&mut self, key: &str, value: &Value) -> GasolineResult<()> {
        let encoded = serde_json::to_vec(value)?;
        let new_size = encoded.len() as u64;
        if new_size > MAX_FILE_BYTES {
            return Err(GasolineError::new(
                ErrorKind::QuotaExceeded,
                format!("value for key '{key}' exceeds the 1 MiB per-file cap"),
            ));
        }
        let existing = self.sizes.get(key).copied().unwrap_or(0);
        let projected_total = self.total_bytes() - existing + new_size;
        if projected_total > MAX_NAMESPACE_BYTES {
            return Err(GasolineError::new(
                ErrorKind::QuotaExceeded,
                "namespace would exceed the 10 MiB quota",
            ));
        }

        let final_path = self.path_for(key);
        let temp_path = self.dir.join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        tokio::fs::rename(&temp_path, &final_path).await?;

        self.sizes.insert(key.to_string(), new_size);
        Ok(())
    }

    pub async fn load(&self, key: &str) -> GasolineResult<Option<Value>> {
        if !self.sizes.contains_key(key) {
            return Ok(None);
        }
        let bytes = tokio::fs::read(self.path_for(key)).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sizes.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn delete(&mut self, key: &str) -> GasolineResult<bool> {
        if self.sizes.remove(key).is_none() {
            return Ok(false);
        }
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    pub fn stats(&self) -> NamespaceStats {
        NamespaceStats {
            key_count: self.sizes.len(),
            total_bytes: self.total_bytes(),
            max_namespace_bytes: MAX_NAMESPACE_BYTES,
        }
    }
}

/// Namespace names become directory names; keep them to a safe subset.
fn sanitize_namespace(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = Namespace::open(dir.path(), "proj").await.unwrap();
        ns.save("a", &json!({"x": 1})).await.unwrap();
        let loaded = ns.load("a").await.unwrap();
        assert_eq!(loaded, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = Namespace::open(dir.path(), "proj").await.unwrap();
        ns.save("b", &json!(1)).await.unwrap();
        ns.save("a", &json!(2)).await.unwrap();
        assert_eq!(ns.list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = Namespace::open(dir.path(), "proj").await.unwrap();
        ns.save("a", &json!(1)).await.unwrap();
        assert!(ns.delete("a").await.unwrap());
        assert_eq!(ns.load("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_value_is_quota_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = Namespace::open(dir.path(), "proj").await.unwrap();
        let huge = "x".repeat((MAX_FILE_BYTES + 1) as usize);
        let err = ns.save("a", &json!(huge)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    }

    #[tokio::test]
    async fn namespaces_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = Namespace::open(dir.path(), "proj-a").await.unwrap();
        let mut b = Namespace::open(dir.path(), "proj-b").await.unwrap();
        a.save("shared", &json!("from-a")).await.unwrap();
        b.save("shared", &json!("from-b")).await.unwrap();
        assert_eq!(a.load("shared").await.unwrap(), Some(json!("from-a")));
        assert_eq!(b.load("shared").await.unwrap(), Some(json!("from-b")));
    }

    #[tokio::test]
    async fn reopen_reindexes_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut ns = Namespace::open(dir.path(), "proj").await.unwrap();
            ns.save("a", &json!(1)).await.unwrap();
        }
        let ns = Namespace::open(dir.path(), "proj").await.unwrap();
        assert_eq!(ns.list(), vec!["a".to_string()]);
    }
}
