use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gasoline_core::error::{ErrorKind, GasolineError, GasolineResult};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::namespace::{Namespace, NamespaceStats, MAX_FILE_BYTES, MAX_NAMESPACE_BYTES};

/// Background flush cadence (spec.md §4.11).
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Write-behind cache in front of a [`Namespace`]: `save`/`delete` land in
/// memory immediately and a `None` pending entry marks a deletion to apply
/// on the next flush. Disk I/O happens only from `flush`.
struct CachedNamespace {
    namespace: Namespace,
    pending: HashMap<String, Option<Value>>,
}

impl CachedNamespace {
    fn pending_total_bytes(&self) -> GasolineResult<u64> {
        self.pending
            .values()
            .filter_map(|v| v.as_ref())
            .map(|v| Ok(serde_json::to_vec(v)?.len() as u64))
            .sum()
    }
}

/// Multi-namespace key/value store. One `KvStore` is shared process-wide;
/// each project gets its own namespace directory under `root`.
pub struct KvStore {
    root: PathBuf,
    namespaces: Mutex<HashMap<String, CachedNamespace>>,
}

impl KvStore {
    pub fn new(root: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            root,
            namespaces: Mutex::new(HashMap::new()),
        })
    }

    async fn open_namespace<'a>(
        guard: &'a mut HashMap<String, CachedNamespace>,
        root: &PathBuf,
        name: &str,
    ) -> GasolineResult<&'a mut CachedNamespace> {
        if !guard.contains_key(name) {
            let namespace = Namespace::open(root, name).await?;
            guard.insert(
                name.to_string(),
                CachedNamespace {
                    namespace,
                    pending: HashMap::new(),
                },
            );
        }
        Ok(guard.get_mut(name).expect("just inserted"))
    }

    /// Stage a write in memory. Validates both caps against the namespace's
    /// on-disk size plus its still-unflushed pending writes, so
    /// `quota_exceeded` is reported synchronously rather than on flush.
    pub async fn save(&self, namespace: &str, key: &str, value: Value) -> GasolineResult<()> {
        let encoded_len = serde_json::to_vec(&value)?.len() as u64;
        if encoded_len > MAX_FILE_BYTES {
            return Err(GasolineError::new(
                ErrorKind::QuotaExceeded,
                format!("value for key '{key}' exceeds the 1 MiB per-file cap"),
            ));
        }

        let mut guard = self.namespaces.lock().await;
        let cached = Self::open_namespace(&mut guard, &self.root, namespace).await?;

        let on_disk = cached.namespace.stats().total_bytes;
        let pending_before = cached.pending_total_bytes()?;
        let existing_pending = cached
            .pending
            .get(key)
            .and_then(|v| v.as_ref())
            .map(|v| serde_json::to_vec(v).map(|b| b.len() as u64))
            .transpose()?
            .unwrap_or(0);
        let projected = on_disk + pending_before - existing_pending + encoded_len;
        if projected > MAX_NAMESPACE_BYTES {
            return Err(GasolineError::new(
                ErrorKind::QuotaExceeded,
                "namespace would exceed the 10 MiB quota",
            ));
        }

        cached.pending.insert(key.to_string(), Some(value));
        Ok(())
    }

    pub async fn load(&self, namespace: &str, key: &str) -> GasolineResult<Option<Value>> {
        let mut guard = self.namespaces.lock().await;
        let cached = Self::open_namespace(&mut guard, &self.root, namespace).await?;
        match cached.pending.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => cached.namespace.load(key).await,
        }
    }

    pub async fn list(&self, namespace: &str) -> GasolineResult<Vec<String>> {
        let mut guard = self.namespaces.lock().await;
        let cached = Self::open_namespace(&mut guard, &self.root, namespace).await?;
        let mut keys: std::collections::BTreeSet<String> = cached.namespace.list().into_iter().collect();
        for (key, pending) in &cached.pending {
            if pending.is_some() {
                keys.insert(key.clone());
            } else {
                keys.remove(key);
            }
        }
        Ok(keys.into_iter().collect())
    }

    pub async fn delete(&self, namespace: &str, key: &str) -> GasolineResult<bool> {
        let mut guard = self.namespaces.lock().await;
        let cached = Self::open_namespace(&mut guard, &self.root, namespace).await?;
        let existed = cached.namespace.list().iter().any(|k| k == key)
            || matches!(cached.pending.get(key), Some(Some(_)));
        cached.pending.insert(key.to_string(), None);
        Ok(existed)
    }

    pub async fn stats(&self, namespace: &str) -> GasolineResult<NamespaceStats> {
        let mut guard = self.namespaces.lock().await;
        let cached = Self::open_namespace(&mut guard, &self.root, namespace).await?;
        let mut stats = cached.namespace.stats();
        stats.total_bytes += cached.pending_total_bytes()?;
        stats.key_count = self.list(namespace).await?.len();
        Ok(stats)
    }

    pub async fn namespace_names(&self) -> Vec<String> {
        let guard = self.namespaces.lock().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    /// Persist every namespace's pending writes and deletions to disk.
    pub async fn flush(&self) -> GasolineResult<()> {
        let mut guard = self.namespaces.lock().await;
        for cached in guard.values_mut() {
            let pending = std::mem::take(&mut cached.pending);
            for (key, value) in pending {
                match value {
                    Some(v) => cached.namespace.save(&key, &v).await?,
                    None => {
                        cached.namespace.delete(&key).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Spawn the 30 s background flush task. Runs until the returned handle
    /// is aborted or the store is dropped.
    pub fn spawn_flush_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(err) = store.flush().await {
                    tracing::warn!(%err, "kv background flush failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_load_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(dir.path().to_path_buf());
        store.save("proj", "a", json!(1)).await.unwrap();
        assert_eq!(store.load("proj", "a").await.unwrap(), Some(json!(1)));
        assert!(store.delete("proj", "a").await.unwrap());
        assert_eq!(store.load("proj", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(dir.path().to_path_buf());
        store.save("a", "k", json!("from-a")).await.unwrap();
        store.save("b", "k", json!("from-b")).await.unwrap();
        assert_eq!(store.load("a", "k").await.unwrap(), Some(json!("from-a")));
        assert_eq!(store.load("b", "k").await.unwrap(), Some(json!("from-b")));
    }

    #[tokio::test]
    async fn stats_reports_key_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(dir.path().to_path_buf());
        store.save("proj", "a", json!(1)).await.unwrap();
        store.save("proj", "b", json!(2)).await.unwrap();
        let stats = store.stats("proj").await.unwrap();
        assert_eq!(stats.key_count, 2);
    }

    #[tokio::test]
    async fn flush_persists_pending_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(dir.path().to_path_buf());
        store.save("proj", "a", json!(1)).await.unwrap();
        store.flush().await.unwrap();

        let reopened = Namespace::open(dir.path(), "proj").await.unwrap();
        assert_eq!(reopened.load("a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn quota_rejects_oversized_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::new(dir.path().to_path_buf());
        let chunk = "x".repeat(1024 * 1024 - 64);
        for i in 0..9 {
            store.save("proj", &format!("k{i}"), json!(chunk)).await.unwrap();
            store.flush().await.unwrap();
        }
        let err = store.save("proj", "overflow", json!(chunk)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    }
}
