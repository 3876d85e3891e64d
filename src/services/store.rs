use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ThemeError;
use crate::schedule::Mode;

pub const KEY_MODE: &str = "mode";
pub const KEY_LAST_UPDATE: &str = "last-update";
pub const KEY_OVERRIDE: &str = "manual-override";
pub const KEY_OVERRIDE_UNTIL: &str = "manual-until";

/// Flat key-value persistence. One backend is chosen at construction time;
/// call sites never branch on which backing store is present.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, ThemeError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), ThemeError>;
    async fn remove(&self, key: &str) -> Result<(), ThemeError>;
}

/// Volatile backend for tests and degraded operation.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, ThemeError> {
        self.map
            .lock()
            .map_err(|_| ThemeError::Storage("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, ThemeError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), ThemeError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ThemeError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Durable backend: a single JSON object persisted with the atomic
/// tmp-then-rename pattern. Concurrent writers are last-write-wins, which is
/// acceptable because every writer converges on the same schedule-computed
/// value.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> Result<HashMap<String, Value>, ThemeError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| ThemeError::Storage(format!("invalid state file: {}", e)))
    }

    fn write_map(&self, map: &HashMap<String, Value>) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| ThemeError::Storage(format!("serialize state: {}", e)))?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, ThemeError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), ThemeError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    async fn remove(&self, key: &str) -> Result<(), ThemeError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Theme state on top of a storage backend.
///
/// When the backend fails the store logs the condition once and keeps
/// operating against an in-memory fallback for the rest of the session, so
/// visible theming behavior is unaffected; only persistence across restarts
/// is lost.
pub struct ThemeStore {
    backend: Box<dyn StorageBackend>,
    fallback: MemoryBackend,
    degraded: AtomicBool,
}

impl ThemeStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            fallback: MemoryBackend::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn mark_degraded(&self, err: &ThemeError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            log::warn!(
                "storage unavailable, continuing in-memory for this session: {}",
                err
            );
        }
    }

    async fn get(&self, key: &str) -> Option<Value> {
        if !self.is_degraded() {
            match self.backend.get(key).await {
                Ok(value) => return value,
                Err(e) => self.mark_degraded(&e),
            }
        }
        self.fallback.get(key).await.ok().flatten()
    }

    async fn set(&self, key: &str, value: Value) {
        // The fallback mirrors every write so a mid-session backend failure
        // does not lose state already written.
        let _ = self.fallback.set(key, value.clone()).await;
        if !self.is_degraded() {
            if let Err(e) = self.backend.set(key, value).await {
                self.mark_degraded(&e);
            }
        }
    }

    async fn remove(&self, key: &str) {
        let _ = self.fallback.remove(key).await;
        if !self.is_degraded() {
            if let Err(e) = self.backend.remove(key).await {
                self.mark_degraded(&e);
            }
        }
    }

    /// Last mode actually applied, if any.
    pub async fn current_mode(&self) -> Option<Mode> {
        let value = self.get(KEY_MODE).await?;
        value.as_str().and_then(|s| Mode::parse(s).ok())
    }

    /// Persists the applied mode and timestamps the write.
    pub async fn set_current_mode(&self, mode: Mode, now_ms: i64) {
        self.set(KEY_MODE, Value::from(mode.as_str())).await;
        self.set(KEY_LAST_UPDATE, Value::from(now_ms)).await;
    }

    /// True iff an override record exists, is flagged active, and has not
    /// expired. Absence of the record means no override.
    pub async fn is_override_active(&self, now_ms: i64) -> bool {
        let active = self
            .get(KEY_OVERRIDE)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !active {
            return false;
        }
        match self.get(KEY_OVERRIDE_UNTIL).await.and_then(|v| v.as_i64()) {
            Some(until) => now_ms < until,
            None => false,
        }
    }

    /// Pins `mode` for `duration_ms`, updating the stored mode as well.
    pub async fn set_override(&self, mode: Mode, duration_ms: i64, now_ms: i64) {
        self.set(KEY_OVERRIDE, Value::from(true)).await;
        self.set(KEY_OVERRIDE_UNTIL, Value::from(now_ms + duration_ms))
            .await;
        self.set_current_mode(mode, now_ms).await;
    }

    /// Removes the override flag and expiry. Does not touch the stored mode;
    /// the caller is expected to re-evaluate the schedule immediately.
    pub async fn clear_override(&self) {
        self.remove(KEY_OVERRIDE).await;
        self.remove(KEY_OVERRIDE_UNTIL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_mode_round_trip() {
        let store = ThemeStore::in_memory();
        assert_eq!(store.current_mode().await, None);
        for mode in Mode::ALL {
            store.set_current_mode(mode, 1_000).await;
            assert_eq!(store.current_mode().await, Some(mode));
        }
    }

    #[tokio::test]
    async fn test_override_window() {
        let store = ThemeStore::in_memory();
        let now = 1_700_000_000_000;
        let duration = 60_000;
        store.set_override(Mode::Night, duration, now).await;

        assert!(store.is_override_active(now).await);
        assert!(store.is_override_active(now + duration - 1).await);
        assert!(!store.is_override_active(now + duration + 1).await);
        assert_eq!(store.current_mode().await, Some(Mode::Night));
    }

    #[tokio::test]
    async fn test_clear_override_keeps_mode() {
        let store = ThemeStore::in_memory();
        store.set_override(Mode::Evening, 60_000, 0).await;
        store.clear_override().await;
        assert!(!store.is_override_active(1).await);
        // Stored mode untouched; caller re-applies the schedule.
        assert_eq!(store.current_mode().await, Some(Mode::Evening));
    }

    #[tokio::test]
    async fn test_missing_keys_are_defaults() {
        let store = ThemeStore::in_memory();
        assert!(!store.is_override_active(0).await);
        assert_eq!(store.current_mode().await, None);
    }

    #[tokio::test]
    async fn test_file_backend_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        {
            let store = ThemeStore::new(Box::new(FileBackend::new(path.clone())));
            store.set_current_mode(Mode::Day, 42).await;
        }
        let store = ThemeStore::new(Box::new(FileBackend::new(path)));
        assert_eq!(store.current_mode().await, Some(Mode::Day));
    }

    #[tokio::test]
    async fn test_degrades_to_memory_on_storage_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // Parent "directory" is a file, so every write fails.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("state.json");

        let store = ThemeStore::new(Box::new(FileBackend::new(path)));
        store.set_current_mode(Mode::Night, 7).await;
        assert!(store.is_degraded());
        // Session behavior unaffected.
        assert_eq!(store.current_mode().await, Some(Mode::Night));
    }
}
