use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::Session;

const CLEANUP_THRESHOLD: usize = 1000;

/// Where sessions live between requests.
#[async_trait]
pub trait SessionBackend: Send + Sync + fmt::Debug {
    async fn load(&self, id: &str) -> Result<Option<Session>>;
    async fn save(&self, id: &str, session: Session) -> Result<()>;
    /// `true` when a session was removed.
    async fn remove(&self, id: &str) -> Result<bool>;
    async fn len(&self) -> Result<usize>;
}

struct Entry {
    session: Session,
    last_access: Instant,
}

/// Process-local backend. Sessions idle for longer than the TTL are dropped.
///
/// A sweep runs once the table outgrows `next_cleanup`, which then moves to
/// twice the surviving size.
pub struct InMemorySessionBackend {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
    next_cleanup: AtomicUsize,
}

impl fmt::Debug for InMemorySessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySessionBackend")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl InMemorySessionBackend {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            next_cleanup: AtomicUsize::new(CLEANUP_THRESHOLD),
        }
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.ttl
            .map(|ttl| entry.last_access.elapsed() > ttl)
            .unwrap_or(false)
    }

    fn cleanup(&self, entries: &mut HashMap<String, Entry>) {
        let before = entries.len();
        entries.retain(|_, entry| !self.expired(entry));
        info!(
            "Evicted {} idle sessions, {} remaining",
            before - entries.len(),
            entries.len()
        );
        self.next_cleanup.store(
            CLEANUP_THRESHOLD.max(entries.len() * 2),
            Ordering::Relaxed,
        );
    }

    fn lock_error() -> ApiError {
        ApiError::InternalError("session table lock poisoned".to_string())
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn load(&self, id: &str) -> Result<Option<Session>> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        let Some(entry) = entries.get_mut(id) else {
            return Ok(None);
        };
        if self.expired(entry) {
            debug!("Session {} expired", id);
            entries.remove(id);
            return Ok(None);
        }
        entry.last_access = Instant::now();
        Ok(Some(entry.session.clone()))
    }

    async fn save(&self, id: &str, session: Session) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        entries.insert(
            id.to_string(),
            Entry {
                session,
                last_access: Instant::now(),
            },
        );
        if self.ttl.is_some() && entries.len() > self.next_cleanup.load(Ordering::Relaxed) {
            self.cleanup(&mut entries);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        Ok(entries.remove(id).is_some())
    }

    async fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(|_| Self::lock_error())?;
        Ok(entries.len())
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Session not found".to_string())
}

/// Session table shared by every request handler. Each read-modify-write
/// runs under one async lock.
#[derive(Debug, Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory(ttl: Option<Duration>) -> Self {
        Self::new(Arc::new(InMemorySessionBackend::new(ttl)))
    }

    /// Store a new session under a fresh `session_<32 hex>` id.
    pub async fn create(&self, session: Session) -> Result<String> {
        let _guard = self.lock.lock().await;
        loop {
            let id = format!("session_{}", Uuid::new_v4().simple());
            if self.backend.load(&id).await?.is_none() {
                self.backend.save(&id, session).await?;
                info!("🆕 Created {}", id);
                return Ok(id);
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Session> {
        let _guard = self.lock.lock().await;
        self.backend.load(id).await?.ok_or_else(not_found)
    }

    pub async fn modify<R, F>(&self, id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R + Send,
    {
        let _guard = self.lock.lock().await;
        let mut session = self.backend.load(id).await?.ok_or_else(not_found)?;
        let result = f(&mut session);
        self.backend.save(id, session).await?;
        Ok(result)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if self.backend.remove(id).await? {
            info!("🗑️ Deleted {}", id);
            Ok(())
        } else {
            Err(not_found())
        }
    }

    pub async fn len(&self) -> Result<usize> {
        self.backend.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParsedRecipe;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_ids_are_unique_and_well_formed() {
        let store = SessionStore::in_memory(None);
        let mut ids = HashSet::new();
        for _ in 0..50 {
            let id = store.create(Session::new("prefs".into())).await.unwrap();
            assert!(id.starts_with("session_"));
            assert_eq!(id.len(), "session_".len() + 32);
            assert!(id["session_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
            assert!(ids.insert(id));
        }
        assert_eq!(store.len().await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_modify_persists_changes() {
        let store = SessionStore::in_memory(None);
        let id = store.create(Session::new("prefs".into())).await.unwrap();

        let total = store
            .modify(&id, |s| {
                s.load_recipe(
                    "Dal",
                    ParsedRecipe {
                        steps: vec!["STEP 1: boil".into()],
                        ..ParsedRecipe::default()
                    },
                );
                s.total_steps()
            })
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(store.get(&id).await.unwrap().current_recipe.as_deref(), Some("Dal"));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let store = SessionStore::in_memory(None);
        let id = store.create(Session::new("prefs".into())).await.unwrap();

        assert!(matches!(store.delete("session_nope").await, Err(ApiError::NotFound(_))));
        assert_eq!(store.len().await.unwrap(), 1);

        store.delete(&id).await.unwrap();
        assert!(matches!(store.get(&id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::in_memory(Some(Duration::from_millis(20)));
        let id = store.create(Session::new("prefs".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(store.get(&id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sweep_threshold_grows_with_live_sessions() {
        let backend = InMemorySessionBackend::new(Some(Duration::from_secs(3600)));
        for i in 0..=CLEANUP_THRESHOLD {
            backend
                .save(&format!("session_{}", i), Session::new("prefs".into()))
                .await
                .unwrap();
        }
        let next = 2 * (CLEANUP_THRESHOLD + 1);
        assert_eq!(backend.next_cleanup.load(Ordering::Relaxed), next);

        backend
            .save("session_extra", Session::new("prefs".into()))
            .await
            .unwrap();
        assert_eq!(backend.next_cleanup.load(Ordering::Relaxed), next);
        assert_eq!(backend.len().await.unwrap(), CLEANUP_THRESHOLD + 2);
    }
}
