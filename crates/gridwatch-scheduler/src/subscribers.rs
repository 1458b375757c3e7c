//! Subscriber registry: who gets notified.
//!
//! In memory by default; when a subscribers file is configured every mutation
//! is mirrored to it as pretty JSON. File problems are logged, never fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gridwatch_core::{Result, Subscriber, UserId};
use tokio::sync::RwLock;

/// JSON file mirror of the registry.
pub struct SubscriberStore {
    path: PathBuf,
}

impl SubscriberStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, subscribers: &[Subscriber]) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(subscribers)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!("💾 Saved {} subscribers to {}", subscribers.len(), self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Vec<Subscriber> {
        if !self.path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse {}: {e}", self.path.display());
                Vec::new()
            }),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }
}

#[derive(Default)]
pub struct SubscriberRegistry {
    entries: RwLock<HashMap<UserId, Subscriber>>,
    store: Option<SubscriberStore>,
}

impl SubscriberRegistry {
    /// Memory-only registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry mirrored to `store`, seeded with whatever the file holds.
    pub fn with_store(store: SubscriberStore) -> Self {
        let loaded = store.load();
        tracing::info!("👥 Loaded {} subscribers from {}", loaded.len(), store.path().display());
        let entries = loaded.into_iter().map(|s| (s.user_id, s)).collect();
        Self {
            entries: RwLock::new(entries),
            store: Some(store),
        }
    }

    /// Add `user` with notifications enabled. Idempotent: an existing record,
    /// including its preference, is left untouched.
    ///
    /// Returns true when the user was newly created.
    pub async fn register(&self, user: UserId) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&user) {
            return false;
        }
        entries.insert(
            user,
            Subscriber {
                user_id: user,
                notifications_enabled: true,
            },
        );
        tracing::info!("👤 Registered subscriber {user}");
        self.persist(&entries);
        true
    }

    /// Set the notification preference, creating the record if needed.
    pub async fn set_enabled(&self, user: UserId, enabled: bool) {
        let mut entries = self.entries.write().await;
        entries
            .entry(user)
            .and_modify(|s| s.notifications_enabled = enabled)
            .or_insert(Subscriber {
                user_id: user,
                notifications_enabled: enabled,
            });
        tracing::info!("🔔 Notifications for {user}: {}", if enabled { "on" } else { "off" });
        self.persist(&entries);
    }

    /// False for users never seen.
    pub async fn is_enabled(&self, user: UserId) -> bool {
        self.entries
            .read()
            .await
            .get(&user)
            .is_some_and(|s| s.notifications_enabled)
    }

    pub async fn get(&self, user: UserId) -> Option<Subscriber> {
        self.entries.read().await.get(&user).copied()
    }

    /// All subscribers, ordered by user id.
    pub async fn subscribers(&self) -> Vec<Subscriber> {
        let mut all: Vec<_> = self.entries.read().await.values().copied().collect();
        all.sort_by_key(|s| s.user_id);
        all
    }

    pub async fn enabled_subscribers(&self) -> Vec<Subscriber> {
        let mut enabled: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|s| s.notifications_enabled)
            .copied()
            .collect();
        enabled.sort_by_key(|s| s.user_id);
        enabled
    }

    /// Called with the write lock held so file order matches mutation order.
    fn persist(&self, entries: &HashMap<UserId, Subscriber>) {
        let Some(store) = &self.store else {
            return;
        };
        let mut all: Vec<_> = entries.values().copied().collect();
        all.sort_by_key(|s| s.user_id);
        if let Err(e) = store.save(&all) {
            tracing::warn!("⚠️ Failed to save subscribers: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = SubscriberRegistry::new();
        assert!(registry.register(7).await);
        assert!(!registry.register(7).await);
        assert_eq!(registry.subscribers().await.len(), 1);
        assert!(registry.is_enabled(7).await);
    }

    #[tokio::test]
    async fn test_register_keeps_existing_preference() {
        let registry = SubscriberRegistry::new();
        registry.register(7).await;
        registry.set_enabled(7, false).await;
        assert!(!registry.register(7).await);
        assert!(!registry.is_enabled(7).await);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_enabled() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.is_enabled(42).await);
        assert!(registry.get(42).await.is_none());
    }

    #[tokio::test]
    async fn test_set_enabled_creates_record() {
        let registry = SubscriberRegistry::new();
        registry.set_enabled(5, true).await;
        assert_eq!(
            registry.get(5).await,
            Some(Subscriber {
                user_id: 5,
                notifications_enabled: true
            })
        );
    }

    #[tokio::test]
    async fn test_enabled_subscribers_filters() {
        let registry = SubscriberRegistry::new();
        registry.register(1).await;
        registry.register(2).await;
        registry.register(3).await;
        registry.set_enabled(2, false).await;

        let ids: Vec<_> = registry.enabled_subscribers().await.iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_file_mirror_survives_restart() {
        let dir = std::env::temp_dir().join("gridwatch-test-subscribers");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("subscribers.json");

        {
            let registry = SubscriberRegistry::with_store(SubscriberStore::new(&path));
            registry.register(10).await;
            registry.register(11).await;
            registry.set_enabled(11, false).await;
        }

        let reloaded = SubscriberRegistry::with_store(SubscriberStore::new(&path));
        assert!(reloaded.is_enabled(10).await);
        assert!(!reloaded.is_enabled(11).await);
        assert_eq!(reloaded.subscribers().await.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = std::env::temp_dir().join("gridwatch-test-subscribers-corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("subscribers.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(SubscriberStore::new(&path).load().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
