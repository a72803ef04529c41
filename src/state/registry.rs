//! The live give-away registry.
//!
//! A single process-wide read/write lock guards the map. Every membership
//! change is written to the store while the write lock is still held, so
//! memory and storage never disagree outside the critical section. Callers
//! must render only after the call returns (the lock is released by then).

use super::Giveaway;
use crate::error::{GiveawayError, GiveawayResult};
use crate::metrics;
use crate::store::{GiveawayStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of a participant mutation.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    /// State of the give-away right after the mutation.
    pub snapshot: Giveaway,
    /// Whether the participant list changed (and was persisted).
    pub changed: bool,
}

pub struct Registry {
    giveaways: RwLock<HashMap<String, Giveaway>>,
    store: Arc<dyn GiveawayStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn GiveawayStore>) -> Self {
        Self {
            giveaways: RwLock::new(HashMap::new()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn GiveawayStore> {
        &self.store
    }

    /// Insert a freshly rendered give-away and persist it.
    ///
    /// Returns false (and changes nothing) if the ID is already live.
    pub async fn create(&self, giveaway: Giveaway) -> bool {
        let mut map = self.giveaways.write().await;
        if map.contains_key(&giveaway.id) {
            warn!(giveaway = %giveaway.id, "Refusing to create duplicate giveaway");
            return false;
        }

        if let Err(e) = self.store.put(&giveaway).await {
            warn!(giveaway = %giveaway.id, error = %e, "Failed to persist new giveaway");
        }
        if !giveaway.participants.is_empty()
            && let Err(e) = self
                .store
                .replace_participants(&giveaway.id, &giveaway.participants)
                .await
        {
            warn!(giveaway = %giveaway.id, error = %e, "Failed to persist participants");
        }

        map.insert(giveaway.id.clone(), giveaway);
        metrics::set_active_giveaways(map.len());
        true
    }

    pub async fn get(&self, id: &str) -> Option<Giveaway> {
        self.giveaways.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.giveaways.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.giveaways.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.giveaways.read().await.is_empty()
    }

    /// Apply `f` to a live give-away under the write lock.
    ///
    /// If `f` succeeds and the participant list changed, the new list is
    /// persisted before the lock is released. Persistence failures are
    /// logged; the in-memory change stands.
    pub async fn mutate_participants<T, F>(&self, id: &str, f: F) -> GiveawayResult<Mutation<T>>
    where
        F: FnOnce(&mut Giveaway) -> GiveawayResult<T> + Send,
        T: Send,
    {
        let mut map = self.giveaways.write().await;
        let giveaway = map
            .get_mut(id)
            .ok_or_else(|| GiveawayError::NotFound(id.to_string()))?;

        let before = giveaway.participants.len();
        let value = f(giveaway)?;
        let changed = giveaway.participants.len() != before;

        if changed
            && let Err(e) = self
                .store
                .replace_participants(id, &giveaway.participants)
                .await
        {
            warn!(giveaway = %id, error = %e, "Failed to persist participants");
            metrics::record_store_failure("replace_participants");
        }

        Ok(Mutation {
            value,
            snapshot: giveaway.clone(),
            changed,
        })
    }

    /// Remove a give-away from the map and delete it from storage.
    pub async fn remove(&self, id: &str) -> Option<Giveaway> {
        let mut map = self.giveaways.write().await;
        let giveaway = map.remove(id)?;

        if let Err(e) = self.store.delete(id).await {
            warn!(giveaway = %id, error = %e, "Failed to delete giveaway");
            metrics::record_store_failure("delete");
        }
        metrics::set_active_giveaways(map.len());
        Some(giveaway)
    }

    /// Take a give-away out of the map, finish it with `f`, archive its
    /// final state, and delete the live record.
    ///
    /// The live record is kept in the store when archiving fails.
    ///
    /// Only one caller can ever receive `Some` for a given ID.
    pub async fn remove_with<T, F>(&self, id: &str, f: F) -> Option<(Giveaway, T)>
    where
        F: FnOnce(&mut Giveaway) -> T + Send,
        T: Send,
    {
        let mut map = self.giveaways.write().await;
        let mut giveaway = map.remove(id)?;
        let value = f(&mut giveaway);

        match self.store.archive(&giveaway).await {
            Ok(()) => {
                if let Err(e) = self.store.delete(id).await {
                    warn!(giveaway = %id, error = %e, "Failed to delete closed giveaway");
                    metrics::record_store_failure("delete");
                }
            }
            // The live record is the only durable copy left
            Err(e) => {
                warn!(
                    giveaway = %id,
                    error = %e,
                    "Failed to archive closed giveaway, keeping live record"
                );
                metrics::record_store_failure("archive");
            }
        }
        metrics::set_active_giveaways(map.len());
        Some((giveaway, value))
    }

    /// Snapshot of the live give-aways matching `predicate`, in no
    /// particular order.
    pub async fn list_active<P>(&self, predicate: P) -> Vec<Giveaway>
    where
        P: Fn(&Giveaway) -> bool,
    {
        self.giveaways
            .read()
            .await
            .values()
            .filter(|g| predicate(g))
            .cloned()
            .collect()
    }

    /// Repopulate the map from storage at startup.
    ///
    /// Give-aways already past their deadline at `now` are deleted from
    /// storage and never enter the map. Returns the restored give-aways.
    pub async fn restore(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, StoreError> {
        let stored = self.store.load_all().await?;
        let mut map = self.giveaways.write().await;
        let mut restored = Vec::new();

        for giveaway in stored {
            if giveaway.is_expired(now) {
                debug!(giveaway = %giveaway.id, "Dropping giveaway that expired while offline");
                if let Err(e) = self.store.delete(&giveaway.id).await {
                    warn!(giveaway = %giveaway.id, error = %e, "Failed to delete expired giveaway");
                }
                continue;
            }
            map.insert(giveaway.id.clone(), giveaway.clone());
            restored.push(giveaway);
        }

        metrics::set_active_giveaways(map.len());
        info!(count = restored.len(), "Restored live giveaways");
        Ok(restored)
    }
}
