//! Persistence adapter abstraction.
//!
//! The engine only needs plain CRUD on give-aways and their participant
//! lists; business rules stay out of the store.

use crate::db::DbError;
use crate::state::Giveaway;
use async_trait::async_trait;
use thiserror::Error;

pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

#[async_trait]
pub trait GiveawayStore: Send + Sync {
    /// Insert a new give-away record (participants are written separately).
    async fn put(&self, giveaway: &Giveaway) -> Result<(), StoreError>;

    /// Atomically replace the full participant list of a give-away.
    async fn replace_participants(&self, id: &str, participants: &[String])
    -> Result<(), StoreError>;

    /// Load every live give-away together with its participants.
    async fn load_all(&self) -> Result<Vec<Giveaway>, StoreError>;

    /// Delete a live give-away and its participants.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Record (or overwrite) the final state of a closed give-away.
    async fn archive(&self, giveaway: &Giveaway) -> Result<(), StoreError>;

    /// Look up a closed give-away.
    async fn load_archived(&self, id: &str) -> Result<Option<Giveaway>, StoreError>;
}
