//! SQLite-backed give-away store.

use super::{GiveawayStore, StoreError};
use crate::db::{ArchivedGiveawayRow, Database, GiveawayRow};
use crate::state::Giveaway;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

fn to_row(giveaway: &Giveaway) -> GiveawayRow {
    GiveawayRow {
        id: giveaway.id.clone(),
        guild_id: giveaway.guild_id.clone(),
        title: giveaway.title.clone(),
        end_time: giveaway.deadline.timestamp(),
        role_id: giveaway.required_role.clone().unwrap_or_default(),
        channel_id: giveaway.channel_id.clone(),
        message_id: giveaway.message_id.clone(),
        winners: i64::from(giveaway.winners),
    }
}

fn from_row(row: GiveawayRow, participants: Vec<String>) -> Result<Giveaway, StoreError> {
    let deadline =
        DateTime::<Utc>::from_timestamp(row.end_time, 0).ok_or_else(|| StoreError::Corrupt {
            id: row.id.clone(),
            reason: format!("end_time {} out of range", row.end_time),
        })?;

    Ok(Giveaway {
        id: row.id,
        guild_id: row.guild_id,
        channel_id: row.channel_id,
        message_id: row.message_id,
        title: row.title,
        deadline,
        required_role: Some(row.role_id).filter(|r| !r.is_empty()),
        participants,
        excluded: Vec::new(),
        winners: u32::try_from(row.winners).unwrap_or(1).max(1),
    })
}

fn decode_list(id: &str, field: &str, json: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: format!("{field}: {e}"),
    })
}

fn encode_list(list: &[String]) -> String {
    // A list of strings always serializes
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

#[async_trait]
impl GiveawayStore for Database {
    async fn put(&self, giveaway: &Giveaway) -> Result<(), StoreError> {
        self.giveaways().insert(&to_row(giveaway)).await?;
        Ok(())
    }

    async fn replace_participants(
        &self,
        id: &str,
        participants: &[String],
    ) -> Result<(), StoreError> {
        self.giveaways()
            .replace_participants(id, participants)
            .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Giveaway>, StoreError> {
        let rows = self.giveaways().load_all().await?;
        let mut giveaways = Vec::with_capacity(rows.len());
        for (row, participants) in rows {
            match from_row(row, participants) {
                Ok(giveaway) => giveaways.push(giveaway),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable giveaway"),
            }
        }
        Ok(giveaways)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if !self.giveaways().delete(id).await? {
            tracing::debug!(giveaway = %id, "Delete found no stored giveaway");
        }
        Ok(())
    }

    async fn archive(&self, giveaway: &Giveaway) -> Result<(), StoreError> {
        let row = ArchivedGiveawayRow {
            giveaway: to_row(giveaway),
            participants: encode_list(&giveaway.participants),
            excluded: encode_list(&giveaway.excluded),
            closed_at: Utc::now().timestamp(),
        };
        self.giveaways().archive(&row).await?;
        Ok(())
    }

    async fn load_archived(&self, id: &str) -> Result<Option<Giveaway>, StoreError> {
        let Some(row) = self.giveaways().find_archived(id).await? else {
            return Ok(None);
        };
        let participants = decode_list(id, "participants", &row.participants)?;
        let excluded = decode_list(id, "excluded", &row.excluded)?;
        let mut giveaway = from_row(row.giveaway, participants)?;
        giveaway.excluded = excluded;
        Ok(Some(giveaway))
    }
}
