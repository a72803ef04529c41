//! Give-away repository for database queries.

use super::models::{ArchivedGiveawayRow, GiveawayRow};
use crate::db::DbError;
use sqlx::SqlitePool;
use std::collections::HashMap;

type GiveawayTuple = (String, String, String, i64, String, String, String, i64);
type ArchivedTuple = (
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    i64,
    String,
    String,
    i64,
);

fn row_from_tuple(
    (id, guild_id, title, end_time, role_id, channel_id, message_id, winners): GiveawayTuple,
) -> GiveawayRow {
    GiveawayRow {
        id,
        guild_id,
        title,
        end_time,
        role_id,
        channel_id,
        message_id,
        winners,
    }
}

/// Repository for give-away operations.
pub struct GiveawayRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GiveawayRepository<'a> {
    /// Create a new give-away repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new live give-away.
    pub async fn insert(&self, row: &GiveawayRow) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO giveaways
            (id, guild_id, title, end_time, role_id, channel_id, message_id, winners, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.guild_id)
        .bind(&row.title)
        .bind(row.end_time)
        .bind(&row.role_id)
        .bind(&row.channel_id)
        .bind(&row.message_id)
        .bind(row.winners)
        .bind(now)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::GiveawayExists(row.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace all participants of a give-away in one transaction.
    pub async fn replace_participants(
        &self,
        giveaway_id: &str,
        participants: &[String],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM participants WHERE giveaway_id = ?")
            .bind(giveaway_id)
            .execute(&mut *tx)
            .await?;

        for (position, user_id) in participants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO participants (giveaway_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(giveaway_id)
            .bind(user_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load participants of one give-away in entry order.
    pub async fn load_participants(&self, giveaway_id: &str) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM participants WHERE giveaway_id = ? ORDER BY position",
        )
        .bind(giveaway_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Load all live give-aways with their participants.
    pub async fn load_all(&self) -> Result<Vec<(GiveawayRow, Vec<String>)>, DbError> {
        let rows = sqlx::query_as::<_, GiveawayTuple>(
            r#"
            SELECT id, guild_id, title, end_time, role_id, channel_id, message_id, winners
            FROM giveaways
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let entries = sqlx::query_as::<_, (String, String)>(
            "SELECT giveaway_id, user_id FROM participants ORDER BY giveaway_id, position",
        )
        .fetch_all(self.pool)
        .await?;

        let mut by_giveaway: HashMap<String, Vec<String>> = HashMap::new();
        for (giveaway_id, user_id) in entries {
            by_giveaway.entry(giveaway_id).or_default().push(user_id);
        }

        Ok(rows
            .into_iter()
            .map(row_from_tuple)
            .map(|row| {
                let participants = by_giveaway.remove(&row.id).unwrap_or_default();
                (row, participants)
            })
            .collect())
    }

    /// Find a live give-away by ID.
    pub async fn find(&self, id: &str) -> Result<Option<GiveawayRow>, DbError> {
        let row = sqlx::query_as::<_, GiveawayTuple>(
            r#"
            SELECT id, guild_id, title, end_time, role_id, channel_id, message_id, winners
            FROM giveaways
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(row_from_tuple))
    }

    /// Delete a live give-away and its participants.
    pub async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM participants WHERE giveaway_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM giveaways WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert or overwrite the archive entry of a closed give-away.
    pub async fn archive(&self, row: &ArchivedGiveawayRow) -> Result<(), DbError> {
        let g = &row.giveaway;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO closed_giveaways
            (id, guild_id, title, end_time, role_id, channel_id, message_id, winners,
             participants, excluded, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&g.id)
        .bind(&g.guild_id)
        .bind(&g.title)
        .bind(g.end_time)
        .bind(&g.role_id)
        .bind(&g.channel_id)
        .bind(&g.message_id)
        .bind(g.winners)
        .bind(&row.participants)
        .bind(&row.excluded)
        .bind(row.closed_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Find a closed give-away by ID.
    pub async fn find_archived(&self, id: &str) -> Result<Option<ArchivedGiveawayRow>, DbError> {
        let row = sqlx::query_as::<_, ArchivedTuple>(
            r#"
            SELECT id, guild_id, title, end_time, role_id, channel_id, message_id, winners,
                   participants, excluded, closed_at
            FROM closed_giveaways
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(
                id,
                guild_id,
                title,
                end_time,
                role_id,
                channel_id,
                message_id,
                winners,
                participants,
                excluded,
                closed_at,
            )| ArchivedGiveawayRow {
                giveaway: GiveawayRow {
                    id,
                    guild_id,
                    title,
                    end_time,
                    role_id,
                    channel_id,
                    message_id,
                    winners,
                },
                participants,
                excluded,
                closed_at,
            },
        ))
    }
}
