//! Give-away database models.

/// A live give-away row. Times are Unix seconds; no role is stored as `''`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiveawayRow {
    pub id: String,
    pub guild_id: String,
    pub title: String,
    pub end_time: i64,
    pub role_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub winners: i64,
}

/// A closed give-away kept for rerolls.
///
/// Participant and excluded lists are JSON arrays of user IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedGiveawayRow {
    pub giveaway: GiveawayRow,
    pub participants: String,
    pub excluded: String,
    pub closed_at: i64,
}
