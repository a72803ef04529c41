//! The give-away campaign record.

use chrono::{DateTime, Utc};

/// Reference to the public platform message a give-away is rendered into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
}

/// A single timed give-away.
///
/// The ID equals the ID of the platform message the give-away is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Giveaway {
    pub id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    /// Role a member must hold to enter.
    pub required_role: Option<String>,
    /// Entrants in entry order. Never contains duplicates.
    pub participants: Vec<String>,
    /// Winners already drawn; populated when the give-away closes.
    pub excluded: Vec<String>,
    /// Requested number of winners (at least 1).
    pub winners: u32,
}

/// Parameters for a give-away that has not been rendered yet.
#[derive(Debug, Clone)]
pub struct NewGiveaway {
    pub guild_id: String,
    pub channel_id: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub required_role: Option<String>,
    pub winners: u32,
}

impl NewGiveaway {
    /// Bind the draft to the message it was rendered into.
    pub fn bind(self, handle: &MessageHandle) -> Giveaway {
        Giveaway {
            id: handle.message_id.clone(),
            guild_id: self.guild_id,
            channel_id: handle.channel_id.clone(),
            message_id: handle.message_id.clone(),
            title: self.title,
            deadline: self.deadline,
            required_role: self.required_role,
            participants: Vec::new(),
            excluded: Vec::new(),
            winners: self.winners.max(1),
        }
    }
}

impl Giveaway {
    pub fn handle(&self) -> MessageHandle {
        MessageHandle {
            guild_id: self.guild_id.clone(),
            channel_id: self.channel_id.clone(),
            message_id: self.message_id.clone(),
        }
    }

    /// Whether the deadline has been reached at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Append a participant. Returns false if already entered.
    pub fn add_participant(&mut self, user_id: &str) -> bool {
        if self.has_participant(user_id) {
            return false;
        }
        self.participants.push(user_id.to_string());
        true
    }

    /// Remove a participant, keeping the order of the rest.
    /// Returns false if the user was not entered.
    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        match self.participants.iter().position(|p| p == user_id) {
            Some(idx) => {
                self.participants.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Number of winners a draw would produce right now.
    pub fn effective_winners(&self) -> usize {
        (self.winners.max(1) as usize).min(self.participants.len())
    }

    /// Link to the public message.
    pub fn jump_url(&self) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            if self.guild_id.is_empty() { "@me" } else { self.guild_id.as_str() },
            self.channel_id,
            self.message_id
        )
    }
}
