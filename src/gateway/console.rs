//! Line-oriented gateway that emits render instructions as [`Outbound`]
//! values on a channel.
//!
//! The stdio feed serializes these to JSON; tests read them directly.

use super::format;
use super::{GatewayError, MessagingGateway};
use crate::engine::CloseOutcome;
use crate::handlers::component::ComponentId;
use crate::state::{Giveaway, Member, MessageHandle, NewGiveaway};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A clickable component attached to a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub disabled: bool,
}

impl Button {
    pub fn action(label: &str, id: &ComponentId) -> Self {
        Self {
            label: label.to_string(),
            custom_id: Some(id.to_string()),
            url: None,
            disabled: false,
        }
    }

    pub fn link(label: &str, url: String) -> Self {
        Self {
            label: label.to_string(),
            custom_id: None,
            url: Some(url),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Render instruction for the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Post a new message.
    Post {
        channel_id: String,
        message_id: String,
        content: String,
        components: Vec<Button>,
    },
    /// Replace the content of an existing message.
    Edit {
        channel_id: String,
        message_id: String,
        content: String,
        components: Vec<Button>,
    },
    /// Post a notice, optionally as a reply to an existing message.
    Notice {
        channel_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
        content: String,
        components: Vec<Button>,
    },
}

pub struct ConsoleGateway {
    tx: mpsc::Sender<Outbound>,
    deleted: DashSet<String>,
    names: DashMap<String, String>,
}

impl ConsoleGateway {
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            tx,
            deleted: DashSet::new(),
            names: DashMap::new(),
        }
    }

    /// Record that the platform deleted a message.
    pub fn mark_deleted(&self, message_id: &str) {
        debug!(message = %message_id, "Message marked deleted");
        self.deleted.insert(message_id.to_string());
    }

    /// Remember the display name a member arrived with.
    pub fn remember(&self, member: &Member) {
        if let Some(name) = &member.name {
            self.names.insert(member.user_id.clone(), name.clone());
        }
    }

    async fn emit(&self, message: Outbound) -> Result<(), GatewayError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| GatewayError::Unavailable("output channel closed".to_string()))
    }

    fn ensure_present(&self, message_id: &str) -> Result<(), GatewayError> {
        if self.deleted.contains(message_id) {
            return Err(GatewayError::MessageNotFound(message_id.to_string()));
        }
        Ok(())
    }

    fn open_components() -> Vec<Button> {
        vec![
            Button::action("🎉", &ComponentId::Enter),
            Button::action("Participants", &ComponentId::ListParticipants(0)),
        ]
    }

    fn closed_components(participants_disabled: bool) -> Vec<Button> {
        vec![
            Button::action("🎉", &ComponentId::Enter).disabled(true),
            Button::action("Participants", &ComponentId::ListParticipants(0))
                .disabled(participants_disabled),
        ]
    }
}

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn render_create(&self, giveaway: &NewGiveaway) -> Result<MessageHandle, GatewayError> {
        let message_id = Uuid::new_v4().simple().to_string();
        let content = format!(
            "{}\n{}",
            format::escape_markdown(&giveaway.title),
            format::giveaway_body(
                giveaway.deadline,
                giveaway.required_role.as_deref(),
                0,
                giveaway.winners.max(1),
            )
        );

        self.emit(Outbound::Post {
            channel_id: giveaway.channel_id.clone(),
            message_id: message_id.clone(),
            content,
            components: Self::open_components(),
        })
        .await?;

        Ok(MessageHandle {
            guild_id: giveaway.guild_id.clone(),
            channel_id: giveaway.channel_id.clone(),
            message_id,
        })
    }

    async fn render_update(&self, giveaway: &Giveaway) -> Result<(), GatewayError> {
        self.ensure_present(&giveaway.message_id)?;
        let content = format!(
            "{}\n{}",
            format::escape_markdown(&giveaway.title),
            format::giveaway_body(
                giveaway.deadline,
                giveaway.required_role.as_deref(),
                giveaway.participants.len(),
                giveaway.winners,
            )
        );

        self.emit(Outbound::Edit {
            channel_id: giveaway.channel_id.clone(),
            message_id: giveaway.message_id.clone(),
            content,
            components: Self::open_components(),
        })
        .await
    }

    async fn render_close(
        &self,
        giveaway: &Giveaway,
        outcome: &CloseOutcome,
    ) -> Result<(), GatewayError> {
        match outcome {
            CloseOutcome::MessageMissing => {
                self.emit(Outbound::Notice {
                    channel_id: giveaway.channel_id.clone(),
                    reply_to: None,
                    content: format::MESSAGE_MISSING_NOTICE.to_string(),
                    components: Vec::new(),
                })
                .await
            }
            CloseOutcome::NoParticipants => {
                self.emit(Outbound::Notice {
                    channel_id: giveaway.channel_id.clone(),
                    reply_to: None,
                    content: format::no_entries_announcement(giveaway),
                    components: vec![Button::link("Original message", giveaway.jump_url())],
                })
                .await?;
                self.ensure_present(&giveaway.message_id)?;
                self.emit(Outbound::Edit {
                    channel_id: giveaway.channel_id.clone(),
                    message_id: giveaway.message_id.clone(),
                    content: "**No one entered the giveaway!**".to_string(),
                    components: Self::closed_components(true),
                })
                .await
            }
            CloseOutcome::Winners(winners) => {
                let announcement = format::winners_announcement(giveaway, winners);
                let reroll_pointless = giveaway.participants.len() <= winners.len();
                self.emit(Outbound::Notice {
                    channel_id: giveaway.channel_id.clone(),
                    reply_to: Some(giveaway.message_id.clone()),
                    content: format!("{}\n{}", format::mention_list(winners, " "), announcement),
                    components: vec![
                        Button::link("Original message", giveaway.jump_url()),
                        Button::action("Reroll", &ComponentId::Reroll(giveaway.id.clone()))
                            .disabled(reroll_pointless),
                    ],
                })
                .await?;
                self.ensure_present(&giveaway.message_id)?;
                self.emit(Outbound::Edit {
                    channel_id: giveaway.channel_id.clone(),
                    message_id: giveaway.message_id.clone(),
                    content: announcement,
                    components: Self::closed_components(false),
                })
                .await
            }
        }
    }

    async fn announce_reroll(
        &self,
        giveaway: &Giveaway,
        winner: &str,
    ) -> Result<(), GatewayError> {
        self.emit(Outbound::Notice {
            channel_id: giveaway.channel_id.clone(),
            reply_to: Some(giveaway.message_id.clone()),
            content: format!(
                "{}\n{}",
                format::mention(winner),
                format::reroll_announcement(winner)
            ),
            components: Vec::new(),
        })
        .await
    }

    async fn message_exists(&self, handle: &MessageHandle) -> Result<bool, GatewayError> {
        Ok(!self.deleted.contains(&handle.message_id))
    }

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        self.names
            .get(user_id)
            .map(|name| name.value().clone())
            .ok_or_else(|| GatewayError::UnknownUser(user_id.to_string()))
    }
}
