//! Interaction handlers.
//!
//! Decodes platform interactions (slash commands, button clicks, modal
//! submissions) into engine calls and turns the outcome into a [`Reply`]
//! for the acting member. Rejections never mutate state.

mod commands;
pub mod component;

pub use component::ComponentId;

use crate::engine::Engine;
use crate::gateway::Button;
use crate::metrics;
use crate::state::Member;
use crate::telemetry::{InteractionTimer, spans};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, warn};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

/// Where an interaction happened and who performed it.
#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub member: Member,
    #[serde(default)]
    pub guild_id: String,
    pub channel_id: String,
    /// Message the clicked component is attached to.
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    CreateGiveaway {
        title: String,
        end: String,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        winners: Option<i64>,
    },
    ListGiveaways {
        #[serde(default)]
        user: Option<String>,
    },
    MyGiveaways,
    LeaveGiveaway {
        giveaway_id: String,
    },
    LeaveAllGiveaways,
    Remove {
        user: String,
        giveaway_id: String,
    },
    Button {
        custom_id: String,
    },
    ModalSubmit {
        custom_id: String,
        value: String,
    },
}

impl Interaction {
    /// Metric and span label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateGiveaway { .. } => "create_giveaway",
            Self::ListGiveaways { .. } => "list_giveaways",
            Self::MyGiveaways => "my_giveaways",
            Self::LeaveGiveaway { .. } => "leave_giveaway",
            Self::LeaveAllGiveaways => "leave_all_giveaways",
            Self::Remove { .. } => "remove",
            Self::Button { .. } => "button",
            Self::ModalSubmit { .. } => "modal_submit",
        }
    }
}

/// Ephemeral response to the acting member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Message {
        content: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        components: Vec<Button>,
    },
    /// Prompt for the leave confirmation phrase.
    Modal {
        custom_id: String,
        title: String,
        label: String,
        placeholder: String,
    },
}

impl Reply {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            components: Vec::new(),
        }
    }

    /// Text content, if this is a message.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Message { content, .. } => Some(content.as_str()),
            Self::Modal { .. } => None,
        }
    }
}

/// Handle one interaction at `now`.
pub async fn handle(
    engine: &Engine,
    ctx: &Context,
    interaction: Interaction,
    now: DateTime<Utc>,
) -> Reply {
    let kind = interaction.kind();
    let _timer = InteractionTimer::new(kind);

    let result = async {
        match interaction {
            Interaction::CreateGiveaway {
                title,
                end,
                role,
                winners,
            } => commands::create(engine, ctx, title, &end, role, winners, now).await,
            Interaction::ListGiveaways { user } => {
                commands::list(engine, user.as_deref(), now).await
            }
            Interaction::MyGiveaways => {
                commands::list(engine, Some(ctx.member.user_id.as_str()), now).await
            }
            Interaction::LeaveGiveaway { giveaway_id } => {
                commands::leave(engine, ctx, &giveaway_id).await
            }
            Interaction::LeaveAllGiveaways => commands::leave_all(engine, ctx, now).await,
            Interaction::Remove { user, giveaway_id } => {
                commands::remove(engine, ctx, &user, &giveaway_id).await
            }
            Interaction::Button { custom_id } => {
                component::handle_button(engine, ctx, &custom_id, now).await
            }
            Interaction::ModalSubmit { custom_id, value } => {
                component::handle_modal(engine, ctx, &custom_id, &value).await
            }
        }
    }
    .instrument(spans::interaction(kind, &ctx.member.user_id))
    .await;

    match result {
        Ok(reply) => reply,
        Err(e) => {
            metrics::record_interaction_error(kind, e.error_code());
            match e.user_message(&engine.policy().leave_phrase) {
                Some(text) => Reply::message(text),
                None => {
                    warn!(kind, error = %e, "Interaction failed");
                    Reply::message(GENERIC_FAILURE)
                }
            }
        }
    }
}
