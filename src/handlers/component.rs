//! Message component identifiers and their handlers.
//!
//! Custom IDs are flat strings on the platform; they are parsed into
//! [`ComponentId`] once at the edge.

use super::{Context, Reply};
use crate::engine::{Engine, EnterOutcome};
use crate::error::{GiveawayError, GiveawayResult};
use crate::gateway::Button;
use crate::gateway::format::mention;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ENTER: &str = "enter_giveaway";
const LIST_PARTICIPANTS: &str = "list_participants_";
const PREV_PAGE: &str = "prev_page_";
const NEXT_PAGE: &str = "next_page_";
const REROLL: &str = "reroll_";
const LEAVE_MODAL: &str = "leave_giveaway_modal_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentId {
    /// Enter button on the public message.
    Enter,
    /// Participants button; the give-away is the message it sits on.
    ListParticipants(i64),
    /// Page navigation; `page` is the page currently shown.
    PrevPage { page: i64, giveaway_id: String },
    NextPage { page: i64, giveaway_id: String },
    Reroll(String),
    /// Leave confirmation prompt.
    LeaveModal(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown component id: {0}")]
pub struct UnknownComponent(pub String);

fn parse_page(rest: &str) -> Option<(i64, String)> {
    let (page, id) = rest.split_once('_')?;
    if id.is_empty() {
        return None;
    }
    Some((page.parse().ok()?, id.to_string()))
}

impl FromStr for ComponentId {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownComponent(s.to_string());

        if s == ENTER {
            return Ok(Self::Enter);
        }
        if let Some(rest) = s.strip_prefix(LIST_PARTICIPANTS) {
            return rest.parse().map(Self::ListParticipants).map_err(|_| unknown());
        }
        if let Some(rest) = s.strip_prefix(PREV_PAGE) {
            let (page, giveaway_id) = parse_page(rest).ok_or_else(unknown)?;
            return Ok(Self::PrevPage { page, giveaway_id });
        }
        if let Some(rest) = s.strip_prefix(NEXT_PAGE) {
            let (page, giveaway_id) = parse_page(rest).ok_or_else(unknown)?;
            return Ok(Self::NextPage { page, giveaway_id });
        }
        if let Some(id) = s.strip_prefix(REROLL).filter(|id| !id.is_empty()) {
            return Ok(Self::Reroll(id.to_string()));
        }
        if let Some(id) = s.strip_prefix(LEAVE_MODAL).filter(|id| !id.is_empty()) {
            return Ok(Self::LeaveModal(id.to_string()));
        }
        Err(unknown())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str(ENTER),
            Self::ListParticipants(page) => write!(f, "{LIST_PARTICIPANTS}{page}"),
            Self::PrevPage { page, giveaway_id } => write!(f, "{PREV_PAGE}{page}_{giveaway_id}"),
            Self::NextPage { page, giveaway_id } => write!(f, "{NEXT_PAGE}{page}_{giveaway_id}"),
            Self::Reroll(id) => write!(f, "{REROLL}{id}"),
            Self::LeaveModal(id) => write!(f, "{LEAVE_MODAL}{id}"),
        }
    }
}

/// The give-away a component click refers to: the message it sits on.
fn source_message(ctx: &Context) -> GiveawayResult<&str> {
    ctx.message_id
        .as_deref()
        .ok_or_else(|| GiveawayError::NotFound(String::new()))
}

pub(super) async fn handle_button(
    engine: &Engine,
    ctx: &Context,
    custom_id: &str,
    now: DateTime<Utc>,
) -> GiveawayResult<Reply> {
    let Ok(component) = custom_id.parse::<ComponentId>() else {
        tracing::debug!(custom_id, "Ignoring unknown button");
        return Ok(Reply::message("Unknown action."));
    };

    match component {
        ComponentId::Enter => {
            let id = source_message(ctx)?;
            match engine.enter(id, &ctx.member, now).await? {
                EnterOutcome::Entered => Ok(Reply::message("You have entered the giveaway!")),
                EnterOutcome::AlreadyEntered => {
                    Ok(Reply::message("You have already entered this giveaway."))
                }
                EnterOutcome::ConfirmLeave => {
                    let phrase = &engine.policy().leave_phrase;
                    Ok(Reply::Modal {
                        custom_id: ComponentId::LeaveModal(id.to_string()).to_string(),
                        title: "Confirm Leave Giveaway".to_string(),
                        label: format!("Type {phrase} to confirm"),
                        placeholder: phrase.clone(),
                    })
                }
            }
        }
        ComponentId::ListParticipants(page) => {
            let id = source_message(ctx)?;
            participants(engine, id, page).await
        }
        ComponentId::PrevPage { page, giveaway_id } => {
            participants(engine, &giveaway_id, page.saturating_sub(1)).await
        }
        ComponentId::NextPage { page, giveaway_id } => {
            participants(engine, &giveaway_id, page.saturating_add(1)).await
        }
        ComponentId::Reroll(id) => {
            let winner = engine.reroll(&ctx.member, &id).await?;
            Ok(Reply::message(format!("New Winner: {}", mention(&winner))))
        }
        ComponentId::LeaveModal(_) => Ok(Reply::message("Unknown action.")),
    }
}

pub(super) async fn handle_modal(
    engine: &Engine,
    ctx: &Context,
    custom_id: &str,
    value: &str,
) -> GiveawayResult<Reply> {
    match custom_id.parse::<ComponentId>() {
        Ok(ComponentId::LeaveModal(id)) => {
            engine
                .confirm_leave(&id, &ctx.member.user_id, value)
                .await?;
            Ok(Reply::message("You have left the giveaway."))
        }
        _ => {
            tracing::debug!(custom_id, "Ignoring unknown modal");
            Ok(Reply::message("Unknown action."))
        }
    }
}

async fn participants(engine: &Engine, id: &str, page: i64) -> GiveawayResult<Reply> {
    let page = engine.participants_page(id, page).await?;

    let body = if page.entries.is_empty() {
        "*No participants on this page.*".to_string()
    } else {
        page.entries
            .iter()
            .map(|(user, name)| format!("{} ({name})", mention(user)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut components = Vec::new();
    if page.count > 1 {
        let shown = i64::try_from(page.index).unwrap_or(i64::MAX);
        if page.has_prev {
            components.push(Button::action(
                "Previous",
                &ComponentId::PrevPage {
                    page: shown,
                    giveaway_id: page.giveaway_id.clone(),
                },
            ));
        }
        if page.has_next {
            components.push(Button::action(
                "Next",
                &ComponentId::NextPage {
                    page: shown,
                    giveaway_id: page.giveaway_id.clone(),
                },
            ));
        }
    }

    Ok(Reply::Message {
        content: format!(
            "Participants ({} total)\n{body}\nPage {} of {}",
            page.total,
            page.index + 1,
            page.count.max(1)
        ),
        components,
    })
}
