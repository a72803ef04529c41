//! Slash command handlers.

use super::{Context, Reply};
use crate::deadline::parse_deadline_at;
use crate::engine::Engine;
use crate::error::GiveawayResult;
use crate::gateway::format::{escape_markdown, listing_line, mention};
use crate::state::NewGiveaway;
use chrono::{DateTime, Utc};

pub(super) async fn create(
    engine: &Engine,
    ctx: &Context,
    title: String,
    end: &str,
    role: Option<String>,
    winners: Option<i64>,
    now: DateTime<Utc>,
) -> GiveawayResult<Reply> {
    let deadline = parse_deadline_at(end, now)?;
    // Non-positive counts fall back to a single winner
    let winners = winners
        .filter(|w| *w > 0)
        .map(|w| u32::try_from(w).unwrap_or(u32::MAX))
        .unwrap_or(1);

    engine
        .create(NewGiveaway {
            guild_id: ctx.guild_id.clone(),
            channel_id: ctx.channel_id.clone(),
            title,
            deadline,
            required_role: role.filter(|r| !r.is_empty()),
            winners,
        })
        .await?;
    Ok(Reply::message("Giveaway created!"))
}

pub(super) async fn list(
    engine: &Engine,
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> GiveawayResult<Reply> {
    let giveaways = engine.list(user_id, now).await;
    if giveaways.is_empty() {
        return Ok(Reply::message("No active giveaways found."));
    }

    let header = match user_id {
        Some(user) => format!(
            "Giveaways entered by **{}**:",
            escape_markdown(&engine.display_name(user).await)
        ),
        None => "All running giveaways:".to_string(),
    };
    let lines: Vec<String> = giveaways.iter().map(listing_line).collect();
    Ok(Reply::message(format!(
        "Active Giveaways\n{header}\n\n{}",
        lines.join("\n\n")
    )))
}

pub(super) async fn leave(engine: &Engine, ctx: &Context, id: &str) -> GiveawayResult<Reply> {
    let giveaway = engine.leave(id, &ctx.member.user_id).await?;
    Ok(Reply::message(format!(
        "You have left the giveaway **{}**",
        escape_markdown(&giveaway.title)
    )))
}

pub(super) async fn leave_all(
    engine: &Engine,
    ctx: &Context,
    now: DateTime<Utc>,
) -> GiveawayResult<Reply> {
    let left = engine.leave_all(&ctx.member.user_id, now).await;
    let header = match left.len() {
        0 => return Ok(Reply::message("You are not in any active giveaways.")),
        1 => "You have left **1** giveaway:".to_string(),
        n => format!("You have left **{n}** giveaways:"),
    };
    let lines: Vec<String> = left.iter().map(listing_line).collect();
    Ok(Reply::message(format!("{header}\n\n{}", lines.join("\n\n"))))
}

pub(super) async fn remove(
    engine: &Engine,
    ctx: &Context,
    target: &str,
    id: &str,
) -> GiveawayResult<Reply> {
    let giveaway = engine.remove_participant(&ctx.member, id, target).await?;
    Ok(Reply::message(format!(
        "{} has been removed from giveaway **{}** by {}.",
        mention(target),
        escape_markdown(&giveaway.title),
        mention(&ctx.member.user_id)
    )))
}
