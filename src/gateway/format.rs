//! Text rendering helpers shared by the gateway and the interaction replies.

use crate::state::Giveaway;
use chrono::{DateTime, Utc};

/// Escape the markdown characters a title could use to break formatting.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '~' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

pub fn role_mention(role_id: &str) -> String {
    format!("<@&{role_id}>")
}

/// Platform timestamp markup rendered relative to the viewer's clock.
pub fn relative_time(at: DateTime<Utc>) -> String {
    format!("<t:{}:R>", at.timestamp())
}

pub fn mention_list(user_ids: &[String], separator: &str) -> String {
    user_ids
        .iter()
        .map(|id| mention(id))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Body of the public give-away message.
pub fn giveaway_body(
    deadline: DateTime<Utc>,
    required_role: Option<&str>,
    participants: usize,
    winners: u32,
) -> String {
    let mut body = format!(
        "Click 🎉 button to enter!\nParticipants: **{participants}**\nWinners: **{winners}**\nEnds: {}\n\n",
        relative_time(deadline)
    );
    if let Some(role) = required_role {
        body.push_str(&format!("Role Required: **{}**", role_mention(role)));
    }
    body
}

/// Announcement for a close that drew `winners`.
pub fn winners_announcement(giveaway: &Giveaway, winners: &[String]) -> String {
    let title = escape_markdown(&giveaway.title);
    let verb = if winners.len() == 1 { "has" } else { "have" };
    format!(
        "Giveaway for {title} has ended!\n{} {verb} won the giveaway for **{title}**",
        mention_list(winners, ", ")
    )
}

pub fn no_entries_announcement(giveaway: &Giveaway) -> String {
    format!(
        "No one entered the giveaway for {}!",
        escape_markdown(&giveaway.title)
    )
}

pub const MESSAGE_MISSING_NOTICE: &str =
    "Giveaway ended, but the original message could not be found.";

pub fn reroll_announcement(winner: &str) -> String {
    format!("Giveaway Rerolled!\nNew Winner: {}", mention(winner))
}

/// One line of a give-away listing.
pub fn listing_line(giveaway: &Giveaway) -> String {
    format!(
        "{} {} (ID: `{}`)\nTime: {}",
        escape_markdown(&giveaway.title),
        giveaway.jump_url(),
        giveaway.message_id,
        relative_time(giveaway.deadline)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markdown_characters() {
        assert_eq!(escape_markdown("*big* _prize_"), "\\*big\\* \\_prize\\_");
        assert_eq!(escape_markdown("~`x`~"), "\\~\\`x\\`\\~");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn body_mentions_role_only_when_required() {
        let at = DateTime::<Utc>::from_timestamp(1_900_000_000, 0).unwrap();
        let open = giveaway_body(at, None, 3, 1);
        assert!(open.contains("Participants: **3**"));
        assert!(open.contains("<t:1900000000:R>"));
        assert!(!open.contains("Role Required"));

        let gated = giveaway_body(at, Some("77"), 0, 2);
        assert!(gated.contains("Role Required: **<@&77>**"));
    }

    #[test]
    fn mention_list_joins() {
        let ids = vec!["1".to_string(), "2".to_string()];
        assert_eq!(mention_list(&ids, ", "), "<@1>, <@2>");
        assert_eq!(mention_list(&[], " "), "");
    }
}
