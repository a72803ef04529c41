//! Winner selection.

use super::RerollPolicy;
use crate::state::Giveaway;
use rand::Rng;
use rand::seq::SliceRandom;

/// How a give-away ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The public message was gone; nothing was drawn.
    MessageMissing,
    NoParticipants,
    /// Winners in draw order.
    Winners(Vec<String>),
}

impl CloseOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MessageMissing => "message_missing",
            Self::NoParticipants => "no_participants",
            Self::Winners(_) => "winners",
        }
    }

    pub fn winners(&self) -> &[String] {
        match self {
            Self::Winners(w) => w,
            _ => &[],
        }
    }
}

/// Shuffle the participants and take the first `effective_winners()` as
/// winners. The winners are recorded as excluded from future rerolls.
pub fn draw_winners<R: Rng + ?Sized>(giveaway: &mut Giveaway, rng: &mut R) -> CloseOutcome {
    if giveaway.participants.is_empty() {
        return CloseOutcome::NoParticipants;
    }

    giveaway.participants.shuffle(rng);
    let winners = giveaway.participants[..giveaway.effective_winners()].to_vec();
    giveaway.excluded = winners.clone();
    CloseOutcome::Winners(winners)
}

/// Pick one reroll winner uniformly from the pool `policy` allows.
pub fn pick_reroll<R: Rng + ?Sized>(
    giveaway: &Giveaway,
    policy: RerollPolicy,
    rng: &mut R,
) -> Option<String> {
    let pool: Vec<&String> = match policy {
        RerollPolicy::Include => giveaway.participants.iter().collect(),
        RerollPolicy::Exclude => giveaway
            .participants
            .iter()
            .filter(|p| !giveaway.excluded.contains(p))
            .collect(),
    };
    pool.choose(rng).map(|p| (*p).clone())
}
