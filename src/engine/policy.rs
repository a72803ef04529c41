//! Configurable lifecycle policies.

use serde::Deserialize;

/// What happens when a member clicks enter on a give-away they already
/// entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReentryPolicy {
    /// Ask the member to type the leave phrase to leave.
    #[default]
    Confirm,
    /// Tell the member they are already entered.
    Ignore,
}

/// Whether winners drawn at close may be drawn again by a reroll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerollPolicy {
    /// Draw from the full participant list.
    #[default]
    Include,
    /// Draw only from participants never drawn before; each reroll winner
    /// is excluded from later rerolls.
    Exclude,
}

/// Engine-wide policy knobs.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    /// Roles that may moderate, in addition to administrators.
    pub allowed_roles: Vec<String>,
    /// Text a member must type to confirm leaving.
    pub leave_phrase: String,
    pub reentry: ReentryPolicy,
    pub reroll: RerollPolicy,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            allowed_roles: Vec::new(),
            leave_phrase: "LEAVE".to_string(),
            reentry: ReentryPolicy::default(),
            reroll: RerollPolicy::default(),
        }
    }
}
