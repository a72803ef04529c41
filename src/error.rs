//! Unified error handling for giveawayd.
//!
//! This module provides the error hierarchy for the lifecycle engine, with
//! automatic conversions from the adapter layers, user-facing rejection
//! text, and metric labeling.

use crate::gateway::GatewayError;
use crate::store::StoreError;
use thiserror::Error;

// ============================================================================
// Lifecycle Errors (engine operations)
// ============================================================================

/// Errors that can occur while operating on a give-away.
#[derive(Debug, Error)]
pub enum GiveawayError {
    #[error("invalid end time format: {0}")]
    InvalidFormat(String),

    #[error("giveaway not found: {0}")]
    NotFound(String),

    #[error("giveaway has already ended")]
    AlreadyEnded,

    #[error("user {0} is not in this giveaway")]
    NotParticipant(String),

    #[error("role {0} is required to join")]
    RoleRequired(String),

    #[error("permission denied")]
    Forbidden,

    #[error("confirmation text did not match")]
    InvalidConfirmation,

    #[error("giveaway is still running")]
    StillRunning,

    #[error("no participants to draw from")]
    NoEligibleParticipants,

    #[error("giveaway {0} is already live")]
    AlreadyExists(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("render failure: {0}")]
    Render(#[from] GatewayError),
}

impl GiveawayError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::NotFound(_) => "not_found",
            Self::AlreadyEnded => "already_ended",
            Self::NotParticipant(_) => "not_participant",
            Self::RoleRequired(_) => "role_required",
            Self::Forbidden => "forbidden",
            Self::InvalidConfirmation => "invalid_confirmation",
            Self::StillRunning => "still_running",
            Self::NoEligibleParticipants => "no_eligible_participants",
            Self::AlreadyExists(_) => "already_exists",
            Self::Persistence(_) => "persistence_failure",
            Self::Render(_) => "render_failure",
        }
    }

    /// Whether the error was caused by the requesting user's input.
    ///
    /// User errors never mutate state and are answered directly.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyExists(_) | Self::Persistence(_) | Self::Render(_)
        )
    }

    /// Rejection text shown to the requesting user.
    ///
    /// Returns `None` for collaborator failures, which are only logged.
    pub fn user_message(&self, leave_phrase: &str) -> Option<String> {
        let text = match self {
            Self::InvalidFormat(detail) => format!("Invalid end time format: {detail}"),
            Self::NotFound(_) | Self::AlreadyEnded => {
                "Giveaway not found or has ended.".to_string()
            }
            Self::NotParticipant(user) => format!("<@{user}> is not in this giveaway."),
            Self::RoleRequired(_) => "You don't have the required role to join.".to_string(),
            Self::Forbidden => "You do not have permission to use this command.".to_string(),
            Self::InvalidConfirmation => {
                format!("Invalid input. You must type '{leave_phrase}' exactly.")
            }
            Self::StillRunning => "This giveaway is still running.".to_string(),
            Self::NoEligibleParticipants => "No participants to reroll.".to_string(),

            // Collaborator failures are logged, not shown
            Self::AlreadyExists(_) | Self::Persistence(_) | Self::Render(_) => return None,
        };
        Some(text)
    }
}

/// Result type for engine operations.
pub type GiveawayResult<T> = Result<T, GiveawayError>;
