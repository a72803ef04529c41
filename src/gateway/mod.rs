//! Messaging gateway abstraction.
//!
//! Everything platform-visible goes through [`MessagingGateway`]. The engine
//! calls it only after releasing the registry lock, and treats every failure
//! as best-effort.

use crate::engine::CloseOutcome;
use crate::state::{Giveaway, MessageHandle, NewGiveaway};
use async_trait::async_trait;
use thiserror::Error;

pub mod console;
pub mod format;

pub use console::{Button, ConsoleGateway, Outbound};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("message not found: {0}")]
    MessageNotFound(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Post the public give-away message. Its ID becomes the give-away ID.
    async fn render_create(&self, giveaway: &NewGiveaway) -> Result<MessageHandle, GatewayError>;

    /// Re-render the public message after a membership change.
    async fn render_update(&self, giveaway: &Giveaway) -> Result<(), GatewayError>;

    /// Announce the result of a close and freeze the public message.
    async fn render_close(
        &self,
        giveaway: &Giveaway,
        outcome: &CloseOutcome,
    ) -> Result<(), GatewayError>;

    async fn announce_reroll(&self, giveaway: &Giveaway, winner: &str)
    -> Result<(), GatewayError>;

    /// Whether the public message still exists on the platform.
    async fn message_exists(&self, handle: &MessageHandle) -> Result<bool, GatewayError>;

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, GatewayError>;
}
