//! Give-away repository.
//!
//! Handles live give-away records, their ordered participant lists, and the
//! archive of closed give-aways.

pub mod models;
pub mod queries;

pub use models::{ArchivedGiveawayRow, GiveawayRow};
pub use queries::GiveawayRepository;
