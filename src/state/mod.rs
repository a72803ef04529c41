//! State management module.
//!
//! Contains the give-away records, the acting member, and the live registry.

mod giveaway;
mod member;
mod pagination;
mod registry;

pub use giveaway::{Giveaway, MessageHandle, NewGiveaway};
pub use member::Member;
pub use pagination::{PAGE_SIZE, Page, paginate};
pub use registry::{Mutation, Registry};
