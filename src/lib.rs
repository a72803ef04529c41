//! giveawayd - timed give-away campaigns for chat communities.
//!
//! Members enter through a button on a public message; when the deadline
//! passes the give-away closes exactly once, winners are drawn uniformly
//! from the ordered participant list, and the result is announced.
//! Moderators can remove participants and reroll a single winner after
//! close.

pub mod config;
pub mod db;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod telemetry;
