//! Configuration loading and management.
//!
//! - [`types`]: Config struct definitions and TOML loading
//! - [`validation`]: Startup checks that collect every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{Config, ConfigError, DatabaseConfig, GiveawayConfig, ServerConfig};
pub use validation::{ValidationError, validate};
