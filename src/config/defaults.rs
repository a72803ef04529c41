//! Default value functions for configuration.

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "giveawayd".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "giveaways.db".to_string()
}

// =============================================================================
// Giveaway Defaults
// =============================================================================

pub fn default_leave_phrase() -> String {
    "LEAVE".to_string()
}
