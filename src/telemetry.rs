//! Telemetry utilities for interaction timing and log correlation.

use std::time::Instant;

/// Guard for timing an interaction and recording metrics.
///
/// Records latency when dropped.
pub struct InteractionTimer {
    kind: &'static str,
    start: Instant,
}

impl InteractionTimer {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }
}

impl Drop for InteractionTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_interaction(self.kind, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one inbound interaction.
    pub fn interaction(kind: &str, user: &str) -> Span {
        info_span!("interaction", kind = %kind, user = %user)
    }

    /// Span for work on a single give-away (close, reroll).
    pub fn giveaway(id: &str) -> Span {
        info_span!("giveaway", id = %id)
    }
}
