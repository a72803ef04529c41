//! Give-away lifecycle engine.
//!
//! Every operation follows the same shape: validate and mutate inside the
//! registry lock (persisting there), then render through the gateway once
//! the lock is released. Gateway failures are logged and never undo a
//! mutation.

mod draw;
mod policy;

pub use draw::{CloseOutcome, draw_winners, pick_reroll};
pub use policy::{EnginePolicy, ReentryPolicy, RerollPolicy};

use crate::error::{GiveawayError, GiveawayResult};
use crate::gateway::MessagingGateway;
use crate::metrics;
use crate::scheduler::CloseScheduler;
use crate::state::{Giveaway, Member, NewGiveaway, Registry, paginate};
use crate::store::StoreError;
use crate::telemetry::spans;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, warn};

/// Result of clicking enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Entered,
    /// Already entered; the member must confirm with the leave phrase.
    ConfirmLeave,
    /// Already entered and the re-entry policy ignores repeat clicks.
    AlreadyEntered,
}

/// One page of participants with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantPage {
    pub giveaway_id: String,
    pub index: usize,
    pub count: usize,
    pub total: usize,
    /// `(user_id, display_name)`; the name falls back to the ID.
    pub entries: Vec<(String, String)>,
    pub has_prev: bool,
    pub has_next: bool,
}

pub struct Engine {
    registry: Arc<Registry>,
    scheduler: Arc<CloseScheduler>,
    gateway: Arc<dyn MessagingGateway>,
    policy: EnginePolicy,
    /// Serializes read-modify-write of archived records by rerolls.
    /// Never held across gateway calls.
    archive_lock: Mutex<()>,
}

impl Engine {
    pub fn new(
        registry: Arc<Registry>,
        scheduler: Arc<CloseScheduler>,
        gateway: Arc<dyn MessagingGateway>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            registry,
            scheduler,
            gateway,
            policy,
            archive_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<CloseScheduler> {
        &self.scheduler
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Render the public message, register the give-away under the
    /// message's ID, and arm its close.
    pub async fn create(&self, draft: NewGiveaway) -> GiveawayResult<Giveaway> {
        let handle = self.gateway.render_create(&draft).await?;
        let giveaway = draft.bind(&handle);

        if !self.registry.create(giveaway.clone()).await {
            return Err(GiveawayError::AlreadyExists(giveaway.id));
        }
        self.scheduler.schedule(&giveaway.id, giveaway.deadline);
        metrics::record_created();

        info!(
            giveaway = %giveaway.id,
            title = %giveaway.title,
            deadline = %giveaway.deadline,
            winners = giveaway.winners,
            "Giveaway created"
        );
        Ok(giveaway)
    }

    pub async fn enter(
        &self,
        id: &str,
        member: &Member,
        now: DateTime<Utc>,
    ) -> GiveawayResult<EnterOutcome> {
        let reentry = self.policy.reentry;
        let mutation = self
            .registry
            .mutate_participants(id, |g| {
                if g.is_expired(now) {
                    return Err(GiveawayError::AlreadyEnded);
                }
                if let Some(role) = &g.required_role
                    && !member.has_role(role)
                {
                    return Err(GiveawayError::RoleRequired(role.clone()));
                }
                if g.has_participant(&member.user_id) {
                    return Ok(match reentry {
                        ReentryPolicy::Confirm => EnterOutcome::ConfirmLeave,
                        ReentryPolicy::Ignore => EnterOutcome::AlreadyEntered,
                    });
                }
                g.add_participant(&member.user_id);
                Ok(EnterOutcome::Entered)
            })
            .await?;

        if mutation.changed {
            debug!(giveaway = %id, user = %member.user_id, "Participant entered");
            metrics::record_entry();
            self.render_update(&mutation.snapshot).await;
        }
        Ok(mutation.value)
    }

    /// Leave after the member typed the confirmation phrase.
    pub async fn confirm_leave(
        &self,
        id: &str,
        user_id: &str,
        input: &str,
    ) -> GiveawayResult<Giveaway> {
        if input != self.policy.leave_phrase {
            return Err(GiveawayError::InvalidConfirmation);
        }
        self.leave(id, user_id).await
    }

    pub async fn leave(&self, id: &str, user_id: &str) -> GiveawayResult<Giveaway> {
        let giveaway = self.take_participant(id, user_id).await?;
        debug!(giveaway = %id, user = %user_id, "Participant left");
        Ok(giveaway)
    }

    /// Remove `user_id` from every running give-away they entered.
    ///
    /// Returns the give-aways left, ordered by deadline.
    pub async fn leave_all(&self, user_id: &str, now: DateTime<Utc>) -> Vec<Giveaway> {
        let candidates = self
            .registry
            .list_active(|g| !g.is_expired(now) && g.has_participant(user_id))
            .await;

        let mut left = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.take_participant(&candidate.id, user_id).await {
                Ok(snapshot) => left.push(snapshot),
                // Closed or left concurrently
                Err(e) => debug!(giveaway = %candidate.id, error = %e, "Skipped during leave-all"),
            }
        }

        left.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        left
    }

    /// Moderator removal of another participant.
    pub async fn remove_participant(
        &self,
        actor: &Member,
        id: &str,
        target: &str,
    ) -> GiveawayResult<Giveaway> {
        if !actor.can_moderate(&self.policy.allowed_roles) {
            return Err(GiveawayError::Forbidden);
        }
        let giveaway = self.take_participant(id, target).await?;
        info!(giveaway = %id, target = %target, actor = %actor.user_id, "Participant removed");
        Ok(giveaway)
    }

    async fn take_participant(&self, id: &str, user_id: &str) -> GiveawayResult<Giveaway> {
        let mutation = self
            .registry
            .mutate_participants(id, |g| {
                if g.remove_participant(user_id) {
                    Ok(())
                } else {
                    Err(GiveawayError::NotParticipant(user_id.to_string()))
                }
            })
            .await?;

        metrics::record_leave();
        self.render_update(&mutation.snapshot).await;
        Ok(mutation.snapshot)
    }

    /// Close a give-away at its deadline.
    ///
    /// Returns `None` if it was no longer live, which makes a duplicate or
    /// late close a no-op.
    pub async fn close(&self, id: &str) -> Option<CloseOutcome> {
        self.close_inner(id).instrument(spans::giveaway(id)).await
    }

    async fn close_inner(&self, id: &str) -> Option<CloseOutcome> {
        self.scheduler.cancel(id);

        let Some(snapshot) = self.registry.get(id).await else {
            debug!("Close fired for a giveaway that is no longer live");
            return None;
        };

        let message_exists = match self.gateway.message_exists(&snapshot.handle()).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, "Could not check giveaway message, drawing anyway");
                true
            }
        };

        let (giveaway, outcome) = if message_exists {
            self.registry
                .remove_with(id, |g| draw_winners(g, &mut rand::thread_rng()))
                .await?
        } else {
            let giveaway = self.registry.remove(id).await?;
            (giveaway, CloseOutcome::MessageMissing)
        };

        if let Err(e) = self.gateway.render_close(&giveaway, &outcome).await {
            warn!(error = %e, "Failed to render giveaway close");
            metrics::record_render_failure("close");
        }
        metrics::record_close(outcome.label());
        info!(
            outcome = outcome.label(),
            participants = giveaway.participants.len(),
            winners = ?outcome.winners(),
            "Giveaway closed"
        );
        Some(outcome)
    }

    /// Draw one new winner from a closed give-away's archived record.
    ///
    /// A give-away that is still running cannot be rerolled.
    pub async fn reroll(&self, requester: &Member, id: &str) -> GiveawayResult<String> {
        if !requester.can_moderate(&self.policy.allowed_roles) {
            return Err(GiveawayError::Forbidden);
        }
        if self.registry.contains(id).await {
            return Err(GiveawayError::StillRunning);
        }

        let (giveaway, winner) = {
            let _archive = self.archive_lock.lock().await;
            let giveaway = self
                .registry
                .store()
                .load_archived(id)
                .await?
                .ok_or_else(|| GiveawayError::NotFound(id.to_string()))?;

            let winner = pick_reroll(&giveaway, self.policy.reroll, &mut rand::thread_rng())
                .ok_or(GiveawayError::NoEligibleParticipants)?;

            if self.policy.reroll == RerollPolicy::Exclude {
                let mut updated = giveaway.clone();
                updated.excluded.push(winner.clone());
                if let Err(e) = self.registry.store().archive(&updated).await {
                    warn!(giveaway = %id, error = %e, "Failed to record reroll winner");
                    metrics::record_store_failure("archive");
                }
            }
            (giveaway, winner)
        };

        if let Err(e) = self.gateway.announce_reroll(&giveaway, &winner).await {
            warn!(giveaway = %id, error = %e, "Failed to announce reroll");
            metrics::record_render_failure("reroll");
        }
        metrics::record_reroll();
        info!(giveaway = %id, winner = %winner, "Giveaway rerolled");
        Ok(winner)
    }

    /// Running give-aways, optionally only those `user_id` entered,
    /// ordered by deadline.
    pub async fn list(&self, user_id: Option<&str>, now: DateTime<Utc>) -> Vec<Giveaway> {
        let mut giveaways = self
            .registry
            .list_active(|g| !g.is_expired(now) && user_id.is_none_or(|u| g.has_participant(u)))
            .await;
        giveaways.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        giveaways
    }

    /// A page of the participant list of a live or closed give-away.
    pub async fn participants_page(&self, id: &str, page: i64) -> GiveawayResult<ParticipantPage> {
        let giveaway = match self.registry.get(id).await {
            Some(live) => live,
            None => self
                .registry
                .store()
                .load_archived(id)
                .await?
                .ok_or_else(|| GiveawayError::NotFound(id.to_string()))?,
        };

        let page = paginate(&giveaway.participants, page);
        let mut entries = Vec::with_capacity(page.items.len());
        for user_id in page.items {
            entries.push((user_id.clone(), self.display_name(user_id).await));
        }

        Ok(ParticipantPage {
            giveaway_id: giveaway.id.clone(),
            index: page.index,
            count: page.count,
            total: page.total,
            entries,
            has_prev: page.has_prev,
            has_next: page.has_next,
        })
    }

    /// Display name of a user, or the user ID if it cannot be resolved.
    pub async fn display_name(&self, user_id: &str) -> String {
        match self.gateway.resolve_display_name(user_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!(user = %user_id, error = %e, "Falling back to user ID");
                user_id.to_string()
            }
        }
    }

    /// Reload persisted give-aways and arm their closes.
    pub async fn restore(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let restored = self.registry.restore(now).await?;
        for giveaway in &restored {
            self.scheduler.schedule(&giveaway.id, giveaway.deadline);
        }
        Ok(restored.len())
    }

    async fn render_update(&self, giveaway: &Giveaway) {
        if let Err(e) = self.gateway.render_update(giveaway).await {
            warn!(giveaway = %giveaway.id, error = %e, "Failed to re-render giveaway");
            metrics::record_render_failure("update");
        }
    }
}
