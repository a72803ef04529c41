//! Integration test common infrastructure.
//!
//! Provides a recording messaging gateway and helpers for building an
//! engine over a real SQLite store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use giveawayd::db::Database;
use giveawayd::engine::{CloseOutcome, Engine, EnginePolicy};
use giveawayd::gateway::{GatewayError, MessagingGateway};
use giveawayd::handlers::Context;
use giveawayd::scheduler::CloseScheduler;
use giveawayd::state::{Giveaway, Member, MessageHandle, NewGiveaway, Registry};
use giveawayd::store::GiveawayStore;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const GUILD: &str = "g1";
pub const CHANNEL: &str = "c1";

/// A gateway call observed by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { title: String },
    Update { id: String, participants: Vec<String> },
    Close { id: String, outcome: CloseOutcome },
    Reroll { id: String, winner: String },
}

/// In-memory gateway that records every render.
#[derive(Default)]
pub struct RecordingGateway {
    next_message: AtomicU64,
    calls: Mutex<Vec<Call>>,
    missing: Mutex<HashSet<String>>,
    names: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    reroll_delay_ms: AtomicU64,
}

impl RecordingGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn closes(&self) -> Vec<(String, CloseOutcome)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Close { id, outcome } => Some((id, outcome)),
                _ => None,
            })
            .collect()
    }

    pub fn rerolls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Reroll { winner, .. } => Some(winner),
                _ => None,
            })
            .collect()
    }

    pub fn updates_for(&self, giveaway_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Update { id, .. } if id == giveaway_id))
            .count()
    }

    /// Pretend the public message was deleted.
    pub fn delete_message(&self, message_id: &str) {
        self.missing.lock().insert(message_id.to_string());
    }

    pub fn set_name(&self, user_id: &str, name: &str) {
        self.names
            .lock()
            .insert(user_id.to_string(), name.to_string());
    }

    /// Make every render after creation fail.
    pub fn fail_renders(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every reroll announcement take `delay` before returning.
    pub fn set_reroll_delay(&self, delay: std::time::Duration) {
        self.reroll_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("test outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn render_create(&self, giveaway: &NewGiveaway) -> Result<MessageHandle, GatewayError> {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(Call::Create {
            title: giveaway.title.clone(),
        });
        Ok(MessageHandle {
            guild_id: giveaway.guild_id.clone(),
            channel_id: giveaway.channel_id.clone(),
            message_id: format!("m{n}"),
        })
    }

    async fn render_update(&self, giveaway: &Giveaway) -> Result<(), GatewayError> {
        self.check()?;
        self.calls.lock().push(Call::Update {
            id: giveaway.id.clone(),
            participants: giveaway.participants.clone(),
        });
        Ok(())
    }

    async fn render_close(
        &self,
        giveaway: &Giveaway,
        outcome: &CloseOutcome,
    ) -> Result<(), GatewayError> {
        // Recorded before failing so attempts can be counted
        self.calls.lock().push(Call::Close {
            id: giveaway.id.clone(),
            outcome: outcome.clone(),
        });
        self.check()
    }

    async fn announce_reroll(&self, giveaway: &Giveaway, winner: &str) -> Result<(), GatewayError> {
        let delay = self.reroll_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        self.check()?;
        self.calls.lock().push(Call::Reroll {
            id: giveaway.id.clone(),
            winner: winner.to_string(),
        });
        Ok(())
    }

    async fn message_exists(&self, handle: &MessageHandle) -> Result<bool, GatewayError> {
        Ok(!self.missing.lock().contains(&handle.message_id))
    }

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        self.names
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownUser(user_id.to_string()))
    }
}

/// An engine wired to a recording gateway and a SQLite store.
pub struct TestEngine {
    pub engine: Arc<Engine>,
    pub gateway: Arc<RecordingGateway>,
    pub scheduler: Arc<CloseScheduler>,
    pub store: Arc<dyn GiveawayStore>,
}

impl TestEngine {
    /// Fresh engine over a private in-memory database.
    pub async fn new() -> Self {
        Self::with_policy(EnginePolicy::default()).await
    }

    pub async fn with_policy(policy: EnginePolicy) -> Self {
        Self::open(":memory:", policy).await
    }

    /// Engine over the database at `path`. Nothing is restored.
    pub async fn open(path: &str, policy: EnginePolicy) -> Self {
        let db = Database::new(path).await.expect("open database");
        let store: Arc<dyn GiveawayStore> = Arc::new(db);
        let registry = Arc::new(Registry::new(Arc::clone(&store)));
        let scheduler = Arc::new(CloseScheduler::new());
        let gateway = Arc::new(RecordingGateway::default());
        let engine = Arc::new(Engine::new(
            registry,
            Arc::clone(&scheduler),
            gateway.clone(),
            policy,
        ));
        Self {
            engine,
            gateway,
            scheduler,
            store,
        }
    }

    /// Create a give-away ending an hour from now.
    pub async fn create(&self, title: &str, winners: u32) -> Giveaway {
        self.create_with(title, winners, None, in_hours(1)).await
    }

    pub async fn create_with(
        &self,
        title: &str,
        winners: u32,
        role: Option<&str>,
        deadline: DateTime<Utc>,
    ) -> Giveaway {
        self.engine
            .create(NewGiveaway {
                guild_id: GUILD.to_string(),
                channel_id: CHANNEL.to_string(),
                title: title.to_string(),
                deadline,
                required_role: role.map(str::to_string),
                winners,
            })
            .await
            .expect("create giveaway")
    }

    /// Enter each user into `id` at the current time.
    pub async fn enter_all(&self, id: &str, users: &[&str]) {
        for user in users {
            self.engine
                .enter(id, &Member::new(*user), Utc::now())
                .await
                .expect("enter giveaway");
        }
    }
}

/// A deadline `hours` from now, truncated to whole seconds as stored.
pub fn in_hours(hours: i64) -> DateTime<Utc> {
    let at = Utc::now() + Duration::hours(hours);
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

/// Interaction context for `member` clicking on `message_id`.
pub fn context(member: Member, message_id: Option<&str>) -> Context {
    Context {
        member,
        guild_id: GUILD.to_string(),
        channel_id: CHANNEL.to_string(),
        message_id: message_id.map(str::to_string),
    }
}
