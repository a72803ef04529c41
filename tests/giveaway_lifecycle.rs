//! Integration tests for the give-away lifecycle: entry, leave, close,
//! reroll, and moderator removal.

mod common;

use chrono::{Duration, Utc};
use common::{Call, TestEngine, in_hours};
use giveawayd::engine::{CloseOutcome, EnginePolicy, EnterOutcome, ReentryPolicy, RerollPolicy};
use giveawayd::error::GiveawayError;
use giveawayd::state::Member;
use std::collections::HashSet;
use std::sync::Arc;

fn admin() -> Member {
    Member::new("admin").as_administrator()
}

#[tokio::test]
async fn close_draws_one_winner_from_participants() {
    let t = TestEngine::new().await;
    let g = t.create("G1", 1).await;
    t.enter_all(&g.id, &["A", "B", "C"]).await;

    let outcome = t.engine.close(&g.id).await.expect("first close");
    let winners = outcome.winners().to_vec();
    assert_eq!(winners.len(), 1);
    assert!(["A", "B", "C"].contains(&winners[0].as_str()));

    assert!(t.engine.registry().get(&g.id).await.is_none());
    assert!(!t.scheduler.is_armed(&g.id));

    let archived = t.store.load_archived(&g.id).await.unwrap().expect("archived");
    let entrants: HashSet<_> = archived.participants.iter().cloned().collect();
    assert_eq!(entrants, HashSet::from(["A".into(), "B".into(), "C".into()]));
    assert_eq!(archived.excluded, winners);
    assert!(t.store.load_all().await.unwrap().is_empty());

    assert_eq!(t.gateway.closes(), vec![(g.id.clone(), outcome)]);
}

#[tokio::test]
async fn second_close_is_a_noop() {
    let t = TestEngine::new().await;
    let g = t.create("Once", 1).await;
    t.enter_all(&g.id, &["A"]).await;

    assert!(t.engine.close(&g.id).await.is_some());
    assert!(t.engine.close(&g.id).await.is_none());
    assert_eq!(t.gateway.closes().len(), 1);
}

#[tokio::test]
async fn concurrent_closes_announce_once() {
    let t = TestEngine::new().await;
    let g = t.create("Race", 1).await;
    t.enter_all(&g.id, &["A", "B"]).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&t.engine);
        let id = g.id.clone();
        tasks.push(tokio::spawn(async move { engine.close(&id).await }));
    }

    let mut closed = 0;
    for task in tasks {
        if task.await.unwrap().is_some() {
            closed += 1;
        }
    }
    assert_eq!(closed, 1);
    assert_eq!(t.gateway.closes().len(), 1);
}

#[tokio::test]
async fn close_without_participants_announces_no_entries() {
    let t = TestEngine::new().await;
    let g = t.create("Empty", 3).await;

    assert_eq!(t.engine.close(&g.id).await, Some(CloseOutcome::NoParticipants));
    assert!(t.engine.registry().is_empty().await);
}

#[tokio::test]
async fn winner_count_is_clamped_to_participants() {
    let t = TestEngine::new().await;
    let g = t.create("Five", 5).await;
    t.enter_all(&g.id, &["A", "B", "C"]).await;

    let outcome = t.engine.close(&g.id).await.expect("closed");
    let winners: HashSet<_> = outcome.winners().iter().cloned().collect();
    assert_eq!(outcome.winners().len(), 3);
    assert_eq!(winners, HashSet::from(["A".into(), "B".into(), "C".into()]));
}

#[tokio::test]
async fn deleted_message_closes_without_a_draw() {
    let t = TestEngine::new().await;
    let g = t.create("Gone", 1).await;
    t.enter_all(&g.id, &["A", "B"]).await;
    t.gateway.delete_message(&g.message_id);

    assert_eq!(t.engine.close(&g.id).await, Some(CloseOutcome::MessageMissing));
    assert!(t.engine.registry().get(&g.id).await.is_none());
    assert!(t.store.load_all().await.unwrap().is_empty());
    assert!(t.store.load_archived(&g.id).await.unwrap().is_none());
}

#[tokio::test]
async fn render_failures_do_not_undo_changes() {
    let t = TestEngine::new().await;
    let g = t.create("Outage", 1).await;
    t.gateway.fail_renders(true);

    let outcome = t.engine.enter(&g.id, &Member::new("A"), Utc::now()).await;
    assert_eq!(outcome.unwrap(), EnterOutcome::Entered);
    assert_eq!(t.store.load_all().await.unwrap()[0].participants, vec!["A"]);

    let outcome = t.engine.close(&g.id).await.expect("closed");
    assert_eq!(outcome.winners(), ["A".to_string()]);
    assert!(t.store.load_archived(&g.id).await.unwrap().is_some());
}

#[tokio::test]
async fn entering_twice_requires_confirmation_to_leave() {
    let t = TestEngine::new().await;
    let g = t.create("Twice", 1).await;
    let a = Member::new("A");

    assert_eq!(t.engine.enter(&g.id, &a, Utc::now()).await.unwrap(), EnterOutcome::Entered);
    assert_eq!(
        t.engine.enter(&g.id, &a, Utc::now()).await.unwrap(),
        EnterOutcome::ConfirmLeave
    );
    assert_eq!(t.engine.registry().get(&g.id).await.unwrap().participants, vec!["A"]);

    let err = t.engine.confirm_leave(&g.id, "A", "leave").await.unwrap_err();
    assert!(matches!(err, GiveawayError::InvalidConfirmation));
    assert!(t.engine.registry().get(&g.id).await.unwrap().has_participant("A"));

    t.engine.confirm_leave(&g.id, "A", "LEAVE").await.unwrap();
    assert!(t.engine.registry().get(&g.id).await.unwrap().participants.is_empty());
    assert!(t.store.load_all().await.unwrap()[0].participants.is_empty());
}

#[tokio::test]
async fn ignore_policy_reports_already_entered() {
    let t = TestEngine::with_policy(EnginePolicy {
        reentry: ReentryPolicy::Ignore,
        ..EnginePolicy::default()
    })
    .await;
    let g = t.create("Ignore", 1).await;
    let a = Member::new("A");

    t.engine.enter(&g.id, &a, Utc::now()).await.unwrap();
    assert_eq!(
        t.engine.enter(&g.id, &a, Utc::now()).await.unwrap(),
        EnterOutcome::AlreadyEntered
    );
}

#[tokio::test]
async fn entering_after_deadline_is_rejected() {
    let t = TestEngine::new().await;
    let g = t.create("Late", 1).await;

    let err = t
        .engine
        .enter(&g.id, &Member::new("A"), g.deadline)
        .await
        .unwrap_err();
    assert!(matches!(err, GiveawayError::AlreadyEnded));
    assert!(t.engine.registry().get(&g.id).await.unwrap().participants.is_empty());
    assert_eq!(t.gateway.updates_for(&g.id), 0);
}

#[tokio::test]
async fn required_role_gates_entry() {
    let t = TestEngine::new().await;
    let g = t.create_with("Roles", 1, Some("vip"), in_hours(1)).await;

    let err = t
        .engine
        .enter(&g.id, &Member::new("A"), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, GiveawayError::RoleRequired(role) if role == "vip"));

    let vip = Member::new("B").with_roles(["vip"]);
    assert_eq!(t.engine.enter(&g.id, &vip, Utc::now()).await.unwrap(), EnterOutcome::Entered);
}

#[tokio::test]
async fn entering_unknown_giveaway_is_not_found() {
    let t = TestEngine::new().await;
    let err = t
        .engine
        .enter("nope", &Member::new("A"), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, GiveawayError::NotFound(id) if id == "nope"));
}

#[tokio::test]
async fn concurrent_entries_never_duplicate() {
    let t = TestEngine::new().await;
    let g = t.create("Crowd", 1).await;

    let mut tasks = Vec::new();
    for i in 0..40 {
        let engine = Arc::clone(&t.engine);
        let id = g.id.clone();
        // Every user clicks twice
        let user = format!("u{}", i % 20);
        tasks.push(tokio::spawn(async move {
            engine.enter(&id, &Member::new(user), Utc::now()).await
        }));
    }

    let mut entered = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == EnterOutcome::Entered {
            entered += 1;
        }
    }
    assert_eq!(entered, 20);

    let live = t.engine.registry().get(&g.id).await.unwrap();
    let unique: HashSet<_> = live.participants.iter().collect();
    assert_eq!(live.participants.len(), 20);
    assert_eq!(unique.len(), 20);
    assert_eq!(t.store.load_all().await.unwrap()[0].participants, live.participants);
}

#[tokio::test]
async fn leave_keeps_the_order_of_the_rest() {
    let t = TestEngine::new().await;
    let g = t.create("Order", 1).await;
    t.enter_all(&g.id, &["A", "B", "C"]).await;

    let left = t.engine.leave(&g.id, "B").await.unwrap();
    assert_eq!(left.participants, vec!["A", "C"]);

    let err = t.engine.leave(&g.id, "B").await.unwrap_err();
    assert!(matches!(err, GiveawayError::NotParticipant(user) if user == "B"));
    assert_eq!(
        t.gateway.calls().last(),
        Some(&Call::Update {
            id: g.id.clone(),
            participants: vec!["A".into(), "C".into()],
        })
    );
}

#[tokio::test]
async fn leave_all_skips_expired_and_sorts_by_deadline() {
    let t = TestEngine::new().await;
    let first = t.create_with("First", 1, None, in_hours(1)).await;
    let third = t.create_with("Third", 1, None, in_hours(3)).await;
    let second = t.create_with("Second", 1, None, in_hours(2)).await;
    for g in [&first, &second, &third] {
        t.enter_all(&g.id, &["A", "B"]).await;
    }

    // First has already ended at this instant
    let left = t.engine.leave_all("A", Utc::now() + Duration::minutes(90)).await;
    let titles: Vec<_> = left.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, ["Second", "Third"]);

    assert!(t.engine.registry().get(&first.id).await.unwrap().has_participant("A"));
    assert_eq!(t.engine.registry().get(&second.id).await.unwrap().participants, vec!["B"]);
    assert!(t.engine.leave_all("A", Utc::now() + Duration::minutes(90)).await.is_empty());
}

#[tokio::test]
async fn list_filters_by_participant_and_sorts() {
    let t = TestEngine::new().await;
    let late = t.create_with("Late", 1, None, in_hours(5)).await;
    let early = t.create_with("Early", 1, None, in_hours(1)).await;
    t.enter_all(&late.id, &["A"]).await;

    let all: Vec<_> = t
        .engine
        .list(None, Utc::now())
        .await
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(all, vec![early.id.clone(), late.id.clone()]);

    let mine = t.engine.list(Some("A"), Utc::now()).await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, late.id);

    assert!(t.engine.list(None, in_hours(6)).await.is_empty());
}

#[tokio::test]
async fn removal_requires_moderator() {
    let t = TestEngine::with_policy(EnginePolicy {
        allowed_roles: vec!["mods".to_string()],
        ..EnginePolicy::default()
    })
    .await;
    let g = t.create("Mods", 1).await;
    t.enter_all(&g.id, &["A", "B"]).await;

    let err = t
        .engine
        .remove_participant(&Member::new("B"), &g.id, "A")
        .await
        .unwrap_err();
    assert!(matches!(err, GiveawayError::Forbidden));

    let err = t
        .engine
        .remove_participant(&admin(), &g.id, "Z")
        .await
        .unwrap_err();
    assert!(matches!(err, GiveawayError::NotParticipant(user) if user == "Z"));

    let moderator = Member::new("M").with_roles(["mods"]);
    let after = t.engine.remove_participant(&moderator, &g.id, "A").await.unwrap();
    assert_eq!(after.participants, vec!["B"]);
}

#[tokio::test]
async fn reroll_after_close_uses_the_archive() {
    let t = TestEngine::new().await;
    let g = t.create("Again", 1).await;
    t.enter_all(&g.id, &["A", "B", "C"]).await;
    t.engine.close(&g.id).await.expect("closed");

    let err = t.engine.reroll(&Member::new("A"), &g.id).await.unwrap_err();
    assert!(matches!(err, GiveawayError::Forbidden));

    let winner = t.engine.reroll(&admin(), &g.id).await.unwrap();
    assert!(["A", "B", "C"].contains(&winner.as_str()));
    assert_eq!(t.gateway.rerolls(), vec![winner]);

    let err = t.engine.reroll(&admin(), "unknown").await.unwrap_err();
    assert!(matches!(err, GiveawayError::NotFound(_)));
}

#[tokio::test]
async fn exclude_policy_never_repeats_a_winner() {
    let t = TestEngine::with_policy(EnginePolicy {
        reroll: RerollPolicy::Exclude,
        ..EnginePolicy::default()
    })
    .await;
    let g = t.create("Exclusive", 2).await;
    t.enter_all(&g.id, &["A", "B", "C"]).await;

    let outcome = t.engine.close(&g.id).await.expect("closed");
    let drawn: HashSet<_> = outcome.winners().iter().cloned().collect();

    let rerolled = t.engine.reroll(&admin(), &g.id).await.unwrap();
    assert!(!drawn.contains(&rerolled));

    let err = t.engine.reroll(&admin(), &g.id).await.unwrap_err();
    assert!(matches!(err, GiveawayError::NoEligibleParticipants));

    let archived = t.store.load_archived(&g.id).await.unwrap().unwrap();
    assert_eq!(archived.excluded.len(), 3);
}

#[tokio::test]
async fn reroll_with_no_participants_is_rejected() {
    let t = TestEngine::new().await;
    let g = t.create("Nobody", 1).await;
    t.engine.close(&g.id).await.expect("closed");

    let err = t.engine.reroll(&admin(), &g.id).await.unwrap_err();
    assert!(matches!(err, GiveawayError::NoEligibleParticipants));
}

#[tokio::test]
async fn reroll_of_running_giveaway_is_rejected() {
    let t = TestEngine::new().await;
    let g = t.create("Running", 1).await;
    t.enter_all(&g.id, &["A", "B"]).await;

    let err = t.engine.reroll(&admin(), &g.id).await.unwrap_err();
    assert!(matches!(err, GiveawayError::StillRunning));
    assert!(t.gateway.rerolls().is_empty());
    assert!(t.engine.registry().get(&g.id).await.is_some());
}

#[tokio::test]
async fn slow_reroll_announcements_do_not_serialize() {
    let t = TestEngine::new().await;
    let mut ids = Vec::new();
    for title in ["First", "Second"] {
        let g = t.create(title, 1).await;
        t.enter_all(&g.id, &["A", "B"]).await;
        t.engine.close(&g.id).await.expect("closed");
        ids.push(g.id);
    }
    t.gateway.set_reroll_delay(std::time::Duration::from_millis(500));

    let started = std::time::Instant::now();
    let tasks: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&t.engine);
            tokio::spawn(async move { engine.reroll(&admin(), &id).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(started.elapsed() < std::time::Duration::from_millis(900));
    assert_eq!(t.gateway.rerolls().len(), 2);
}

#[tokio::test]
async fn participant_pages_resolve_names() {
    let t = TestEngine::new().await;
    let g = t.create("Pages", 1).await;
    let users: Vec<String> = (0..25).map(|i| format!("u{i:02}")).collect();
    let refs: Vec<&str> = users.iter().map(String::as_str).collect();
    t.enter_all(&g.id, &refs).await;
    t.gateway.set_name("u00", "Ada");

    let page = t.engine.participants_page(&g.id, 0).await.unwrap();
    assert_eq!((page.index, page.count, page.total), (0, 3, 25));
    assert_eq!(page.entries.len(), 10);
    assert_eq!(page.entries[0], ("u00".to_string(), "Ada".to_string()));
    assert_eq!(page.entries[1], ("u01".to_string(), "u01".to_string()));
    assert!(!page.has_prev && page.has_next);

    let last = t.engine.participants_page(&g.id, 99).await.unwrap();
    assert_eq!(last.index, 2);
    assert_eq!(last.entries.len(), 5);
    assert!(last.has_prev && !last.has_next);

    t.engine.close(&g.id).await.expect("closed");
    let archived = t.engine.participants_page(&g.id, 0).await.unwrap();
    assert_eq!(archived.total, 25);
}

#[tokio::test]
async fn scheduler_closes_at_the_deadline() {
    let t = TestEngine::new().await;
    let engine = Arc::clone(&t.engine);
    let runner = tokio::spawn(t.scheduler.clone().run(move |id| {
        let engine = Arc::clone(&engine);
        async move {
            engine.close(&id).await;
        }
    }));

    let g = t
        .create_with("Soon", 1, None, Utc::now() + Duration::milliseconds(200))
        .await;
    t.enter_all(&g.id, &["A"]).await;

    let closed = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            if !t.gateway.closes().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "giveaway was not closed by the scheduler");
    assert_eq!(t.gateway.closes()[0].1, CloseOutcome::Winners(vec!["A".into()]));

    runner.abort();
}
