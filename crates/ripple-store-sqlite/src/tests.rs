//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use ripple_core::{
  action::NewAction,
  dispatch::{ActionEvent, SubjectSpec, dispatch},
  entity::{Entity, EntityRef},
  follow::FollowOptions,
  ops::{self, STARTED_FOLLOWING, STOPPED_FOLLOWING},
  resolve::{ResolveOptions, resolve_actions},
  store::{ActivityStore, StreamQuery},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn user(id: &str) -> EntityRef { EntityRef::new("user", id) }

fn poke(actor: &EntityRef) -> NewAction {
  NewAction::new(actor.clone(), "poked")
}

fn entity(kind: &str, id: &str, display: &str) -> Entity {
  Entity {
    kind:    kind.into(),
    id:      id.into(),
    display: display.into(),
    data:    serde_json::json!({}),
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_get_action() {
  let s = store().await;

  let action = s.record_action(poke(&user("1"))).await.unwrap();
  assert_eq!(action.actor, user("1"));
  assert_eq!(action.subject, Some(user("1")));
  assert!(action.public);

  let fetched = s.get_action(action.action_id).await.unwrap().unwrap();
  assert_eq!(fetched.action_id, action.action_id);
  assert_eq!(fetched.verb, "poked");
  assert_eq!(fetched.created_at, action.created_at);
}

#[tokio::test]
async fn get_action_missing_returns_none() {
  let s = store().await;
  assert!(s.get_action(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_action() {
  let s = store().await;

  let action = s.record_action(poke(&user("1"))).await.unwrap();
  assert!(s.delete_action(action.action_id).await.unwrap());
  assert!(s.get_action(action.action_id).await.unwrap().is_none());
  assert!(!s.delete_action(action.action_id).await.unwrap());
}

#[tokio::test]
async fn backfilled_timestamp_is_kept() {
  let s = store().await;

  let then = Utc::now() - Duration::days(30);
  let mut input = poke(&user("1"));
  input.created_at = Some(then);

  let action = s.record_action(input).await.unwrap();
  let fetched = s.get_action(action.action_id).await.unwrap().unwrap();
  // Column precision is microseconds.
  assert!((fetched.created_at - then).num_seconds().abs() < 1);
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dispatch_is_idempotent() {
  let s = store().await;

  let mut event = ActionEvent::new(user("1"), "commented on");
  event.target = Some(EntityRef::new("thing", "9"));

  let first = dispatch(&s, &event).await.unwrap();
  let second = dispatch(&s, &event).await.unwrap();
  assert_eq!(first.action_id, second.action_id);

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 1);
}

#[tokio::test]
async fn dispatch_distinguishes_extension_data() {
  let s = store().await;

  let mut event = ActionEvent::new(user("1"), "scored");
  event.data = Some(serde_json::json!({ "points": 10 }));
  dispatch(&s, &event).await.unwrap();

  event.data = Some(serde_json::json!({ "points": 20 }));
  dispatch(&s, &event).await.unwrap();

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 2);
}

#[tokio::test]
async fn dispatch_attributes_subject_to_target() {
  let s = store().await;

  let mut event = ActionEvent::new(user("1"), "joined");
  event.target = Some(EntityRef::new("group", "7"));
  event.subject = SubjectSpec::Target;
  dispatch(&s, &event).await.unwrap();

  let stream = s
    .subject_stream(&EntityRef::new("group", "7"), &StreamQuery::default())
    .await
    .unwrap();
  assert_eq!(stream.len(), 1);
  assert_eq!(stream[0].actor, user("1"));
}

// ─── Streams ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn actor_stream_is_newest_first() {
  let s = store().await;

  let base = Utc::now();
  for offset in [3i64, 1, 2] {
    let mut input = poke(&user("1"));
    input.created_at = Some(base - Duration::hours(offset));
    s.record_action(input).await.unwrap();
  }

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 3);
  assert!(stream.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn private_actions_hidden_from_actor_and_subject_streams() {
  let s = store().await;

  s.record_action(poke(&user("1"))).await.unwrap();
  let mut private = poke(&user("1"));
  private.verb = "whispered".into();
  private.public = false;
  s.record_action(private).await.unwrap();

  let by_actor = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(by_actor.len(), 1);
  assert_eq!(by_actor[0].verb, "poked");

  let by_subject =
    s.subject_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(by_subject.len(), 1);
  assert_eq!(by_subject[0].verb, "poked");
}

#[tokio::test]
async fn model_stream_includes_private_actions() {
  let s = store().await;

  s.record_action(poke(&user("1"))).await.unwrap();
  let mut private = poke(&user("2"));
  private.public = false;
  s.record_action(private).await.unwrap();

  let stream = s.model_stream("user", &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 2);
}

#[tokio::test]
async fn streams_paginate() {
  let s = store().await;

  let base = Utc::now();
  for i in 0..5i64 {
    let mut input = poke(&user("1"));
    input.created_at = Some(base - Duration::minutes(i));
    s.record_action(input).await.unwrap();
  }

  let full = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(full.len(), 5);

  let query = StreamQuery { limit: Some(2), offset: Some(1) };
  let page = s.actor_stream(&user("1"), &query).await.unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].action_id, full[1].action_id);
  assert_eq!(page[1].action_id, full[2].action_id);
}

#[tokio::test]
async fn oversized_page_offset_yields_empty_page() {
  let s = store().await;

  for _ in 0..3 {
    s.record_action(poke(&user("1"))).await.unwrap();
  }

  // An offset past i64::MAX must not wrap negative, which SQLite would
  // ignore and hand back the full stream.
  let query = StreamQuery { limit: Some(2), offset: Some(usize::MAX) };
  let page = s.actor_stream(&user("1"), &query).await.unwrap();
  assert!(page.is_empty());
}

// ─── Follows ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_follow_is_idempotent() {
  let s = store().await;

  let (first, created) = s.add_follow(&user("1"), &user("2")).await.unwrap();
  assert!(created);

  let (second, created) = s.add_follow(&user("1"), &user("2")).await.unwrap();
  assert!(!created);
  assert_eq!(first.follow_id, second.follow_id);

  assert_eq!(s.follows_of(&user("1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn get_follow_roundtrip() {
  let s = store().await;

  let (follow, _) = s.add_follow(&user("1"), &user("2")).await.unwrap();
  let fetched = s.get_follow(follow.follow_id).await.unwrap().unwrap();
  assert_eq!(fetched.watcher, user("1"));
  assert_eq!(fetched.subject, user("2"));
}

#[tokio::test]
async fn follow_announces_started_following() {
  let s = store().await;

  ops::follow(&s, &user("1"), &user("2"), FollowOptions::default())
    .await
    .unwrap();

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 1);
  assert_eq!(stream[0].verb, STARTED_FOLLOWING);
  assert_eq!(stream[0].target, Some(user("2")));
}

#[tokio::test]
async fn refollow_does_not_announce_again() {
  let s = store().await;

  ops::follow(&s, &user("1"), &user("2"), FollowOptions::default())
    .await
    .unwrap();
  ops::follow(&s, &user("1"), &user("2"), FollowOptions::default())
    .await
    .unwrap();

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 1);
}

#[tokio::test]
async fn follow_announcement_can_be_suppressed() {
  let s = store().await;

  ops::follow(&s, &user("1"), &user("2"), FollowOptions { announce: false })
    .await
    .unwrap();

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert!(stream.is_empty());
  assert_eq!(s.follows_of(&user("1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unfollow_removes_and_optionally_announces() {
  let s = store().await;

  ops::follow(&s, &user("1"), &user("2"), FollowOptions { announce: false })
    .await
    .unwrap();

  let removed =
    ops::unfollow(&s, &user("1"), &user("2"), FollowOptions { announce: true })
      .await
      .unwrap();
  assert_eq!(removed, 1);
  assert!(s.follows_of(&user("1")).await.unwrap().is_empty());

  let stream = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 1);
  assert_eq!(stream[0].verb, STOPPED_FOLLOWING);
}

// ─── Watcher stream ──────────────────────────────────────────────────────────

#[tokio::test]
async fn watcher_stream_empty_without_follows() {
  let s = store().await;
  let stream =
    s.watcher_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert!(stream.is_empty());
}

#[tokio::test]
async fn watcher_stream_only_includes_actions_after_follow() {
  let s = store().await;

  let (follow, _) = s.add_follow(&user("1"), &user("2")).await.unwrap();

  // One action after the follow began, one backdated before it.
  let mut after = poke(&user("2"));
  after.created_at = Some(follow.started_at + Duration::seconds(10));
  let after = s.record_action(after).await.unwrap();

  let mut before = poke(&user("2"));
  before.created_at = Some(follow.started_at - Duration::seconds(10));
  s.record_action(before).await.unwrap();

  let stream =
    s.watcher_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 1);
  assert_eq!(stream[0].action_id, after.action_id);
}

#[tokio::test]
async fn watcher_stream_merges_followed_subjects_newest_first() {
  let s = store().await;

  let (f2, _) = s.add_follow(&user("1"), &user("2")).await.unwrap();
  s.add_follow(&user("1"), &user("3")).await.unwrap();

  for (actor, offset) in [("2", 1i64), ("3", 2), ("2", 3)] {
    let mut input = poke(&user(actor));
    input.created_at = Some(f2.started_at + Duration::minutes(offset));
    s.record_action(input).await.unwrap();
  }

  let stream =
    s.watcher_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 3);
  assert!(stream.windows(2).all(|w| w[0].created_at >= w[1].created_at));
  assert_eq!(stream[0].actor, user("2"));
  assert_eq!(stream[1].actor, user("3"));
}

#[tokio::test]
async fn watcher_stream_excludes_private_actions() {
  let s = store().await;

  let (follow, _) = s.add_follow(&user("1"), &user("2")).await.unwrap();

  let mut private = poke(&user("2"));
  private.public = false;
  private.created_at = Some(follow.started_at + Duration::seconds(10));
  s.record_action(private).await.unwrap();

  let stream =
    s.watcher_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert!(stream.is_empty());
}

// ─── Entity directory ────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_upsert_get_remove() {
  let s = store().await;
  let directory = s.entity_directory();

  directory.upsert(&entity("user", "1", "alice")).await.unwrap();
  directory.upsert(&entity("user", "1", "Alice L.")).await.unwrap();

  let fetched = directory.get("user", "1").await.unwrap().unwrap();
  assert_eq!(fetched.display, "Alice L.");

  assert!(directory.remove("user", "1").await.unwrap());
  assert!(directory.get("user", "1").await.unwrap().is_none());
}

#[tokio::test]
async fn directory_kinds_and_registry() {
  let s = store().await;
  let directory = s.entity_directory();

  directory.upsert(&entity("user", "1", "alice")).await.unwrap();
  directory.upsert(&entity("group", "7", "rustaceans")).await.unwrap();

  assert_eq!(directory.kinds().await.unwrap(), vec!["group", "user"]);

  let registry = directory.registry().await.unwrap();
  assert!(registry.is_registered("user"));
  assert!(registry.is_registered("group"));
  assert!(!registry.is_registered("comet"));
}

// ─── End-to-end resolution ───────────────────────────────────────────────────

#[tokio::test]
async fn comment_scenario_resolves_and_renders() {
  let s = store().await;
  let directory = s.entity_directory();

  directory.upsert(&entity("user", "1", "A")).await.unwrap();
  directory.upsert(&entity("thing", "9", "T")).await.unwrap();

  let mut event = ActionEvent::new(user("1"), "commented on");
  event.target = Some(EntityRef::new("thing", "9"));
  dispatch(&s, &event).await.unwrap();

  let registry = directory.registry().await.unwrap();

  let by_actor = s.actor_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  let by_subject =
    s.subject_stream(&user("1"), &StreamQuery::default()).await.unwrap();
  assert_eq!(by_actor.len(), 1);
  assert_eq!(by_subject.len(), 1);

  let resolved =
    resolve_actions(&registry, &ResolveOptions::default(), by_actor)
      .await
      .unwrap();
  assert_eq!(resolved.len(), 1);
  assert_eq!(resolved[0].render_at(Utc::now()), "A commented on T just now");
}

#[tokio::test]
async fn dangling_actor_dropped_dangling_target_cleared() {
  let s = store().await;
  let directory = s.entity_directory();

  directory.upsert(&entity("user", "1", "alice")).await.unwrap();
  directory.upsert(&entity("user", "2", "bob")).await.unwrap();
  directory.upsert(&entity("thing", "9", "T")).await.unwrap();

  let mut keep = poke(&user("1"));
  keep.target = Some(EntityRef::new("thing", "404")); // never existed
  s.record_action(keep).await.unwrap();
  s.record_action(poke(&user("2"))).await.unwrap();

  // The second actor disappears after acting.
  directory.remove("user", "2").await.unwrap();

  let registry = directory.registry().await.unwrap();
  let stream = s.model_stream("user", &StreamQuery::default()).await.unwrap();
  assert_eq!(stream.len(), 2);

  let resolved =
    resolve_actions(&registry, &ResolveOptions::default(), stream)
      .await
      .unwrap();

  // bob's row dropped (mandatory actor missing); alice's kept with the
  // optional target cleared.
  assert_eq!(resolved.len(), 1);
  assert_eq!(resolved[0].actor.display, "alice");
  assert!(resolved[0].target.is_none());
}
