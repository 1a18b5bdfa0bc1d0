//! Batch resolution of polymorphic references.
//!
//! A page of actions carries up to three references each (actor, subject,
//! target), pointing at heterogeneous entity kinds. Resolving them one by one
//! would cost up to N×M point lookups; this module collapses that to exactly
//! one bulk fetch per distinct kind, independent of row count — the
//! generic-relation analogue of an eager-load / join-fetch optimization.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
  action::Action,
  entity::{Entity, EntityRef},
  error::{Error, Result},
  follow::Follow,
  registry::{EntityRegistry, FetchOpts},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Resolver behavior, threaded in explicitly by the caller — never read from
/// ambient global state.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
  /// When `false`, skip all entity fetching; references are filled with
  /// placeholder entities derived from the refs themselves.
  pub fetch_relations:  bool,
  /// Ask each fetcher to eagerly load its entities' own related data.
  pub prefetch_related: bool,
  /// Nested eager-load depth passed through to fetchers.
  pub depth:            u32,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self { fetch_relations: true, prefetch_related: false, depth: 0 }
  }
}

// ─── Resolved records ────────────────────────────────────────────────────────

/// An action bundled with the entities its references resolve to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAction {
  pub action:  Action,
  pub actor:   Entity,
  pub subject: Option<Entity>,
  pub target:  Option<Entity>,
}

/// A follow bundled with its resolved watcher and subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedFollow {
  pub follow:  Follow,
  pub watcher: Entity,
  pub subject: Entity,
}

// ─── Entity map ──────────────────────────────────────────────────────────────

/// All entities needed by one batch, keyed by (kind, id).
struct EntityMap {
  entities: HashMap<(String, String), Entity>,
}

impl EntityMap {
  /// Issue one bulk fetch per distinct kind in `wanted` and collect the
  /// results. An unregistered kind is fatal; individually missing entities
  /// are simply absent from the map.
  async fn fetch(
    registry: &EntityRegistry,
    options: &ResolveOptions,
    wanted: BTreeMap<String, BTreeSet<String>>,
  ) -> Result<Self> {
    let opts = FetchOpts {
      prefetch_related: options.prefetch_related,
      depth:            options.depth,
    };

    let mut entities = HashMap::new();
    for (kind, ids) in wanted {
      let fetcher = registry.fetcher(&kind)?;
      let ids: Vec<String> = ids.into_iter().collect();
      let fetched = fetcher
        .fetch_bulk(&ids, opts)
        .await
        .map_err(|source| Error::Fetch { kind: kind.clone(), source })?;
      for entity in fetched {
        entities.insert((entity.kind.clone(), entity.id.clone()), entity);
      }
    }

    Ok(Self { entities })
  }

  fn get(&self, entity_ref: &EntityRef) -> Option<Entity> {
    self
      .entities
      .get(&(entity_ref.kind.clone(), entity_ref.id.clone()))
      .cloned()
  }
}

/// Accumulate a reference into the per-kind id sets. Absent and malformed
/// references are skipped entirely.
fn want(
  wanted: &mut BTreeMap<String, BTreeSet<String>>,
  entity_ref: Option<&EntityRef>,
) {
  if let Some(r) = entity_ref
    && r.is_valid()
  {
    wanted.entry(r.kind.clone()).or_default().insert(r.id.clone());
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Resolve the references on a page of actions.
///
/// Original order is preserved. An action whose actor no longer exists is
/// excluded from the result (dangling-reference policy); a missing subject or
/// target entity is cleared to `None` since those references are optional.
pub async fn resolve_actions(
  registry: &EntityRegistry,
  options: &ResolveOptions,
  actions: Vec<Action>,
) -> Result<Vec<ResolvedAction>> {
  if !options.fetch_relations {
    return Ok(
      actions
        .into_iter()
        .map(|action| ResolvedAction {
          actor:   Entity::placeholder(&action.actor),
          subject: action.subject.as_ref().map(Entity::placeholder),
          target:  action.target.as_ref().map(Entity::placeholder),
          action,
        })
        .collect(),
    );
  }

  let mut wanted: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
  for action in &actions {
    want(&mut wanted, Some(&action.actor));
    want(&mut wanted, action.subject.as_ref());
    want(&mut wanted, action.target.as_ref());
  }

  let map = EntityMap::fetch(registry, options, wanted).await?;

  let mut resolved = Vec::with_capacity(actions.len());
  for action in actions {
    // Mandatory reference: a dangling actor drops the row.
    let Some(actor) = map.get(&action.actor) else { continue };
    let subject = action.subject.as_ref().and_then(|r| map.get(r));
    let target = action.target.as_ref().and_then(|r| map.get(r));
    resolved.push(ResolvedAction { action, actor, subject, target });
  }

  Ok(resolved)
}

// ─── Follows ─────────────────────────────────────────────────────────────────

/// Resolve the references on a list of follows. Both sides are mandatory, so
/// a follow with either side dangling is excluded.
pub async fn resolve_follows(
  registry: &EntityRegistry,
  options: &ResolveOptions,
  follows: Vec<Follow>,
) -> Result<Vec<ResolvedFollow>> {
  if !options.fetch_relations {
    return Ok(
      follows
        .into_iter()
        .map(|follow| ResolvedFollow {
          watcher: Entity::placeholder(&follow.watcher),
          subject: Entity::placeholder(&follow.subject),
          follow,
        })
        .collect(),
    );
  }

  let mut wanted: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
  for follow in &follows {
    want(&mut wanted, Some(&follow.watcher));
    want(&mut wanted, Some(&follow.subject));
  }

  let map = EntityMap::fetch(registry, options, wanted).await?;

  let mut resolved = Vec::with_capacity(follows.len());
  for follow in follows {
    let Some(watcher) = map.get(&follow.watcher) else { continue };
    let Some(subject) = map.get(&follow.subject) else { continue };
    resolved.push(ResolvedFollow { follow, watcher, subject });
  }

  Ok(resolved)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::registry::{EntityFetcher, FetchFuture};

  /// In-memory fetcher over a fixed entity set, counting bulk-fetch calls.
  struct MapFetcher {
    entities: HashMap<String, Entity>,
    calls:    Arc<AtomicUsize>,
  }

  impl MapFetcher {
    fn new(
      kind: &str,
      ids: &[(&str, &str)],
      calls: Arc<AtomicUsize>,
    ) -> Self {
      let entities = ids
        .iter()
        .map(|(id, display)| {
          (
            (*id).to_owned(),
            Entity {
              kind:    kind.to_owned(),
              id:      (*id).to_owned(),
              display: (*display).to_owned(),
              data:    serde_json::Value::Null,
            },
          )
        })
        .collect();
      Self { entities, calls }
    }
  }

  impl EntityFetcher for MapFetcher {
    fn fetch_bulk<'a>(
      &'a self,
      ids: &'a [String],
      _opts: FetchOpts,
    ) -> FetchFuture<'a> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Box::pin(async move {
        Ok(
          ids
            .iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect(),
        )
      })
    }
  }

  fn registry_with(
    kinds: &[(&str, &[(&str, &str)])],
  ) -> (EntityRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = EntityRegistry::new();
    for (kind, ids) in kinds {
      registry
        .register(*kind, Arc::new(MapFetcher::new(kind, ids, calls.clone())));
    }
    (registry, calls)
  }

  fn action(actor: EntityRef, target: Option<EntityRef>) -> Action {
    Action {
      action_id:   Uuid::new_v4(),
      subject:     Some(actor.clone()),
      actor,
      verb:        "poked".into(),
      description: None,
      target,
      public:      true,
      data:        None,
      created_at:  Utc::now(),
    }
  }

  #[tokio::test]
  async fn one_bulk_fetch_per_distinct_kind() {
    let (registry, calls) = registry_with(&[
      ("user", &[("1", "alice"), ("2", "bob"), ("3", "carol")]),
      ("group", &[("10", "rustaceans")]),
    ]);

    // Many rows, two distinct kinds across all reference fields.
    let actions: Vec<Action> = (1..=3)
      .map(|i| {
        action(
          EntityRef::new("user", i.to_string()),
          Some(EntityRef::new("group", "10")),
        )
      })
      .collect();

    let resolved =
      resolve_actions(&registry, &ResolveOptions::default(), actions)
        .await
        .unwrap();

    assert_eq!(resolved.len(), 3);
    // K = 2 distinct kinds → exactly 2 bulk fetches, regardless of row count.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn resolution_matches_direct_lookup() {
    let (registry, _) = registry_with(&[("user", &[("1", "alice")])]);

    let actions = vec![action(EntityRef::new("user", "1"), None)];
    let resolved =
      resolve_actions(&registry, &ResolveOptions::default(), actions)
        .await
        .unwrap();

    assert_eq!(resolved[0].actor.display, "alice");
    assert_eq!(resolved[0].actor.entity_ref(), EntityRef::new("user", "1"));
    // Subject defaulted to the actor resolves to the same entity.
    assert_eq!(resolved[0].subject.as_ref().unwrap().display, "alice");
  }

  #[tokio::test]
  async fn dangling_actor_drops_only_that_row() {
    let (registry, _) = registry_with(&[("user", &[("1", "alice")])]);

    let actions = vec![
      action(EntityRef::new("user", "1"), None),
      action(EntityRef::new("user", "999"), None), // deleted entity
      action(EntityRef::new("user", "1"), None),
    ];

    let resolved =
      resolve_actions(&registry, &ResolveOptions::default(), actions)
        .await
        .unwrap();

    assert_eq!(resolved.len(), 2);
    assert!(resolved.iter().all(|r| r.actor.display == "alice"));
  }

  #[tokio::test]
  async fn dangling_target_is_cleared_not_dropped() {
    let (registry, _) = registry_with(&[
      ("user", &[("1", "alice")]),
      ("group", &[]), // kind registered, entity gone
    ]);

    let actions = vec![action(
      EntityRef::new("user", "1"),
      Some(EntityRef::new("group", "404")),
    )];

    let resolved =
      resolve_actions(&registry, &ResolveOptions::default(), actions)
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].target.is_none());
  }

  #[tokio::test]
  async fn unknown_kind_is_fatal() {
    let (registry, _) = registry_with(&[("user", &[("1", "alice")])]);

    let actions = vec![action(
      EntityRef::new("user", "1"),
      Some(EntityRef::new("comet", "1")),
    )];

    let err = resolve_actions(&registry, &ResolveOptions::default(), actions)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::UnknownEntityKind(k) if k == "comet"));
  }

  #[tokio::test]
  async fn order_preserved() {
    let (registry, _) =
      registry_with(&[("user", &[("1", "alice"), ("2", "bob")])]);

    let actions = vec![
      action(EntityRef::new("user", "2"), None),
      action(EntityRef::new("user", "1"), None),
      action(EntityRef::new("user", "2"), None),
    ];
    let ids: Vec<Uuid> = actions.iter().map(|a| a.action_id).collect();

    let resolved =
      resolve_actions(&registry, &ResolveOptions::default(), actions)
        .await
        .unwrap();

    let resolved_ids: Vec<Uuid> =
      resolved.iter().map(|r| r.action.action_id).collect();
    assert_eq!(resolved_ids, ids);
  }

  #[tokio::test]
  async fn fetch_relations_disabled_yields_placeholders() {
    // No fetchers registered at all — nothing should be looked up.
    let registry = EntityRegistry::new();
    let options = ResolveOptions { fetch_relations: false, ..Default::default() };

    let actions = vec![action(EntityRef::new("user", "1"), None)];
    let resolved =
      resolve_actions(&registry, &options, actions).await.unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].actor.display, "user/1");
  }

  #[tokio::test]
  async fn follows_resolve_and_drop_dangling() {
    let (registry, calls) =
      registry_with(&[("user", &[("1", "alice"), ("2", "bob")])]);

    let follow = |watcher: &str, subject: &str| Follow {
      follow_id:  Uuid::new_v4(),
      watcher:    EntityRef::new("user", watcher),
      subject:    EntityRef::new("user", subject),
      started_at: Utc::now(),
    };

    let follows = vec![follow("1", "2"), follow("1", "404")];
    let resolved =
      resolve_follows(&registry, &ResolveOptions::default(), follows)
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].watcher.display, "alice");
    assert_eq!(resolved[0].subject.display, "bob");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
