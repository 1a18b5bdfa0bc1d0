//! The entity registry: discriminator → bulk-fetch capability.
//!
//! Polymorphic references are resolved through an explicit registry rather
//! than reflection: each entity kind registers an [`EntityFetcher`] able to
//! load all of its entities named in one call. The resolver
//! ([`crate::resolve`]) issues exactly one such call per distinct kind in a
//! result set.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use crate::{
  entity::Entity,
  error::{Error, FetchError, Result},
};

// ─── Fetcher ─────────────────────────────────────────────────────────────────

/// Knobs passed through to fetchers for nested eager loading. A flat backend
/// is free to ignore them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOpts {
  /// Ask the fetcher to eagerly load the entities' own related data.
  pub prefetch_related: bool,
  /// How many levels of related data to load when prefetching.
  pub depth:            u32,
}

pub type FetchFuture<'a> =
  Pin<Box<dyn Future<Output = Result<Vec<Entity>, FetchError>> + Send + 'a>>;

/// The bulk-fetch capability an entity kind registers.
///
/// `fetch_bulk` must resolve every id it can in a single backend round-trip;
/// ids with no matching entity are simply absent from the result. The trait
/// is object-safe (boxed futures) so heterogeneous fetchers can share one
/// registry.
pub trait EntityFetcher: Send + Sync {
  fn fetch_bulk<'a>(
    &'a self,
    ids: &'a [String],
    opts: FetchOpts,
  ) -> FetchFuture<'a>;
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Lookup table from discriminator string to the fetcher for that kind.
#[derive(Default, Clone)]
pub struct EntityRegistry {
  fetchers: HashMap<String, Arc<dyn EntityFetcher>>,
}

impl EntityRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register (or replace) the fetcher for `kind`.
  pub fn register(
    &mut self,
    kind: impl Into<String>,
    fetcher: Arc<dyn EntityFetcher>,
  ) {
    self.fetchers.insert(kind.into(), fetcher);
  }

  /// Resolve a discriminator to its fetcher. An unregistered kind is fatal.
  pub fn fetcher(&self, kind: &str) -> Result<&Arc<dyn EntityFetcher>> {
    self
      .fetchers
      .get(kind)
      .ok_or_else(|| Error::UnknownEntityKind(kind.to_owned()))
  }

  pub fn kinds(&self) -> impl Iterator<Item = &str> {
    self.fetchers.keys().map(String::as_str)
  }

  pub fn is_registered(&self, kind: &str) -> bool {
    self.fetchers.contains_key(kind)
  }
}

impl std::fmt::Debug for EntityRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EntityRegistry")
      .field("kinds", &self.fetchers.keys().collect::<Vec<_>>())
      .finish()
  }
}
