//! Polymorphic entity references and the resolved entities they point to.
//!
//! An [`EntityRef`] is a (kind, id) pair stored on a record; the kind names a
//! registered entity kind and the id is kept in a normalized string form so
//! integer and textual keys can coexist and compare after a bulk fetch.

use serde::{Deserialize, Serialize};

/// A polymorphic reference: which kind of entity, and which one.
///
/// The reference owns nothing — the referenced entity is only ever looked up,
/// via the fetcher registered for `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
  pub kind: String,
  pub id:   String,
}

impl EntityRef {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self { kind: kind.into(), id: id.into() }
  }

  /// Both components must be non-empty for the reference to be resolvable.
  pub fn is_valid(&self) -> bool {
    !self.kind.is_empty() && !self.id.is_empty()
  }
}

impl std::fmt::Display for EntityRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}

/// A referenced entity as returned by a bulk fetch.
///
/// `display` feeds human-readable rendering of actions and follows; `data`
/// carries whatever else the owning application stores about the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
  pub kind:    String,
  pub id:      String,
  pub display: String,
  #[serde(default)]
  pub data:    serde_json::Value,
}

impl Entity {
  /// Stand-in used when relation fetching is disabled: carries the reference
  /// itself as the display value, with no data.
  pub fn placeholder(entity_ref: &EntityRef) -> Self {
    Self {
      kind:    entity_ref.kind.clone(),
      id:      entity_ref.id.clone(),
      display: entity_ref.to_string(),
      data:    serde_json::Value::Null,
    }
  }

  pub fn entity_ref(&self) -> EntityRef {
    EntityRef::new(self.kind.clone(), self.id.clone())
  }
}
