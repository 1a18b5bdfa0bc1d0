//! Event dispatch: turn an [`ActionEvent`] into exactly one persisted action.
//!
//! This crate defines only the handler; the notification channel that
//! delivers events to it (HTTP endpoint, in-process bus, whatever the
//! embedding application wires up) is the embedder's concern.

use thiserror::Error;

use crate::{
  action::{Action, NewAction},
  entity::EntityRef,
  store::ActivityStore,
};

// ─── Event ───────────────────────────────────────────────────────────────────

/// Which entity the action is attributed to — i.e. whose stream it lands in.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum SubjectSpec {
  /// Attribute to the actor (the default).
  #[default]
  Actor,
  /// Attribute to the event's target.
  Target,
  /// Attribute to an arbitrary entity.
  Entity(EntityRef),
}

fn default_public() -> bool { true }

/// The payload emitted when something happens: "actor did verb (to target)".
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActionEvent {
  pub actor:       EntityRef,
  pub verb:        String,
  #[serde(default)]
  pub target:      Option<EntityRef>,
  #[serde(default)]
  pub subject:     SubjectSpec,
  #[serde(default = "default_public")]
  pub public:      bool,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub data:        Option<serde_json::Value>,
}

impl ActionEvent {
  pub fn new(actor: EntityRef, verb: impl Into<String>) -> Self {
    Self {
      actor,
      verb: verb.into(),
      target: None,
      subject: SubjectSpec::default(),
      public: true,
      description: None,
      data: None,
    }
  }
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DispatchError {
  /// A reference on the event is unusable — a configuration or programming
  /// error at the call site, reported immediately and never retried.
  #[error("invalid entity reference: {0}")]
  InvalidReference(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

pub(crate) fn validated(
  entity_ref: &EntityRef,
  role: &str,
) -> DispatchResult<EntityRef> {
  if !entity_ref.is_valid() {
    return Err(DispatchError::InvalidReference(format!(
      "{role} reference {entity_ref:?} is missing a kind or an id"
    )));
  }
  Ok(entity_ref.clone())
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Build the candidate action for `event` without touching the store.
///
/// Resolves the subject per [`SubjectSpec`]: the actor by default, the target
/// when so designated (an error if the event has none), or an explicit
/// entity.
pub fn candidate_action(event: &ActionEvent) -> DispatchResult<NewAction> {
  let actor = validated(&event.actor, "actor")?;

  let target = event
    .target
    .as_ref()
    .map(|t| validated(t, "target"))
    .transpose()?;

  let subject = match &event.subject {
    SubjectSpec::Actor => actor.clone(),
    SubjectSpec::Target => target.clone().ok_or_else(|| {
      DispatchError::InvalidReference(
        "subject designates the target, but the event has no target".into(),
      )
    })?,
    SubjectSpec::Entity(entity_ref) => validated(entity_ref, "subject")?,
  };

  Ok(NewAction {
    actor,
    verb: event.verb.clone(),
    description: event.description.clone(),
    subject: Some(subject),
    target,
    public: event.public,
    data: event.data.clone(),
    created_at: None,
  })
}

/// Persist the action described by `event`, reusing an existing exact match
/// rather than duplicating it.
///
/// Idempotent: dispatching the same event twice leaves exactly one matching
/// record in the store, and no record is ever overwritten.
pub async fn dispatch<S>(store: &S, event: &ActionEvent) -> DispatchResult<Action>
where
  S: ActivityStore,
{
  let candidate = candidate_action(event)?;

  if let Some(existing) = store
    .find_action(&candidate)
    .await
    .map_err(|e| DispatchError::Store(Box::new(e)))?
  {
    return Ok(existing);
  }

  store
    .record_action(candidate)
    .await
    .map_err(|e| DispatchError::Store(Box::new(e)))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
