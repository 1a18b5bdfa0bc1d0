//! Follow / unfollow helpers.
//!
//! Thin orchestration over any [`ActivityStore`]: change the relationship,
//! and (unless suppressed) announce it as an action in the stream.

use crate::{
  dispatch::{ActionEvent, DispatchError, DispatchResult, dispatch, validated},
  entity::EntityRef,
  follow::{Follow, FollowOptions},
  store::ActivityStore,
};

/// Verb dispatched when a follow is created.
pub const STARTED_FOLLOWING: &str = "started following";
/// Verb dispatched when a follow is removed with announcement enabled.
pub const STOPPED_FOLLOWING: &str = "stopped following";

/// Create a watcher → subject follow so the subject's activities appear in
/// the watcher's stream. Idempotent; returns the (possibly pre-existing)
/// relationship.
///
/// Unless `opts.announce` is false, also dispatches a
/// `<watcher> started following <subject>` action.
pub async fn follow<S>(
  store: &S,
  watcher: &EntityRef,
  subject: &EntityRef,
  opts: FollowOptions,
) -> DispatchResult<Follow>
where
  S: ActivityStore,
{
  validated(watcher, "watcher")?;
  validated(subject, "subject")?;

  let (follow, created) = store
    .add_follow(watcher, subject)
    .await
    .map_err(|e| DispatchError::Store(Box::new(e)))?;

  if created && opts.announce {
    let mut event = ActionEvent::new(watcher.clone(), STARTED_FOLLOWING);
    event.target = Some(subject.clone());
    dispatch(store, &event).await?;
  }

  Ok(follow)
}

/// Remove the watcher → subject follow(s); returns how many were deleted.
///
/// If `opts.announce`, also dispatches a
/// `<watcher> stopped following <subject>` action.
pub async fn unfollow<S>(
  store: &S,
  watcher: &EntityRef,
  subject: &EntityRef,
  opts: FollowOptions,
) -> DispatchResult<usize>
where
  S: ActivityStore,
{
  validated(watcher, "watcher")?;
  validated(subject, "subject")?;

  let removed = store
    .remove_follows(watcher, subject)
    .await
    .map_err(|e| DispatchError::Store(Box::new(e)))?;

  if opts.announce {
    let mut event = ActionEvent::new(watcher.clone(), STOPPED_FOLLOWING);
    event.target = Some(subject.clone());
    dispatch(store, &event).await?;
  }

  Ok(removed)
}
