//! [`SqliteStore`] — the SQLite implementation of [`ActivityStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use ripple_core::{
  action::{Action, NewAction},
  entity::EntityRef,
  follow::Follow,
  store::{ActivityStore, StreamQuery},
};

use crate::{
  Error, Result,
  encode::{
    RawAction, RawFollow, encode_data, encode_dt, encode_opt_ref, encode_uuid,
  },
  schema::SCHEMA,
};

fn page(query: &StreamQuery) -> (i64, i64) {
  // Saturate rather than wrap: a wrapped negative LIMIT/OFFSET would make
  // SQLite ignore the clause entirely.
  (
    i64::try_from(query.limit.unwrap_or(StreamQuery::DEFAULT_LIMIT))
      .unwrap_or(i64::MAX),
    i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Ripple activity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Handle onto the entity directory sharing this store's connection.
  pub fn entity_directory(&self) -> crate::EntityDirectory {
    crate::EntityDirectory::new(self.conn.clone())
  }

  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── ActivityStore impl ──────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  type Error = Error;

  // ── Actions ───────────────────────────────────────────────────────────────

  async fn record_action(&self, input: NewAction) -> Result<Action> {
    let action = Action {
      action_id:   Uuid::new_v4(),
      actor:       input.actor,
      verb:        input.verb,
      description: input.description,
      subject:     input.subject,
      target:      input.target,
      public:      input.public,
      data:        input.data,
      // Truncated to the column's microsecond precision so the returned
      // value round-trips exactly.
      created_at:  input.created_at.unwrap_or_else(Utc::now).trunc_subsecs(6),
    };

    let id_str = encode_uuid(action.action_id);
    let actor_kind = action.actor.kind.clone();
    let actor_id = action.actor.id.clone();
    let verb = action.verb.clone();
    let description = action.description.clone();
    let (subject_kind, subject_id) = encode_opt_ref(action.subject.as_ref());
    let (target_kind, target_id) = encode_opt_ref(action.target.as_ref());
    let public = action.public;
    let data_str = encode_data(action.data.as_ref())?;
    let at_str = encode_dt(action.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO actions (
             action_id, actor_kind, actor_id, verb, description,
             subject_kind, subject_id, target_kind, target_id,
             public, data, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            actor_kind,
            actor_id,
            verb,
            description,
            subject_kind,
            subject_id,
            target_kind,
            target_id,
            public,
            data_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(action)
  }

  async fn find_action(&self, candidate: &NewAction) -> Result<Option<Action>> {
    let actor_kind = candidate.actor.kind.clone();
    let actor_id = candidate.actor.id.clone();
    let verb = candidate.verb.clone();
    let description = candidate.description.clone();
    let (subject_kind, subject_id) = encode_opt_ref(candidate.subject.as_ref());
    let (target_kind, target_id) = encode_opt_ref(candidate.target.as_ref());
    let public = candidate.public;
    let data_str = encode_data(candidate.data.as_ref())?;

    let raw: Option<RawAction> = self
      .conn
      .call(move |conn| {
        // `IS` instead of `=` so NULL columns match NULL parameters.
        let sql = format!(
          "SELECT {} FROM actions
           WHERE actor_kind = ?1 AND actor_id = ?2 AND verb = ?3
             AND description IS ?4
             AND subject_kind IS ?5 AND subject_id IS ?6
             AND target_kind IS ?7 AND target_id IS ?8
             AND public = ?9 AND data IS ?10
           ORDER BY created_at ASC
           LIMIT 1",
          RawAction::COLUMNS
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![
                actor_kind,
                actor_id,
                verb,
                description,
                subject_kind,
                subject_id,
                target_kind,
                target_id,
                public,
                data_str,
              ],
              RawAction::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAction::into_action).transpose()
  }

  async fn get_action(&self, id: Uuid) -> Result<Option<Action>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAction> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM actions WHERE action_id = ?1",
          RawAction::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawAction::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAction::into_action).transpose()
  }

  async fn delete_action(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM actions WHERE action_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Streams ───────────────────────────────────────────────────────────────

  async fn actor_stream(
    &self,
    actor: &EntityRef,
    query: &StreamQuery,
  ) -> Result<Vec<Action>> {
    let kind = actor.kind.clone();
    let id = actor.id.clone();
    let (limit, offset) = page(query);

    let raws: Vec<RawAction> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM actions
           WHERE actor_kind = ?1 AND actor_id = ?2 AND public = 1
           ORDER BY created_at DESC
           LIMIT ?3 OFFSET ?4",
          RawAction::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, id, limit, offset], RawAction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAction::into_action).collect()
  }

  async fn subject_stream(
    &self,
    subject: &EntityRef,
    query: &StreamQuery,
  ) -> Result<Vec<Action>> {
    let kind = subject.kind.clone();
    let id = subject.id.clone();
    let (limit, offset) = page(query);

    let raws: Vec<RawAction> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM actions
           WHERE subject_kind = ?1 AND subject_id = ?2 AND public = 1
           ORDER BY created_at DESC
           LIMIT ?3 OFFSET ?4",
          RawAction::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, id, limit, offset], RawAction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAction::into_action).collect()
  }

  async fn model_stream(
    &self,
    kind: &str,
    query: &StreamQuery,
  ) -> Result<Vec<Action>> {
    let kind = kind.to_owned();
    let (limit, offset) = page(query);

    let raws: Vec<RawAction> = self
      .conn
      .call(move |conn| {
        // No public filter here: kind-wide streams are a moderation surface.
        let sql = format!(
          "SELECT {} FROM actions
           WHERE actor_kind = ?1
           ORDER BY created_at DESC
           LIMIT ?2 OFFSET ?3",
          RawAction::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, limit, offset], RawAction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAction::into_action).collect()
  }

  async fn watcher_stream(
    &self,
    watcher: &EntityRef,
    query: &StreamQuery,
  ) -> Result<Vec<Action>> {
    let kind = watcher.kind.clone();
    let id = watcher.id.clone();
    let (limit, offset) = page(query);

    let raws: Vec<RawAction> = self
      .conn
      .call(move |conn| {
        // One round-trip: union over followed subjects of their subject
        // streams, restricted to actions after the follow began.
        let sql = format!(
          "SELECT {} FROM actions a
           JOIN follows f
             ON f.subject_kind = a.subject_kind
            AND f.subject_id   = a.subject_id
           WHERE f.watcher_kind = ?1 AND f.watcher_id = ?2
             AND a.created_at > f.started_at
             AND a.public = 1
           ORDER BY a.created_at DESC
           LIMIT ?3 OFFSET ?4",
          RawAction::COLUMNS
            .split(", ")
            .map(|c| format!("a.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, id, limit, offset], RawAction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAction::into_action).collect()
  }

  // ── Follows ───────────────────────────────────────────────────────────────

  async fn add_follow(
    &self,
    watcher: &EntityRef,
    subject: &EntityRef,
  ) -> Result<(Follow, bool)> {
    if let Some(existing) = self.lookup_follow(watcher, subject).await? {
      return Ok((existing, false));
    }

    let follow = Follow {
      follow_id:  Uuid::new_v4(),
      watcher:    watcher.clone(),
      subject:    subject.clone(),
      started_at: Utc::now().trunc_subsecs(6),
    };

    let id_str = encode_uuid(follow.follow_id);
    let watcher_kind = follow.watcher.kind.clone();
    let watcher_id = follow.watcher.id.clone();
    let subject_kind = follow.subject.kind.clone();
    let subject_id = follow.subject.id.clone();
    let at_str = encode_dt(follow.started_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO follows (
             follow_id, watcher_kind, watcher_id, subject_kind, subject_id,
             started_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            watcher_kind,
            watcher_id,
            subject_kind,
            subject_id,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok((follow, true))
  }

  async fn remove_follows(
    &self,
    watcher: &EntityRef,
    subject: &EntityRef,
  ) -> Result<usize> {
    let watcher_kind = watcher.kind.clone();
    let watcher_id = watcher.id.clone();
    let subject_kind = subject.kind.clone();
    let subject_id = subject.id.clone();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM follows
           WHERE watcher_kind = ?1 AND watcher_id = ?2
             AND subject_kind = ?3 AND subject_id = ?4",
          rusqlite::params![watcher_kind, watcher_id, subject_kind, subject_id],
        )?)
      })
      .await?;

    Ok(removed)
  }

  async fn follows_of(&self, watcher: &EntityRef) -> Result<Vec<Follow>> {
    let kind = watcher.kind.clone();
    let id = watcher.id.clone();

    let raws: Vec<RawFollow> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM follows
           WHERE watcher_kind = ?1 AND watcher_id = ?2
           ORDER BY started_at ASC",
          RawFollow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, id], RawFollow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFollow::into_follow).collect()
  }

  async fn get_follow(&self, id: Uuid) -> Result<Option<Follow>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFollow> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM follows WHERE follow_id = ?1",
          RawFollow::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawFollow::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFollow::into_follow).transpose()
  }
}

impl SqliteStore {
  async fn lookup_follow(
    &self,
    watcher: &EntityRef,
    subject: &EntityRef,
  ) -> Result<Option<Follow>> {
    let watcher_kind = watcher.kind.clone();
    let watcher_id = watcher.id.clone();
    let subject_kind = subject.kind.clone();
    let subject_id = subject.id.clone();

    let raw: Option<RawFollow> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM follows
           WHERE watcher_kind = ?1 AND watcher_id = ?2
             AND subject_kind = ?3 AND subject_id = ?4",
          RawFollow::COLUMNS
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![watcher_kind, watcher_id, subject_kind, subject_id],
              RawFollow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFollow::into_follow).transpose()
  }
}
