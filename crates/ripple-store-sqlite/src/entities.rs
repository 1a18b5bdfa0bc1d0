//! The entity directory — the concrete bulk-fetch source for the registry.
//!
//! One row per referenceable entity, keyed (kind, id). Each kind gets a
//! [`KindFetcher`] issuing a single `WHERE id IN (...)` query per bulk fetch,
//! which is what keeps resolution at one store round-trip per distinct kind.
//!
//! The directory is flat, so the nested-prefetch knobs in
//! [`FetchOpts`](ripple_core::registry::FetchOpts) are accepted and ignored;
//! they exist for fetchers over richer models.

use std::sync::Arc;

use ripple_core::{
  entity::Entity,
  registry::{EntityFetcher, EntityRegistry, FetchFuture, FetchOpts},
};

use crate::{Error, Result};

// ─── Directory ───────────────────────────────────────────────────────────────

/// Handle onto the `entities` table. Cheap to clone; obtained from
/// [`SqliteStore::entity_directory`](crate::SqliteStore::entity_directory).
#[derive(Clone)]
pub struct EntityDirectory {
  conn: tokio_rusqlite::Connection,
}

impl EntityDirectory {
  pub(crate) fn new(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  /// Insert or update an entity's display name and data.
  pub async fn upsert(&self, entity: &Entity) -> Result<()> {
    let kind = entity.kind.clone();
    let id = entity.id.clone();
    let display = entity.display.clone();
    let data = serde_json::to_string(&entity.data)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entities (kind, id, display, data)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (kind, id) DO UPDATE
             SET display = excluded.display, data = excluded.data",
          rusqlite::params![kind, id, display, data],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Point lookup, mainly for tests and administrative tooling. Bulk reads
  /// go through [`KindFetcher`].
  pub async fn get(&self, kind: &str, id: &str) -> Result<Option<Entity>> {
    let kind = kind.to_owned();
    let id = id.to_owned();

    let row: Option<(String, String, String, String)> = self
      .conn
      .call(move |conn| {
        use rusqlite::OptionalExtension as _;
        Ok(
          conn
            .query_row(
              "SELECT kind, id, display, data FROM entities
               WHERE kind = ?1 AND id = ?2",
              rusqlite::params![kind, id],
              |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
              },
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(kind, id, display, data)| {
        Ok(Entity { kind, id, display, data: serde_json::from_str(&data)? })
      })
      .transpose()
  }

  /// Remove an entity, leaving any references to it dangling. Returns
  /// `false` if no such entity existed.
  pub async fn remove(&self, kind: &str, id: &str) -> Result<bool> {
    let kind = kind.to_owned();
    let id = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
          rusqlite::params![kind, id],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  /// Every kind currently present in the directory.
  pub async fn kinds(&self) -> Result<Vec<String>> {
    let kinds = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT DISTINCT kind FROM entities ORDER BY kind")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(kinds)
  }

  /// The bulk-fetch capability for one kind, ready to register.
  pub fn fetcher(&self, kind: &str) -> Arc<dyn EntityFetcher> {
    Arc::new(KindFetcher { conn: self.conn.clone(), kind: kind.to_owned() })
  }

  /// Build a registry covering `kinds`.
  pub fn registry_for(&self, kinds: &[String]) -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    for kind in kinds {
      registry.register(kind.clone(), self.fetcher(kind));
    }
    registry
  }

  /// Build a registry covering every kind currently in the directory.
  pub async fn registry(&self) -> Result<EntityRegistry> {
    Ok(self.registry_for(&self.kinds().await?))
  }
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

/// [`EntityFetcher`] for a single kind, backed by the `entities` table.
pub struct KindFetcher {
  conn: tokio_rusqlite::Connection,
  kind: String,
}

impl EntityFetcher for KindFetcher {
  fn fetch_bulk<'a>(&'a self, ids: &'a [String], _opts: FetchOpts) -> FetchFuture<'a> {
    Box::pin(async move {
      if ids.is_empty() {
        return Ok(Vec::new());
      }

      let kind = self.kind.clone();
      let ids: Vec<String> = ids.to_vec();

      let rows: Vec<(String, String, String, String)> = self
        .conn
        .call(move |conn| {
          let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
          let sql = format!(
            "SELECT kind, id, display, data FROM entities
             WHERE kind = ?1 AND id IN ({placeholders})"
          );
          let mut stmt = conn.prepare(&sql)?;
          let params = rusqlite::params_from_iter(
            std::iter::once(kind).chain(ids.into_iter()),
          );
          let rows = stmt
            .query_map(params, |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await
        .map_err(|e| Box::new(Error::Database(e)) as ripple_core::error::FetchError)?;

      rows
        .into_iter()
        .map(|(kind, id, display, data)| {
          Ok(Entity {
            kind,
            id,
            display,
            data: serde_json::from_str(&data).map_err(|e| {
              Box::new(Error::Json(e)) as ripple_core::error::FetchError
            })?,
          })
        })
        .collect()
    })
  }
}
