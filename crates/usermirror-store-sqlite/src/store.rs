//! [`SqliteStore`], the SQLite implementation of [`UserStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use usermirror_core::{store::UserStore, user::UserRecord};

use crate::{
  Result,
  encode::RawUser,
  schema::{SCHEMA, USER_COLUMNS},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The mirrored `users` table in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// The mirror database at `path`, created on first use.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::from_connection(tokio_rusqlite::Connection::open(path).await?).await
  }

  /// A private database that disappears with the store.
  pub async fn open_in_memory() -> Result<Self> {
    Self::from_connection(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  /// Apply [`SCHEMA`] to `conn`. Safe to run against an existing mirror.
  async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn.call(|c| Ok(c.execute_batch(SCHEMA)?)).await?;
    Ok(Self { conn })
  }

  /// Number of mirrored users.
  pub async fn user_count(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = crate::Error;

  async fn upsert_user(&self, record: UserRecord) -> Result<()> {
    let raw = RawUser::from_record(record)?;

    self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO users ({USER_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                   ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
           ON CONFLICT(user_id) DO UPDATE SET
             email                = excluded.email,
             email_verified       = excluded.email_verified,
             username             = excluded.username,
             blocked              = excluded.blocked,
             family_name          = excluded.family_name,
             given_name           = excluded.given_name,
             name                 = excluded.name,
             nickname             = excluded.nickname,
             phone_number         = excluded.phone_number,
             phone_verified       = excluded.phone_verified,
             created_at           = excluded.created_at,
             updated_at           = excluded.updated_at,
             picture              = excluded.picture,
             user_metadata        = excluded.user_metadata,
             app_metadata         = excluded.app_metadata,
             identities           = excluded.identities,
             raw_user             = excluded.raw_user,
             last_event_processed = excluded.last_event_processed"
        );
        conn.prepare_cached(&sql)?.execute(rusqlite::params![
          raw.user_id,
          raw.email,
          raw.email_verified,
          raw.username,
          raw.blocked,
          raw.family_name,
          raw.given_name,
          raw.name,
          raw.nickname,
          raw.phone_number,
          raw.phone_verified,
          raw.created_at,
          raw.updated_at,
          raw.picture,
          raw.user_metadata,
          raw.app_metadata,
          raw.identities,
          raw.raw_user,
          raw.last_event_processed,
        ])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_user(&self, user_id: &str) -> Result<bool> {
    let id = user_id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id])?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
    let id = user_id.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_record).transpose()
  }
}
