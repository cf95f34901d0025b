//! Encoding and decoding helpers between [`UserRecord`] and the plain-text
//! representations stored in SQLite columns.
//!
//! The event time is stored exactly as the sender wrote it. Metadata blocks,
//! identities and the raw payload are compact JSON; `identities` and
//! `raw_user` are taken from the payload as sent, not from the typed view.

use serde::{Serialize, de::DeserializeOwned};
use usermirror_core::{
  event::EventTime,
  user::{UserPayload, UserRecord},
};

use crate::{Error, Result};

// ─── EventTime
// ────────────────────────────────────────────────────────────────

pub fn decode_event_time(s: String) -> Result<EventTime> {
  EventTime::parse(s).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns
// ─────────────────────────────────────────────────────────────

pub fn encode_json_opt<T: Serialize>(v: Option<&T>) -> Result<Option<String>> {
  v.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_json_opt<T: DeserializeOwned>(s: Option<&str>) -> Result<Option<T>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

// ─── Row bindings
// ─────────────────────────────────────────────────────────────

/// One `users` row as plain column values, in [`crate::schema::USER_COLUMNS`]
/// order.
#[derive(Debug)]
pub struct RawUser {
  pub user_id:              String,
  pub email:                Option<String>,
  pub email_verified:       Option<bool>,
  pub username:             Option<String>,
  pub blocked:              Option<bool>,
  pub family_name:          Option<String>,
  pub given_name:           Option<String>,
  pub name:                 Option<String>,
  pub nickname:             Option<String>,
  pub phone_number:         Option<String>,
  pub phone_verified:       Option<bool>,
  pub created_at:           Option<String>,
  pub updated_at:           Option<String>,
  pub picture:              Option<String>,
  pub user_metadata:        Option<String>,
  pub app_metadata:         Option<String>,
  pub identities:           Option<String>,
  pub raw_user:             String,
  pub last_event_processed: String,
}

impl RawUser {
  pub fn from_record(record: UserRecord) -> Result<Self> {
    let identities = encode_json_opt(record.raw_identities())?;
    let UserRecord { user, raw_user, last_event_processed } = record;
    Ok(Self {
      user_metadata:        encode_json_opt(user.user_metadata.as_ref())?,
      app_metadata:         encode_json_opt(user.app_metadata.as_ref())?,
      identities,
      raw_user:             serde_json::to_string(&raw_user)?,
      last_event_processed: last_event_processed.as_str().to_owned(),
      user_id:              user.user_id,
      email:                user.email,
      email_verified:       user.email_verified,
      username:             user.username,
      blocked:              user.blocked,
      family_name:          user.family_name,
      given_name:           user.given_name,
      name:                 user.name,
      nickname:             user.nickname,
      phone_number:         user.phone_number,
      phone_verified:       user.phone_verified,
      created_at:           user.created_at,
      updated_at:           user.updated_at,
      picture:              user.picture,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:              row.get(0)?,
      email:                row.get(1)?,
      email_verified:       row.get(2)?,
      username:             row.get(3)?,
      blocked:              row.get(4)?,
      family_name:          row.get(5)?,
      given_name:           row.get(6)?,
      name:                 row.get(7)?,
      nickname:             row.get(8)?,
      phone_number:         row.get(9)?,
      phone_verified:       row.get(10)?,
      created_at:           row.get(11)?,
      updated_at:           row.get(12)?,
      picture:              row.get(13)?,
      user_metadata:        row.get(14)?,
      app_metadata:         row.get(15)?,
      identities:           row.get(16)?,
      raw_user:             row.get(17)?,
      last_event_processed: row.get(18)?,
    })
  }

  pub fn into_record(self) -> Result<UserRecord> {
    Ok(UserRecord {
      user:                 UserPayload {
        user_metadata:  decode_json_opt(self.user_metadata.as_deref())?,
        app_metadata:   decode_json_opt(self.app_metadata.as_deref())?,
        identities:     decode_json_opt(self.identities.as_deref())?,
        user_id:        self.user_id,
        email:          self.email,
        email_verified: self.email_verified,
        username:       self.username,
        blocked:        self.blocked,
        family_name:    self.family_name,
        given_name:     self.given_name,
        name:           self.name,
        nickname:       self.nickname,
        phone_number:   self.phone_number,
        phone_verified: self.phone_verified,
        created_at:     self.created_at,
        updated_at:     self.updated_at,
        picture:        self.picture,
      },
      raw_user:             serde_json::from_str(&self.raw_user)?,
      last_event_processed: decode_event_time(self.last_event_processed)?,
    })
  }
}
