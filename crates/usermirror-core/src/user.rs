//! The mirrored user: the typed payload plus what the store keeps beside it.
//!
//! Only the fields that map to table columns are modelled. Everything else
//! the identity provider sends survives in [`UserRecord::raw_user`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Result, event::EventTime};

/// The `data.object` of a `user.*` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
  pub user_id:        String,
  pub email:          Option<String>,
  pub email_verified: Option<bool>,
  pub username:       Option<String>,
  pub blocked:        Option<bool>,
  pub family_name:    Option<String>,
  pub given_name:     Option<String>,
  pub name:           Option<String>,
  pub nickname:       Option<String>,
  pub phone_number:   Option<String>,
  pub phone_verified: Option<bool>,
  pub created_at:     Option<String>,
  pub updated_at:     Option<String>,
  pub picture:        Option<String>,
  /// User-controlled key/value block.
  pub user_metadata:  Option<Map<String, Value>>,
  /// Application-controlled key/value block.
  pub app_metadata:   Option<Map<String, Value>>,
  pub identities:     Option<Vec<Identity>>,
}

impl UserPayload {
  /// A payload carrying nothing but the subject identifier.
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id:        user_id.into(),
      email:          None,
      email_verified: None,
      username:       None,
      blocked:        None,
      family_name:    None,
      given_name:     None,
      name:           None,
      nickname:       None,
      phone_number:   None,
      phone_verified: None,
      created_at:     None,
      updated_at:     None,
      picture:        None,
      user_metadata:  None,
      app_metadata:   None,
      identities:     None,
    }
  }
}

/// A linked identity (social or enterprise connection) of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
  pub connection: Option<String>,
  pub provider:   Option<String>,
  /// The id of the user at the upstream provider. Some providers send a
  /// number here; it is kept as a string.
  #[serde(default, deserialize_with = "string_or_number")]
  pub user_id:    Option<String>,
  #[serde(rename = "isSocial")]
  pub is_social:  Option<bool>,
  /// Provider-specific keys (`profileData`, `access_token`, ...).
  #[serde(flatten)]
  pub extra:      Map<String, Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s)),
    Some(Value::Number(n)) => Ok(Some(n.to_string())),
    Some(other) => Err(serde::de::Error::custom(format!(
      "expected string or number for identity user_id, got {other}"
    ))),
  }
}

/// What the store persists for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
  pub user:                 UserPayload,
  /// The payload exactly as received, including unmodelled fields.
  pub raw_user:             Value,
  /// Time of the event that last wrote this row.
  pub last_event_processed: EventTime,
}

impl UserRecord {
  /// Decode a `data.object` value into a record stamped with `time`.
  pub fn from_object(object: Value, time: EventTime) -> Result<Self> {
    let user = UserPayload::deserialize(&object)?;
    Ok(Self { user, raw_user: object, last_event_processed: time })
  }

  pub fn user_id(&self) -> &str { &self.user.user_id }

  /// The payload's `identities` exactly as sent, if present and not null.
  pub fn raw_identities(&self) -> Option<&Value> {
    self.raw_user.get("identities").filter(|v| !v.is_null())
  }
}
