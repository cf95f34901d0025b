//! The webhook envelope and its classification into [`Event`]s.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{Result, user::UserRecord};

// ─── Wire types ──────────────────────────────────────────────────────────────

/// The top-level JSON object posted by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
  pub id:   String,
  #[serde(rename = "type")]
  pub kind: String,
  pub time: EventTime,
  pub data: EventData,
}

/// An event timestamp. Must parse as an ISO-8601/RFC 3339 instant, but is
/// stored exactly as the sender wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTime {
  text: String,
  at:   DateTime<Utc>,
}

impl EventTime {
  pub fn parse(text: impl Into<String>) -> Result<Self, chrono::ParseError> {
    let text = text.into();
    let at = text.parse::<DateTime<Utc>>()?;
    Ok(Self { text, at })
  }

  /// The timestamp as received.
  pub fn as_str(&self) -> &str { &self.text }

  pub fn at(&self) -> DateTime<Utc> { self.at }
}

impl fmt::Display for EventTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.text) }
}

impl<'de> Deserialize<'de> for EventTime {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let text = String::deserialize(deserializer)?;
    EventTime::parse(text).map_err(serde::de::Error::custom)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
  /// The subject payload. Left untyped until the event type is known.
  pub object: Value,
}

#[derive(Deserialize)]
struct SubjectRef {
  user_id: String,
}

// ─── Event types ─────────────────────────────────────────────────────────────

/// The event types this receiver acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
  UserCreated,
  UserUpdated,
  UserDeleted,
  Other(String),
}

impl EventKind {
  pub fn parse(s: &str) -> Self {
    match s {
      "user.created" => Self::UserCreated,
      "user.updated" => Self::UserUpdated,
      "user.deleted" => Self::UserDeleted,
      other => Self::Other(other.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::UserCreated => "user.created",
      Self::UserUpdated => "user.updated",
      Self::UserDeleted => "user.deleted",
      Self::Other(s) => s,
    }
  }
}

/// A decoded event, ready for [`crate::sync::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  /// `user.created` or `user.updated`.
  Upsert {
    id:      String,
    /// Distinguishes create from update; used for logging only.
    created: bool,
    record:  UserRecord,
  },
  /// `user.deleted`.
  Delete {
    id:      String,
    user_id: String,
  },
  /// Any other type. The payload was not inspected.
  Unhandled {
    id:   String,
    kind: String,
  },
}

impl Envelope {
  /// Parse a request body.
  pub fn from_slice(body: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(body)?)
  }

  /// Decode `data.object` according to the envelope's type.
  ///
  /// Fails only when a `user.*` payload does not have the user shape;
  /// unknown types never fail.
  pub fn into_event(self) -> Result<Event> {
    let Envelope { id, kind, time, data } = self;
    let event = match EventKind::parse(&kind) {
      EventKind::UserCreated => Event::Upsert {
        id,
        created: true,
        record: UserRecord::from_object(data.object, time)?,
      },
      EventKind::UserUpdated => Event::Upsert {
        id,
        created: false,
        record: UserRecord::from_object(data.object, time)?,
      },
      EventKind::UserDeleted => {
        let subject = SubjectRef::deserialize(&data.object)?;
        Event::Delete { id, user_id: subject.user_id }
      }
      EventKind::Other(kind) => Event::Unhandled { id, kind },
    };
    Ok(event)
  }
}

impl Event {
  pub fn id(&self) -> &str {
    match self {
      Event::Upsert { id, .. } | Event::Delete { id, .. } | Event::Unhandled { id, .. } => id,
    }
  }
}
