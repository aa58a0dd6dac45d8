//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Notification kinds use their stable tag.

use chrono::{DateTime, Utc};
use courier_core::{
  message::{Attachments, Message},
  notification::{Notification, NotificationKind},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NotificationKind ────────────────────────────────────────────────────────

pub fn encode_kind(k: NotificationKind) -> &'static str { k.as_str() }

pub fn decode_kind(s: &str) -> Result<NotificationKind> {
  NotificationKind::parse(s).ok_or_else(|| Error::UnknownKind(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, username, last_active";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:     String,
  pub username:    String,
  pub last_active: Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      username:    row.get(1)?,
      last_active: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:     decode_uuid(&self.user_id)?,
      username:    self.username,
      last_active: decode_opt_dt(self.last_active)?,
    })
  }
}

/// Column list matching [`RawMessage::from_row`].
pub const MESSAGE_COLUMNS: &str = "message_id, sender_id, receiver_id, content, \
   image_url, video_url, voice_note_url, created_at, is_read, seen_at, \
   is_system_message, reply_to";

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:        i64,
  pub sender_id:         String,
  pub receiver_id:       String,
  pub content:           String,
  pub image_url:         Option<String>,
  pub video_url:         Option<String>,
  pub voice_note_url:    Option<String>,
  pub created_at:        String,
  pub is_read:           bool,
  pub seen_at:           Option<String>,
  pub is_system_message: bool,
  pub reply_to:          Option<i64>,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:        row.get(0)?,
      sender_id:         row.get(1)?,
      receiver_id:       row.get(2)?,
      content:           row.get(3)?,
      image_url:         row.get(4)?,
      video_url:         row.get(5)?,
      voice_note_url:    row.get(6)?,
      created_at:        row.get(7)?,
      is_read:           row.get(8)?,
      seen_at:           row.get(9)?,
      is_system_message: row.get(10)?,
      reply_to:          row.get(11)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:        self.message_id,
      sender_id:         decode_uuid(&self.sender_id)?,
      receiver_id:       decode_uuid(&self.receiver_id)?,
      content:           self.content,
      attachments:       Attachments {
        image_url:      self.image_url,
        video_url:      self.video_url,
        voice_note_url: self.voice_note_url,
      },
      created_at:        decode_dt(&self.created_at)?,
      is_read:           self.is_read,
      seen_at:           decode_opt_dt(self.seen_at)?,
      is_system_message: self.is_system_message,
      reply_to:          self.reply_to,
    })
  }
}

/// Column list matching [`RawNotification::from_row`].
pub const NOTIFICATION_COLUMNS: &str = "notification_id, recipient_id, sender_id, \
   kind, content, related_id, created_at, is_read";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: i64,
  pub recipient_id:    String,
  pub sender_id:       String,
  pub kind:            String,
  pub content:         Option<String>,
  pub related_id:      Option<String>,
  pub created_at:      String,
  pub is_read:         bool,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      recipient_id:    row.get(1)?,
      sender_id:       row.get(2)?,
      kind:            row.get(3)?,
      content:         row.get(4)?,
      related_id:      row.get(5)?,
      created_at:      row.get(6)?,
      is_read:         row.get(7)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: self.notification_id,
      recipient_id:    decode_uuid(&self.recipient_id)?,
      sender_id:       decode_uuid(&self.sender_id)?,
      kind:            decode_kind(&self.kind)?,
      content:         self.content,
      related_id:      self.related_id,
      created_at:      decode_dt(&self.created_at)?,
      is_read:         self.is_read,
    })
  }
}
