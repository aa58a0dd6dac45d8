//! Direct messages between two users.
//!
//! A message is a directed edge sender → receiver. Its only mutable state is
//! the read flag: `Unread --mark_seen--> Read`, with `seen_at` stamped exactly
//! once on that transition. There is no reverse transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, user::User};

// ─── Attachments ─────────────────────────────────────────────────────────────

/// Media URLs produced by the external media store.
///
/// At most one is expected to be set, but storage does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
  pub image_url:      Option<String>,
  pub video_url:      Option<String>,
  pub voice_note_url: Option<String>,
}

impl Attachments {
  pub fn is_empty(&self) -> bool {
    [&self.image_url, &self.video_url, &self.voice_note_url]
      .into_iter()
      .all(|url| url.as_deref().is_none_or(|u| u.trim().is_empty()))
  }

  /// Drop blank URLs so an empty form field never counts as media.
  pub fn normalized(self) -> Self {
    let keep = |url: Option<String>| url.filter(|u| !u.trim().is_empty());
    Self {
      image_url:      keep(self.image_url),
      video_url:      keep(self.video_url),
      voice_note_url: keep(self.voice_note_url),
    }
  }
}

// ─── Stored message ──────────────────────────────────────────────────────────

/// A persisted message. `message_id` increases monotonically with creation
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id:        i64,
  pub sender_id:         Uuid,
  pub receiver_id:       Uuid,
  pub content:           String,
  #[serde(flatten)]
  pub attachments:       Attachments,
  pub created_at:        DateTime<Utc>,
  pub is_read:           bool,
  /// Non-null iff `is_read`.
  pub seen_at:           Option<DateTime<Utc>>,
  pub is_system_message: bool,
  /// Back-reference to a message in the same conversation. Becomes `None`
  /// when the referenced message is deleted.
  pub reply_to:          Option<i64>,
}

impl Message {
  /// Whether this message belongs to the conversation between `a` and `b`.
  pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
    (self.sender_id == a && self.receiver_id == b)
      || (self.sender_id == b && self.receiver_id == a)
  }

  /// Whether `user` received this message and has not read it yet.
  pub fn is_unread_by(&self, user: Uuid) -> bool {
    self.receiver_id == user && !self.is_read
  }

  /// Apply the read transition. A no-op on an already-read message.
  pub fn mark_seen(&mut self, at: DateTime<Utc>) {
    if !self.is_read {
      self.is_read = true;
      self.seen_at = Some(at);
    }
  }
}

/// Input to [`MessageStore::create_message`](crate::store::MessageStore::create_message).
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender_id:         Uuid,
  pub receiver_id:       Uuid,
  pub content:           String,
  pub attachments:       Attachments,
  /// Dropped by the store unless it names a message in the same
  /// conversation.
  pub reply_to:          Option<i64>,
  pub is_system_message: bool,
}

impl NewMessage {
  pub fn new(sender_id: Uuid, receiver_id: Uuid, content: impl Into<String>) -> Self {
    Self {
      sender_id,
      receiver_id,
      content: content.into(),
      attachments: Attachments::default(),
      reply_to: None,
      is_system_message: false,
    }
  }

  /// A platform-generated message, e.g. a screenshot report.
  pub fn system(sender_id: Uuid, receiver_id: Uuid, content: impl Into<String>) -> Self {
    Self { is_system_message: true, ..Self::new(sender_id, receiver_id, content) }
  }

  /// Store-level check: a message with no text, no media and no reply link
  /// carries nothing at all.
  pub fn validate(&self) -> Result<()> { self.validate_with_reply(self.reply_to) }

  /// [`validate`](Self::validate) against the reply link the store actually
  /// kept. A dropped reply no longer counts as content.
  pub fn validate_with_reply(&self, reply_to: Option<i64>) -> Result<()> {
    if !self.has_body() && reply_to.is_none() {
      return Err(Error::Validation("message has no content".into()));
    }
    Ok(())
  }

  /// Whether the message has text or media of its own.
  pub fn has_body(&self) -> bool {
    !self.content.trim().is_empty() || !self.attachments.is_empty()
  }
}

// ─── Response representation ─────────────────────────────────────────────────

/// Snapshot of the replied-to message, captured when the response is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
  pub message_id:  i64,
  pub sender:      String,
  pub content:     String,
  #[serde(flatten)]
  pub attachments: Attachments,
}

/// A message as returned to clients, with usernames resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
  pub message_id:        i64,
  pub sender:            String,
  pub receiver:          String,
  pub content:           String,
  #[serde(flatten)]
  pub attachments:       Attachments,
  pub created_at:        DateTime<Utc>,
  pub is_read:           bool,
  pub seen_at:           Option<DateTime<Utc>>,
  pub is_system_message: bool,
  pub reply_to:          Option<ReplyPreview>,
}

/// Username of whichever participant has `id`.
fn username_of<'a>(id: Uuid, a: &'a User, b: &'a User) -> &'a str {
  if id == a.user_id { &a.username } else { &b.username }
}

impl MessageView {
  /// Build the client representation of `message`, exchanged between `a`
  /// and `b` (in either direction).
  pub fn build(message: &Message, reply: Option<&Message>, a: &User, b: &User) -> Self {
    Self {
      message_id:        message.message_id,
      sender:            username_of(message.sender_id, a, b).to_owned(),
      receiver:          username_of(message.receiver_id, a, b).to_owned(),
      content:           message.content.clone(),
      attachments:       message.attachments.clone(),
      created_at:        message.created_at,
      is_read:           message.is_read,
      seen_at:           message.seen_at,
      is_system_message: message.is_system_message,
      reply_to:          reply.map(|r| ReplyPreview {
        message_id:  r.message_id,
        sender:      username_of(r.sender_id, a, b).to_owned(),
        content:     r.content.clone(),
        attachments: r.attachments.clone(),
      }),
    }
  }
}
