//! Chat-list assembly.
//!
//! A conversation is never stored: it is the set of messages between an
//! unordered pair of users. The chat list pairs each friend with the most
//! recent message in either direction.
//!
//! The list is built from two point lookups per friend (latest sent, latest
//! received). That is O(friends) queries; a windowed query over the message
//! table is the first thing to replace if friend counts grow large.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{message::Message, user::User};

pub const NO_MESSAGES: &str = "no messages";
pub const PHOTO_LABEL: &str = "photo";
pub const VIDEO_LABEL: &str = "video";
pub const VOICE_LABEL: &str = "voice message";

/// One row of a user's chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
  pub user_id:         Uuid,
  pub username:        String,
  pub is_online:       bool,
  /// Text preview of the last message, or a media label / placeholder.
  pub last_message:    String,
  pub last_time:       Option<DateTime<Utc>>,
  pub last_message_id: Option<i64>,
  /// The viewer received the last message and has not read it.
  pub is_new:          bool,
}

/// The later of the two directions' latest messages.
pub fn latest_of(sent: Option<Message>, received: Option<Message>) -> Option<Message> {
  match (sent, received) {
    (Some(s), Some(r)) => {
      if (s.created_at, s.message_id) > (r.created_at, r.message_id) {
        Some(s)
      } else {
        Some(r)
      }
    }
    (s, r) => s.or(r),
  }
}

/// Preview text for the chat list.
pub fn preview(last: Option<&Message>) -> String {
  let Some(m) = last else {
    return NO_MESSAGES.to_owned();
  };
  let text = strip_tags(&m.content);
  if !text.trim().is_empty() {
    return text;
  }
  let a = &m.attachments;
  if a.image_url.is_some() {
    PHOTO_LABEL.to_owned()
  } else if a.video_url.is_some() {
    VIDEO_LABEL.to_owned()
  } else if a.voice_note_url.is_some() {
    VOICE_LABEL.to_owned()
  } else {
    NO_MESSAGES.to_owned()
  }
}

/// Build the summary row for `friend` as seen by `viewer`.
pub fn summarize(
  viewer: Uuid,
  friend: &User,
  sent: Option<Message>,
  received: Option<Message>,
  now: DateTime<Utc>,
  online_window: Duration,
) -> ChatSummary {
  let last = latest_of(sent, received);
  ChatSummary {
    user_id:         friend.user_id,
    username:        friend.username.clone(),
    is_online:       friend.is_online(now, online_window),
    last_message:    preview(last.as_ref()),
    last_time:       last.as_ref().map(|m| m.created_at),
    last_message_id: last.as_ref().map(|m| m.message_id),
    is_new:          last.as_ref().is_some_and(|m| m.is_unread_by(viewer)),
  }
}

/// Most recent conversation first; friends with no messages last. Equal
/// timestamps fall back to the later message id.
pub fn sort_summaries(summaries: &mut [ChatSummary]) {
  // `None < Some(_)`, so reversing the natural order sinks empty pairs.
  summaries.sort_by(|a, b| {
    (b.last_time, b.last_message_id).cmp(&(a.last_time, a.last_message_id))
  });
}

/// Case-insensitive username substring match. Markup in the query is
/// stripped first; an empty query matches everyone.
pub fn matches_filter(username: &str, query: &str) -> bool {
  let needle = strip_tags(query).trim().to_lowercase();
  needle.is_empty() || username.to_lowercase().contains(&needle)
}

/// Remove anything that looks like an HTML tag.
pub fn strip_tags(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut in_tag = false;
  for c in input.chars() {
    match c {
      '<' => in_tag = true,
      '>' if in_tag => in_tag = false,
      _ if !in_tag => out.push(c),
      _ => {}
    }
  }
  out
}
