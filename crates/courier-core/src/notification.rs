//! Notification records produced by social actions.
//!
//! Content is fixed at creation; the only mutation is flipping `is_read`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The social action a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  Message,
  Like,
  Comment,
  FriendRequest,
  FriendAccept,
  ReelLike,
  ReelComment,
  StoryLike,
}

impl NotificationKind {
  pub const ALL: [Self; 8] = [
    Self::Message,
    Self::Like,
    Self::Comment,
    Self::FriendRequest,
    Self::FriendAccept,
    Self::ReelLike,
    Self::ReelComment,
    Self::StoryLike,
  ];

  /// Stable tag used in storage and on the wire.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Message => "message",
      Self::Like => "like",
      Self::Comment => "comment",
      Self::FriendRequest => "friend_request",
      Self::FriendAccept => "friend_accept",
      Self::ReelLike => "reel_like",
      Self::ReelComment => "reel_comment",
      Self::StoryLike => "story_like",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.as_str() == s)
  }

  /// Human-readable line shown to the recipient.
  pub fn describe(self, actor: &str) -> String {
    match self {
      Self::Message => format!("{actor} sent you a message"),
      Self::Like => format!("{actor} liked your post"),
      Self::Comment => format!("{actor} commented on your post"),
      Self::FriendRequest => format!("{actor} sent you a friend request"),
      Self::FriendAccept => format!("{actor} accepted your friend request"),
      Self::ReelLike => format!("{actor} liked your reel"),
      Self::ReelComment => format!("{actor} commented on your reel"),
      Self::StoryLike => format!("{actor} liked your story"),
    }
  }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: i64,
  pub recipient_id:    Uuid,
  pub sender_id:       Uuid,
  pub kind:            NotificationKind,
  pub content:         Option<String>,
  /// Post, reel, story, message or user id depending on `kind`.
  pub related_id:      Option<String>,
  pub created_at:      DateTime<Utc>,
  pub is_read:         bool,
}

/// Input to [`NotificationStore::create_notification`](crate::store::NotificationStore::create_notification).
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub recipient_id: Uuid,
  pub sender_id:    Uuid,
  pub kind:         NotificationKind,
  pub content:      Option<String>,
  pub related_id:   Option<String>,
}
