//! Capability traits consumed by the messaging engines.
//!
//! Backends (e.g. `courier-store-sqlite`) implement these; the engines in
//! [`crate::delivery`] and [`crate::notify`] depend only on the traits, so a
//! fake friend graph can stand in for the real one in tests.
//!
//! Every backend error must convert into [`crate::Error`]. Backends map their
//! own not-found and ownership failures onto [`Error::NotFound`] and
//! [`Error::Forbidden`](crate::Error::Forbidden).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error,
  message::{Message, NewMessage},
  notification::{NewNotification, Notification},
  user::User,
};

// ─── Identity & friend graph ─────────────────────────────────────────────────

/// The external identity provider and friend graph. Messaging trusts it as
/// ground truth.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<Error> + 'static;

  /// Look a user up by username. Returns `None` if unknown.
  fn resolve_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Symmetric mutual-friend predicate.
  fn are_friends(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Whether `blocker` has blocked `blocked`. Directional.
  fn is_blocked(
    &self,
    blocker: Uuid,
    blocked: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All friends of `user_id`, in no particular order.
  fn friends_of(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Record that `user_id` was active at `at`.
  fn touch(
    &self,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Messages ────────────────────────────────────────────────────────────────

/// Persistence for direct messages.
pub trait MessageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<Error> + 'static;

  /// Persist a new unread message. `created_at` is set by the store.
  ///
  /// Fails with a validation error if the message is entirely empty. A
  /// `reply_to` that does not name a message between the same two users is
  /// silently dropped.
  fn create_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  fn get_message(
    &self,
    message_id: i64,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Transition one message to read. Idempotent: `seen_at` is only stamped
  /// on the first call. Returns `None` if the message does not exist.
  fn mark_seen(
    &self,
    message_id: i64,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Transition every unread message from `sender_id` to `receiver_id` to
  /// read, stamping all of them with the same `seen_at`. Returns the number
  /// of messages changed.
  fn mark_seen_from(
    &self,
    sender_id: Uuid,
    receiver_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Hard-delete a message. Fails unless `requester` sent it.
  fn delete_message(
    &self,
    message_id: i64,
    requester: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every message between `a` and `b`, oldest first.
  fn list_between(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// The most recent message sent by `sender_id` to `receiver_id`.
  fn latest_from(
    &self,
    sender_id: Uuid,
    receiver_id: Uuid,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Number of unread messages addressed to `receiver_id`.
  fn unread_message_count(
    &self,
    receiver_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// Persistence for notifications.
pub trait NotificationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<Error> + 'static;

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    notification_id: i64,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Flip one notification to read. Returns `false` if it does not exist.
  fn mark_notification_read(
    &self,
    notification_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Flip every unread notification of `recipient_id`; returns the count.
  fn mark_all_read(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All notifications of `recipient_id`, newest first.
  fn list_notifications(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn unread_notification_count(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

/// Everything a single-database deployment provides.
pub trait Backend: Directory + MessageStore + NotificationStore + 'static {}

impl<T> Backend for T where T: Directory + MessageStore + NotificationStore + 'static {}
