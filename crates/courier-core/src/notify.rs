//! Notification fan-out.
//!
//! Triggering actions commit first, then call [`Notifier::notify_best_effort`].
//! A failed notification is logged and dropped; it never rolls back the
//! action that caused it. [`Notifier::notify`] is the strict variant that
//! propagates storage failures.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  notification::{NewNotification, Notification, NotificationKind},
  store::NotificationStore,
  user::User,
};

pub struct Notifier<N> {
  store: Arc<N>,
}

impl<N> Clone for Notifier<N> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<N: NotificationStore> Notifier<N> {
  pub fn new(store: Arc<N>) -> Self { Self { store } }

  /// Create a notification for `recipient_id`.
  ///
  /// Returns `Ok(None)` without touching storage when the actor is the
  /// recipient.
  pub async fn notify(
    &self,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: NotificationKind,
    content: Option<String>,
    related_id: Option<String>,
  ) -> Result<Option<Notification>> {
    if recipient_id == sender_id {
      tracing::debug!(%recipient_id, kind = kind.as_str(), "self-notification suppressed");
      return Ok(None);
    }

    let notification = self
      .store
      .create_notification(NewNotification {
        recipient_id,
        sender_id,
        kind,
        content,
        related_id,
      })
      .await
      .map_err(Error::lift)?;
    Ok(Some(notification))
  }

  /// [`Self::notify`], with failures logged and swallowed.
  pub async fn notify_best_effort(
    &self,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: NotificationKind,
    content: Option<String>,
    related_id: Option<String>,
  ) -> Option<Notification> {
    match self.notify(recipient_id, sender_id, kind, content, related_id).await {
      Ok(n) => n,
      Err(e) => {
        tracing::warn!(
          %recipient_id,
          %sender_id,
          kind = kind.as_str(),
          error = %e,
          "failed to record notification"
        );
        None
      }
    }
  }

  /// Report a social action performed by `actor` that affects `recipient`.
  /// The content line is generated from `kind`.
  pub async fn record_activity(
    &self,
    actor: &User,
    recipient: &User,
    kind: NotificationKind,
    related_id: Option<String>,
  ) -> Option<Notification> {
    self
      .notify_best_effort(
        recipient.user_id,
        actor.user_id,
        kind,
        Some(kind.describe(&actor.username)),
        related_id,
      )
      .await
  }

  /// Flip a single notification to read. Only the recipient may do so.
  pub async fn mark_read(&self, requester: &User, notification_id: i64) -> Result<()> {
    let notification = self
      .store
      .get_notification(notification_id)
      .await
      .map_err(Error::lift)?
      .ok_or_else(|| Error::NotFound(format!("notification {notification_id}")))?;

    if notification.recipient_id != requester.user_id {
      return Err(Error::Forbidden(format!(
        "notification {notification_id} belongs to another user"
      )));
    }

    self
      .store
      .mark_notification_read(notification_id)
      .await
      .map_err(Error::lift)?;
    Ok(())
  }

  pub async fn mark_all_read(&self, user: &User) -> Result<usize> {
    self.store.mark_all_read(user.user_id).await.map_err(Error::lift)
  }

  /// Open the notification list: everything is marked read first, then the
  /// full list is returned newest first.
  pub async fn open_list(&self, user: &User) -> Result<Vec<Notification>> {
    let flipped = self.mark_all_read(user).await?;
    tracing::debug!(user = %user.username, flipped, "notifications marked read");
    self
      .store
      .list_notifications(user.user_id)
      .await
      .map_err(Error::lift)
  }

  pub async fn unread_count(&self, user: &User) -> Result<u64> {
    self
      .store
      .unread_notification_count(user.user_id)
      .await
      .map_err(Error::lift)
  }
}
