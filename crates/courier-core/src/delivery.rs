//! Delivery & read-state engine.
//!
//! Every operation takes the acting user explicitly. Messaging is
//! friend-gated: sending to, or reading a conversation with, someone who is
//! not a mutual friend fails with [`Error::Forbidden`], as does either side
//! having blocked the other.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  conversation::{self, ChatSummary},
  message::{Attachments, Message, MessageView, NewMessage},
  notification::{Notification, NotificationKind},
  notify::Notifier,
  store::{Directory, MessageStore, NotificationStore},
  user::User,
};

/// Default presence window in seconds: a user counts as online for three
/// minutes after their last recorded activity.
pub const DEFAULT_ONLINE_WINDOW_SECS: i64 = 180;

/// A send request as received from a client.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
  pub receiver:    String,
  pub content:     Option<String>,
  pub attachments: Attachments,
  pub reply_to:    Option<i64>,
}

pub struct Messenger<S, D> {
  store:         Arc<S>,
  directory:     Arc<D>,
  notifier:      Notifier<S>,
  online_window: Duration,
}

impl<S, D> Messenger<S, D>
where
  S: MessageStore + NotificationStore,
  D: Directory,
{
  pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
    Self {
      notifier: Notifier::new(Arc::clone(&store)),
      store,
      directory,
      online_window: Duration::seconds(DEFAULT_ONLINE_WINDOW_SECS),
    }
  }

  pub fn with_online_window(mut self, window: Duration) -> Self {
    self.online_window = window;
    self
  }

  pub fn notifier(&self) -> &Notifier<S> { &self.notifier }

  pub fn directory(&self) -> &D { &self.directory }

  // ── Friend gate ───────────────────────────────────────────────────────────

  async fn resolve(&self, username: &str) -> Result<User> {
    self
      .directory
      .resolve_user(username)
      .await
      .map_err(Error::lift)?
      .ok_or_else(|| Error::NotFound(format!("user {username:?}")))
  }

  async fn ensure_can_message(&self, me: &User, other: &User) -> Result<()> {
    let d = &self.directory;
    let friends = d.are_friends(me.user_id, other.user_id).await.map_err(Error::lift)?;
    if !friends {
      return Err(Error::Forbidden(format!("{} is not your friend", other.username)));
    }
    let blocked = d.is_blocked(me.user_id, other.user_id).await.map_err(Error::lift)?
      || d.is_blocked(other.user_id, me.user_id).await.map_err(Error::lift)?;
    if blocked {
      return Err(Error::Forbidden(format!("messaging {} is blocked", other.username)));
    }
    Ok(())
  }

  // ── Sending ───────────────────────────────────────────────────────────────

  /// Send a message from `sender` to the user named in `outgoing`.
  ///
  /// A `reply_to` outside this conversation is dropped, not rejected. The
  /// receiver is notified on a best-effort basis after the message is stored.
  pub async fn send_message(
    &self,
    sender: &User,
    outgoing: OutgoingMessage,
  ) -> Result<MessageView> {
    if outgoing.receiver.trim().is_empty() {
      return Err(Error::Validation("receiver is required".into()));
    }
    let receiver = self.resolve(outgoing.receiver.trim()).await?;
    self.ensure_can_message(sender, &receiver).await?;

    let content = outgoing.content.unwrap_or_default().trim().to_owned();
    let attachments = outgoing.attachments.normalized();
    if content.is_empty() && attachments.is_empty() {
      return Err(Error::Validation("cannot send an empty message".into()));
    }

    let message = self
      .store
      .create_message(NewMessage {
        sender_id: sender.user_id,
        receiver_id: receiver.user_id,
        content,
        attachments,
        reply_to: outgoing.reply_to,
        is_system_message: false,
      })
      .await
      .map_err(Error::lift)?;

    if outgoing.reply_to.is_some() && message.reply_to.is_none() {
      tracing::debug!(
        message_id = message.message_id,
        "reply target outside conversation dropped"
      );
    }

    let reply = match message.reply_to {
      Some(id) => self.store.get_message(id).await.map_err(Error::lift)?,
      None => None,
    };

    self
      .notifier
      .notify_best_effort(
        receiver.user_id,
        sender.user_id,
        NotificationKind::Message,
        Some(NotificationKind::Message.describe(&sender.username)),
        Some(message.message_id.to_string()),
      )
      .await;

    tracing::info!(
      message_id = message.message_id,
      from = %sender.username,
      to = %receiver.username,
      "message sent"
    );
    Ok(MessageView::build(&message, reply.as_ref(), sender, &receiver))
  }

  /// Record a platform event (a screenshot of the chat) as a system message
  /// from `sender` to the named user.
  pub async fn report_screenshot(
    &self,
    sender: &User,
    receiver_username: &str,
  ) -> Result<MessageView> {
    if receiver_username.trim().is_empty() {
      return Err(Error::Validation("receiver is required".into()));
    }
    let receiver = self.resolve(receiver_username.trim()).await?;
    self.ensure_can_message(sender, &receiver).await?;

    let message = self
      .store
      .create_message(NewMessage::system(
        sender.user_id,
        receiver.user_id,
        format!("{} took a screenshot", sender.username),
      ))
      .await
      .map_err(Error::lift)?;
    Ok(MessageView::build(&message, None, sender, &receiver))
  }

  // ── Reading ───────────────────────────────────────────────────────────────

  /// Open the conversation with `other_username`.
  ///
  /// Every unread message the other user sent to `viewer` is marked seen
  /// before the history is read, so the returned list already reflects it.
  pub async fn fetch_conversation(
    &self,
    viewer: &User,
    other_username: &str,
  ) -> Result<Vec<MessageView>> {
    let other = self.resolve(other_username).await?;
    self.ensure_can_message(viewer, &other).await?;

    let seen = self
      .store
      .mark_seen_from(other.user_id, viewer.user_id)
      .await
      .map_err(Error::lift)?;
    if seen > 0 {
      tracing::debug!(viewer = %viewer.username, other = %other.username, seen, "messages marked seen");
    }

    let history = self
      .store
      .list_between(viewer.user_id, other.user_id)
      .await
      .map_err(Error::lift)?;

    let by_id: HashMap<i64, &Message> =
      history.iter().map(|m| (m.message_id, m)).collect();

    Ok(
      history
        .iter()
        .map(|m| {
          let reply = m.reply_to.and_then(|id| by_id.get(&id).copied());
          MessageView::build(m, reply, viewer, &other)
        })
        .collect(),
    )
  }

  /// Mark one message as seen. Only its receiver may do so.
  pub async fn mark_seen(&self, viewer: &User, message_id: i64) -> Result<MessageView> {
    let message = self.get_visible(viewer, message_id).await?;
    if message.receiver_id != viewer.user_id {
      return Err(Error::Forbidden(format!("message {message_id} was not sent to you")));
    }

    let message = self
      .store
      .mark_seen(message_id)
      .await
      .map_err(Error::lift)?
      .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;

    let sender = self.user_by_id(message.sender_id).await?;
    let reply = match message.reply_to {
      Some(id) => self.store.get_message(id).await.map_err(Error::lift)?,
      None => None,
    };
    Ok(MessageView::build(&message, reply.as_ref(), viewer, &sender))
  }

  /// Fetch a message the viewer is a party to. Messages of other
  /// conversations are reported as missing.
  async fn get_visible(&self, viewer: &User, message_id: i64) -> Result<Message> {
    self
      .store
      .get_message(message_id)
      .await
      .map_err(Error::lift)?
      .filter(|m| m.sender_id == viewer.user_id || m.receiver_id == viewer.user_id)
      .ok_or_else(|| Error::NotFound(format!("message {message_id}")))
  }

  async fn user_by_id(&self, user_id: Uuid) -> Result<User> {
    self
      .directory
      .get_user(user_id)
      .await
      .map_err(Error::lift)?
      .ok_or_else(|| Error::NotFound(format!("user {user_id}")))
  }

  // ── Deleting ──────────────────────────────────────────────────────────────

  /// Hard-delete a message. Only its sender may do so; replies to it keep
  /// existing with their back-reference cleared.
  pub async fn delete_message(&self, requester: &User, message_id: i64) -> Result<()> {
    self
      .store
      .delete_message(message_id, requester.user_id)
      .await
      .map_err(Error::lift)?;
    tracing::info!(message_id, by = %requester.username, "message deleted");
    Ok(())
  }

  // ── Chat list & counters ──────────────────────────────────────────────────

  /// Assemble the viewer's chat list, optionally narrowed by a username
  /// filter.
  pub async fn chat_list(&self, viewer: &User, filter: Option<&str>) -> Result<Vec<ChatSummary>> {
    let now = Utc::now();
    let mut friends = self
      .directory
      .friends_of(viewer.user_id)
      .await
      .map_err(Error::lift)?;
    if let Some(query) = filter {
      friends.retain(|f| conversation::matches_filter(&f.username, query));
    }

    let mut summaries = Vec::with_capacity(friends.len());
    for friend in &friends {
      let sent = self
        .store
        .latest_from(viewer.user_id, friend.user_id)
        .await
        .map_err(Error::lift)?;
      let received = self
        .store
        .latest_from(friend.user_id, viewer.user_id)
        .await
        .map_err(Error::lift)?;
      summaries.push(conversation::summarize(
        viewer.user_id,
        friend,
        sent,
        received,
        now,
        self.online_window,
      ));
    }

    conversation::sort_summaries(&mut summaries);
    Ok(summaries)
  }

  pub async fn unread_message_count(&self, viewer: &User) -> Result<u64> {
    self
      .store
      .unread_message_count(viewer.user_id)
      .await
      .map_err(Error::lift)
  }

  /// Record presence for `viewer`.
  pub async fn touch(&self, viewer: &User) -> Result<()> {
    self
      .directory
      .touch(viewer.user_id, Utc::now())
      .await
      .map_err(Error::lift)
  }

  // ── Social activity ───────────────────────────────────────────────────────

  /// Report that `actor` did something (liked a post, sent a friend request)
  /// affecting the named user. Not friend-gated. The notification itself is
  /// best-effort, so `Ok(None)` covers both suppression and a dropped write.
  pub async fn report_activity(
    &self,
    actor: &User,
    recipient_username: &str,
    kind: NotificationKind,
    related_id: Option<String>,
  ) -> Result<Option<Notification>> {
    let recipient = self.resolve(recipient_username.trim()).await?;
    Ok(
      self
        .notifier
        .record_activity(actor, &recipient, kind, related_id)
        .await,
    )
  }
}
