//! In-memory backend used by the engine tests.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  message::{Message, NewMessage},
  notification::{NewNotification, Notification},
  store::{Directory, MessageStore, NotificationStore},
  user::User,
};

#[derive(Default)]
struct State {
  users:              Vec<User>,
  friendships:        HashSet<(Uuid, Uuid)>,
  blocks:             HashSet<(Uuid, Uuid)>,
  messages:           Vec<Message>,
  notifications:      Vec<Notification>,
  next_id:            i64,
  last_stamp:         Option<DateTime<Utc>>,
  fail_notifications: bool,
}

impl State {
  /// Strictly increasing timestamps so ordering never depends on clock
  /// resolution.
  fn stamp(&mut self) -> DateTime<Utc> {
    let now = Utc::now();
    let at = match self.last_stamp {
      Some(last) if now <= last => last + Duration::microseconds(1),
      _ => now,
    };
    self.last_stamp = Some(at);
    at
  }

  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }
}

#[derive(Default)]
pub struct FakeBackend {
  state: Mutex<State>,
}

impl FakeBackend {
  pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

  fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap() }

  pub fn add_user(&self, username: &str) -> User {
    let user = User {
      user_id:     Uuid::new_v4(),
      username:    username.into(),
      last_active: None,
    };
    self.lock().users.push(user.clone());
    user
  }

  pub fn befriend(&self, a: &User, b: &User) {
    let mut s = self.lock();
    s.friendships.insert((a.user_id, b.user_id));
    s.friendships.insert((b.user_id, a.user_id));
  }

  pub fn block(&self, blocker: &User, blocked: &User) {
    self.lock().blocks.insert((blocker.user_id, blocked.user_id));
  }

  pub fn fail_notifications(&self, fail: bool) { self.lock().fail_notifications = fail; }

  pub fn notification_count(&self) -> usize { self.lock().notifications.len() }
}

impl Directory for FakeBackend {
  type Error = Error;

  async fn resolve_user(&self, username: &str) -> Result<Option<User>> {
    Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    Ok(self.lock().users.iter().find(|u| u.user_id == user_id).cloned())
  }

  async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
    Ok(self.lock().friendships.contains(&(a, b)))
  }

  async fn is_blocked(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
    Ok(self.lock().blocks.contains(&(blocker, blocked)))
  }

  async fn friends_of(&self, user_id: Uuid) -> Result<Vec<User>> {
    let s = self.lock();
    Ok(
      s.users
        .iter()
        .filter(|u| s.friendships.contains(&(user_id, u.user_id)))
        .cloned()
        .collect(),
    )
  }

  async fn touch(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let mut s = self.lock();
    if let Some(u) = s.users.iter_mut().find(|u| u.user_id == user_id) {
      u.last_active = Some(at);
    }
    Ok(())
  }
}

impl MessageStore for FakeBackend {
  type Error = Error;

  async fn create_message(&self, input: NewMessage) -> Result<Message> {
    input.validate()?;
    let mut s = self.lock();
    let reply_to = input.reply_to.filter(|id| {
      s.messages
        .iter()
        .any(|m| m.message_id == *id && m.is_between(input.sender_id, input.receiver_id))
    });
    input.validate_with_reply(reply_to)?;
    let message = Message {
      message_id:        s.next_id(),
      sender_id:         input.sender_id,
      receiver_id:       input.receiver_id,
      content:           input.content,
      attachments:       input.attachments,
      created_at:        s.stamp(),
      is_read:           false,
      seen_at:           None,
      is_system_message: input.is_system_message,
      reply_to,
    };
    s.messages.push(message.clone());
    Ok(message)
  }

  async fn get_message(&self, message_id: i64) -> Result<Option<Message>> {
    Ok(self.lock().messages.iter().find(|m| m.message_id == message_id).cloned())
  }

  async fn mark_seen(&self, message_id: i64) -> Result<Option<Message>> {
    let mut s = self.lock();
    let at = s.stamp();
    Ok(s.messages.iter_mut().find(|m| m.message_id == message_id).map(|m| {
      m.mark_seen(at);
      m.clone()
    }))
  }

  async fn mark_seen_from(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<usize> {
    let mut s = self.lock();
    let at = s.stamp();
    let mut changed = 0;
    for m in s.messages.iter_mut() {
      if m.sender_id == sender_id && m.is_unread_by(receiver_id) {
        m.mark_seen(at);
        changed += 1;
      }
    }
    Ok(changed)
  }

  async fn delete_message(&self, message_id: i64, requester: Uuid) -> Result<()> {
    let mut s = self.lock();
    let idx = s
      .messages
      .iter()
      .position(|m| m.message_id == message_id)
      .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;
    if s.messages[idx].sender_id != requester {
      return Err(Error::Forbidden(format!("message {message_id} is not yours")));
    }
    s.messages.remove(idx);
    for m in s.messages.iter_mut().filter(|m| m.reply_to == Some(message_id)) {
      m.reply_to = None;
    }
    Ok(())
  }

  async fn list_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
    Ok(self.lock().messages.iter().filter(|m| m.is_between(a, b)).cloned().collect())
  }

  async fn latest_from(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<Option<Message>> {
    Ok(
      self
        .lock()
        .messages
        .iter()
        .rev()
        .find(|m| m.sender_id == sender_id && m.receiver_id == receiver_id)
        .cloned(),
    )
  }

  async fn unread_message_count(&self, receiver_id: Uuid) -> Result<u64> {
    Ok(self.lock().messages.iter().filter(|m| m.is_unread_by(receiver_id)).count() as u64)
  }
}

/// Failure injected by [`FakeBackend::fail_notifications`].
#[derive(Debug, thiserror::Error)]
#[error("notification table unavailable")]
struct Unavailable;

impl NotificationStore for FakeBackend {
  type Error = Error;

  async fn create_notification(&self, input: NewNotification) -> Result<Notification> {
    let mut s = self.lock();
    if s.fail_notifications {
      return Err(Error::store(Unavailable));
    }
    let notification = Notification {
      notification_id: s.next_id(),
      recipient_id:    input.recipient_id,
      sender_id:       input.sender_id,
      kind:            input.kind,
      content:         input.content,
      related_id:      input.related_id,
      created_at:      s.stamp(),
      is_read:         false,
    };
    s.notifications.push(notification.clone());
    Ok(notification)
  }

  async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
    Ok(
      self
        .lock()
        .notifications
        .iter()
        .find(|n| n.notification_id == notification_id)
        .cloned(),
    )
  }

  async fn mark_notification_read(&self, notification_id: i64) -> Result<bool> {
    let mut s = self.lock();
    let found = s.notifications.iter_mut().find(|n| n.notification_id == notification_id);
    Ok(found.map(|n| n.is_read = true).is_some())
  }

  async fn mark_all_read(&self, recipient_id: Uuid) -> Result<usize> {
    let mut s = self.lock();
    let mut changed = 0;
    for n in s.notifications.iter_mut() {
      if n.recipient_id == recipient_id && !n.is_read {
        n.is_read = true;
        changed += 1;
      }
    }
    Ok(changed)
  }

  async fn list_notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
    Ok(
      self
        .lock()
        .notifications
        .iter()
        .rev()
        .filter(|n| n.recipient_id == recipient_id)
        .cloned()
        .collect(),
    )
  }

  async fn unread_notification_count(&self, recipient_id: Uuid) -> Result<u64> {
    let s = self.lock();
    Ok(
      s.notifications
        .iter()
        .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        .count() as u64,
    )
  }
}
