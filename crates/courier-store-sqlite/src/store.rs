//! [`SqliteStore`]: the SQLite implementation of the Courier store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use courier_core::{
  message::{Message, NewMessage},
  notification::{NewNotification, Notification},
  store::{Directory, MessageStore, NotificationStore},
  user::User,
};

use crate::{
  encode::{
    MESSAGE_COLUMNS, NOTIFICATION_COLUMNS, RawMessage, RawNotification, RawUser,
    USER_COLUMNS, encode_dt, encode_kind, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Courier store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Result of the ownership check performed inside the delete transaction.
enum DeleteOutcome {
  Deleted,
  Missing,
  NotSender,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema initialised");
    Ok(())
  }

  // ── Directory provisioning ────────────────────────────────────────────────
  //
  // The friend graph is owned by the identity provider. These helpers exist
  // so a standalone deployment (and the tests) can seed it.

  /// Register a user. `password_hash` is an argon2 PHC string, or `None` for
  /// an account that cannot authenticate.
  pub async fn add_user(
    &self,
    username: &str,
    password_hash: Option<String>,
  ) -> Result<User> {
    let user = User {
      user_id:     Uuid::new_v4(),
      username:    username.to_owned(),
      last_active: None,
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.username.clone();
    let at_str   = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, password_hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  /// Look up a user together with their stored password hash.
  pub async fn credentials(&self, username: &str) -> Result<Option<(User, Option<String>)>> {
    let name = username.to_owned();

    let raw: Option<(RawUser, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"),
            rusqlite::params![name],
            |row| Ok((RawUser::from_row(row)?, row.get(3)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(u, hash)| Ok((u.into_user()?, hash)))
      .transpose()
  }

  async fn require_user(&self, username: &str) -> Result<User> {
    self
      .resolve_user(username)
      .await?
      .ok_or_else(|| Error::UserNotFound(username.to_owned()))
  }

  /// Make two users mutual friends. Idempotent.
  pub async fn befriend(&self, a: &str, b: &str) -> Result<()> {
    let a = encode_uuid(self.require_user(a).await?.user_id);
    let b = encode_uuid(self.require_user(b).await?.user_id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (user, friend) in [(&a, &b), (&b, &a)] {
          tx.execute(
            "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![user, friend, at_str],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record that `blocker` blocked `blocked`. Any friendship between the two
  /// is dissolved.
  pub async fn block(&self, blocker: &str, blocked: &str) -> Result<()> {
    let a = encode_uuid(self.require_user(blocker).await?.user_id);
    let b = encode_uuid(self.require_user(blocked).await?.user_id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![a, b, at_str],
        )?;
        tx.execute(
          "DELETE FROM friendships
           WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
          rusqlite::params![a, b],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_user(&self, sql: String, arg: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![arg], RawUser::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn query_message(&self, sql: String, args: Vec<String>) -> Result<Option<Message>> {
    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params_from_iter(args), RawMessage::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawMessage::into_message).transpose()
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  type Error = Error;

  async fn resolve_user(&self, username: &str) -> Result<Option<User>> {
    self
      .query_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        username.to_owned(),
      )
      .await
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self
      .query_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        encode_uuid(user_id),
      )
      .await
  }

  async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
    let a = encode_uuid(a);
    let b = encode_uuid(b);

    let rows: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM friendships
           WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
          rusqlite::params![a, b],
          |r| r.get(0),
        )?)
      })
      .await?;

    // Mutual only when both directed rows exist.
    Ok(rows == 2)
  }

  async fn is_blocked(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
    let a = encode_uuid(blocker);
    let b = encode_uuid(blocked);

    let found: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            rusqlite::params![a, b],
            |_| Ok(true),
          )
          .optional()?)
      })
      .await?;

    Ok(found.unwrap_or(false))
  }

  async fn friends_of(&self, user_id: Uuid) -> Result<Vec<User>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.user_id, u.username, u.last_active
           FROM friendships f
           JOIN users u ON u.user_id = f.friend_id
           WHERE f.user_id = ?1
           ORDER BY u.username",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn touch(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET last_active = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MessageStore impl ───────────────────────────────────────────────────────

impl MessageStore for SqliteStore {
  type Error = Error;

  async fn create_message(&self, input: NewMessage) -> Result<Message> {
    input.validate()?;

    let created_at   = Utc::now();
    let sender_str   = encode_uuid(input.sender_id);
    let receiver_str = encode_uuid(input.receiver_id);
    let at_str       = encode_dt(created_at);
    let content      = input.content.clone();
    let attachments  = input.attachments.clone();
    let is_system    = input.is_system_message;
    let requested    = input.reply_to;
    let has_body     = input.has_body();

    // The reply check and the insert share a transaction so the reply target
    // cannot vanish in between. `None` means the reply was dropped and
    // nothing else was left to store.
    let inserted: Option<(i64, Option<i64>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let reply_to: Option<i64> = match requested {
          Some(id) => tx
            .query_row(
              "SELECT message_id FROM messages
               WHERE message_id = ?1
                 AND ((sender_id = ?2 AND receiver_id = ?3)
                   OR (sender_id = ?3 AND receiver_id = ?2))",
              rusqlite::params![id, sender_str, receiver_str],
              |r| r.get(0),
            )
            .optional()?,
          None => None,
        };

        if !has_body && reply_to.is_none() {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO messages (
             sender_id, receiver_id, content, image_url, video_url,
             voice_note_url, created_at, is_system_message, reply_to
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            sender_str,
            receiver_str,
            content,
            attachments.image_url,
            attachments.video_url,
            attachments.voice_note_url,
            at_str,
            is_system,
            reply_to,
          ],
        )?;
        let message_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some((message_id, reply_to)))
      })
      .await?;

    let Some((message_id, reply_to)) = inserted else {
      return Err(courier_core::Error::Validation("message has no content".into()).into());
    };

    Ok(Message {
      message_id,
      sender_id: input.sender_id,
      receiver_id: input.receiver_id,
      content: input.content,
      attachments: input.attachments,
      created_at,
      is_read: false,
      seen_at: None,
      is_system_message: input.is_system_message,
      reply_to,
    })
  }

  async fn get_message(&self, message_id: i64) -> Result<Option<Message>> {
    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
            rusqlite::params![message_id],
            RawMessage::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMessage::into_message).transpose()
  }

  async fn mark_seen(&self, message_id: i64) -> Result<Option<Message>> {
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE messages SET is_read = 1, seen_at = ?2
           WHERE message_id = ?1 AND is_read = 0",
          rusqlite::params![message_id, at_str],
        )?;
        let raw = tx
          .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
            rusqlite::params![message_id],
            RawMessage::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawMessage::into_message).transpose()
  }

  async fn mark_seen_from(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<usize> {
    let sender_str   = encode_uuid(sender_id);
    let receiver_str = encode_uuid(receiver_id);
    let at_str       = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET is_read = 1, seen_at = ?3
           WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
          rusqlite::params![sender_str, receiver_str, at_str],
        )?)
      })
      .await?;

    Ok(changed)
  }

  async fn delete_message(&self, message_id: i64, requester: Uuid) -> Result<()> {
    let requester_str = encode_uuid(requester);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let sender: Option<String> = tx
          .query_row(
            "SELECT sender_id FROM messages WHERE message_id = ?1",
            rusqlite::params![message_id],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match sender {
          None => DeleteOutcome::Missing,
          Some(s) if s != requester_str => DeleteOutcome::NotSender,
          Some(_) => {
            // Replies keep existing; ON DELETE SET NULL clears their link.
            tx.execute(
              "DELETE FROM messages WHERE message_id = ?1",
              rusqlite::params![message_id],
            )?;
            DeleteOutcome::Deleted
          }
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    match outcome {
      DeleteOutcome::Deleted => Ok(()),
      DeleteOutcome::Missing => Err(Error::MessageNotFound(message_id)),
      DeleteOutcome::NotSender => Err(Error::NotSender(message_id)),
    }
  }

  async fn list_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
    let a = encode_uuid(a);
    let b = encode_uuid(b);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE (sender_id = ?1 AND receiver_id = ?2)
              OR (sender_id = ?2 AND receiver_id = ?1)
           ORDER BY message_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![a, b], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn latest_from(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<Option<Message>> {
    self
      .query_message(
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE sender_id = ?1 AND receiver_id = ?2
           ORDER BY message_id DESC
           LIMIT 1"
        ),
        vec![encode_uuid(sender_id), encode_uuid(receiver_id)],
      )
      .await
  }

  async fn unread_message_count(&self, receiver_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(receiver_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }
}

// ─── NotificationStore impl ──────────────────────────────────────────────────

impl NotificationStore for SqliteStore {
  type Error = Error;

  async fn create_notification(&self, input: NewNotification) -> Result<Notification> {
    let created_at    = Utc::now();
    let recipient_str = encode_uuid(input.recipient_id);
    let sender_str    = encode_uuid(input.sender_id);
    let kind_str      = encode_kind(input.kind);
    let content       = input.content.clone();
    let related_id    = input.related_id.clone();
    let at_str        = encode_dt(created_at);

    let notification_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             recipient_id, sender_id, kind, content, related_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![recipient_str, sender_str, kind_str, content, related_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Notification {
      notification_id,
      recipient_id: input.recipient_id,
      sender_id: input.sender_id,
      kind: input.kind,
      content: input.content,
      related_id: input.related_id,
      created_at,
      is_read: false,
    })
  }

  async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"),
            rusqlite::params![notification_id],
            RawNotification::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn mark_notification_read(&self, notification_id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1",
          rusqlite::params![notification_id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn mark_all_read(&self, recipient_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(recipient_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed)
  }

  async fn list_notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
    let id_str = encode_uuid(recipient_id);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE recipient_id = ?1
           ORDER BY notification_id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn unread_notification_count(&self, recipient_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(recipient_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }
}
