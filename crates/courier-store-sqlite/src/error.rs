//! Error type for `courier-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] courier_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown notification kind: {0:?}")]
  UnknownKind(String),

  #[error("message not found: {0}")]
  MessageNotFound(i64),

  /// Someone other than the sender tried to delete a message.
  #[error("message {0} was not sent by the requester")]
  NotSender(i64),

  #[error("user not found: {0}")]
  UserNotFound(String),
}

impl From<Error> for courier_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::MessageNotFound(id) => Self::NotFound(format!("message {id}")),
      Error::UserNotFound(name) => Self::NotFound(format!("user {name:?}")),
      Error::NotSender(id) => {
        Self::Forbidden(format!("message {id} can only be deleted by its sender"))
      }
      other => Self::store(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
