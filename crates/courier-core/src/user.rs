//! User identity as supplied by the external directory.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user known to the directory. Courier never creates or mutates users
/// beyond recording their last activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:     Uuid,
  pub username:    String,
  pub last_active: Option<DateTime<Utc>>,
}

impl User {
  /// Whether the user was active within `window` of `now`.
  pub fn is_online(&self, now: DateTime<Utc>, window: Duration) -> bool {
    self.last_active.is_some_and(|at| now - at < window)
  }
}
