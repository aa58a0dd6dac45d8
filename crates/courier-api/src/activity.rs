//! Hooks for the rest of the platform: social activity and presence.

use axum::{Extension, extract::State, http::StatusCode};
use courier_core::{notification::NotificationKind, store::Backend};
use serde::Deserialize;

use crate::{SharedMessenger, Viewer, error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
  pub kind:       NotificationKind,
  /// Username of the affected user.
  pub recipient:  String,
  /// Opaque id of the liked post, commented reel, etc.
  pub related_id: Option<String>,
}

/// `POST /activity`, body: `{"kind":"like","recipient":"bob","related_id":"42"}`
///
/// Answers 202 even if the notification was suppressed or could not be
/// stored.
pub async fn report<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  JsonBody(body): JsonBody<ActivityBody>,
) -> Result<StatusCode, ApiError> {
  messenger
    .report_activity(&viewer, &body.recipient, body.kind, body.related_id)
    .await?;
  Ok(StatusCode::ACCEPTED)
}

/// `POST /presence`
pub async fn touch<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
  messenger.touch(&viewer).await?;
  Ok(StatusCode::NO_CONTENT)
}
