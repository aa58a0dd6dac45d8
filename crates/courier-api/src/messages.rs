//! Handlers for `/messages` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/messages` | Body: `{"receiver":"bob","content":"hi"}`; 201 |
//! | `DELETE` | `/messages/{id}` | Sender only; 204 |
//! | `POST`   | `/messages/{id}/seen` | Receiver only |
//! | `POST`   | `/messages/screenshot` | Body: `{"receiver":"bob"}`; 201 |
//! | `GET`    | `/messages/unread-count` | `{"count":n}` |

use axum::{
  Extension, Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use courier_core::{
  delivery::OutgoingMessage,
  message::{Attachments, MessageView},
  store::Backend,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  SharedMessenger, Viewer,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

// ─── Send ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendBody {
  /// Receiver's username.
  #[serde(default)]
  pub receiver:    String,
  pub content:     Option<String>,
  /// Media already uploaded to the object store, referenced by URL.
  #[serde(flatten)]
  pub attachments: Attachments,
  pub reply_to:    Option<i64>,
}

impl From<SendBody> for OutgoingMessage {
  fn from(body: SendBody) -> Self {
    OutgoingMessage {
      receiver:    body.receiver,
      content:     body.content,
      attachments: body.attachments,
      reply_to:    body.reply_to,
    }
  }
}

/// `POST /messages`
pub async fn send<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  JsonBody(body): JsonBody<SendBody>,
) -> Result<impl IntoResponse, ApiError> {
  let view = messenger.send_message(&viewer, body.into()).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /messages/{id}`
pub async fn delete<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
  messenger.delete_message(&viewer, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Seen ─────────────────────────────────────────────────────────────────────

/// `POST /messages/{id}/seen`
pub async fn mark_seen<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  PathParam(id): PathParam<i64>,
) -> Result<Json<MessageView>, ApiError> {
  Ok(Json(messenger.mark_seen(&viewer, id).await?))
}

// ─── Screenshot ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScreenshotBody {
  #[serde(default)]
  pub receiver: String,
}

/// `POST /messages/screenshot`
pub async fn screenshot<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  JsonBody(body): JsonBody<ScreenshotBody>,
) -> Result<impl IntoResponse, ApiError> {
  let view = messenger.report_screenshot(&viewer, &body.receiver).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Unread count ─────────────────────────────────────────────────────────────

/// `GET /messages/unread-count`
pub async fn unread_count<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<Json<Value>, ApiError> {
  let count = messenger.unread_message_count(&viewer).await?;
  Ok(Json(json!({ "count": count })))
}
