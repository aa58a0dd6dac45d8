//! Handlers for `/notifications` endpoints.
//!
//! Opening the list marks every notification read, matching what the
//! recipient has now seen.

use axum::{
  Extension, Json,
  extract::State,
  http::StatusCode,
};
use courier_core::{notification::Notification, store::Backend};
use serde_json::{Value, json};

use crate::{SharedMessenger, Viewer, error::ApiError, extract::PathParam};

/// `GET /notifications`
pub async fn list<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  Ok(Json(messenger.notifier().open_list(&viewer).await?))
}

/// `POST /notifications/{id}/read`
pub async fn mark_read<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
  messenger.notifier().mark_read(&viewer, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /notifications/unread-count`
pub async fn unread_count<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<Json<Value>, ApiError> {
  let count = messenger.notifier().unread_count(&viewer).await?;
  Ok(Json(json!({ "count": count })))
}
