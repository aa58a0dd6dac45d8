//! Handlers for reading conversations and the chat list.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/conversations/{username}` | Marks the other user's messages seen |
//! | `GET`  | `/chats` | Optional `?q=<username filter>` |

use axum::{
  Extension, Json,
  extract::State,
};
use courier_core::{conversation::ChatSummary, message::MessageView, store::Backend};
use serde::Deserialize;

use crate::{
  SharedMessenger, Viewer,
  error::ApiError,
  extract::{PathParam, QueryParams},
};

/// `GET /conversations/{username}`
pub async fn fetch<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  PathParam(username): PathParam<String>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
  Ok(Json(messenger.fetch_conversation(&viewer, &username).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatParams {
  /// Case-insensitive substring matched against friend usernames.
  pub q: Option<String>,
}

/// `GET /chats[?q=...]`
pub async fn chats<S: Backend>(
  State(messenger): State<SharedMessenger<S>>,
  Extension(Viewer(viewer)): Extension<Viewer>,
  QueryParams(params): QueryParams<ChatParams>,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
  let filter = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
  Ok(Json(messenger.chat_list(&viewer, filter).await?))
}
