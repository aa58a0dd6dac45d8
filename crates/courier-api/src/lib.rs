//! JSON REST API for Courier.
//!
//! Exposes an axum [`Router`] backed by any [`Backend`]. The acting user is
//! read from a [`Viewer`] request extension; authentication, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", courier_api::api_router(messenger.clone()))
//! ```

pub mod activity;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod messages;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use courier_core::{delivery::Messenger, store::Backend, user::User};

pub use error::ApiError;

/// The authenticated user a request acts as. Inserted as a request extension
/// by the auth layer in front of the router.
#[derive(Debug, Clone)]
pub struct Viewer(pub User);

/// Engine shared by every handler. A single backend plays both the store and
/// the directory.
pub type SharedMessenger<S> = Arc<Messenger<S, S>>;

/// Build a fully-materialised API router around `messenger`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(messenger: SharedMessenger<S>) -> Router<()> {
  Router::new()
    // Messages
    .route("/messages", post(messages::send::<S>))
    .route("/messages/screenshot", post(messages::screenshot::<S>))
    .route("/messages/unread-count", get(messages::unread_count::<S>))
    .route("/messages/{id}", delete(messages::delete::<S>))
    .route("/messages/{id}/seen", post(messages::mark_seen::<S>))
    // Conversations
    .route("/conversations/{username}", get(conversations::fetch::<S>))
    .route("/chats", get(conversations::chats::<S>))
    // Notifications
    .route("/notifications", get(notifications::list::<S>))
    .route("/notifications/unread-count", get(notifications::unread_count::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    // Platform hooks
    .route("/activity", post(activity::report::<S>))
    .route("/presence", post(activity::touch::<S>))
    .with_state(messenger)
}

// ─── Router tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    Extension,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use courier_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  struct World {
    messenger: SharedMessenger<SqliteStore>,
    alice:     User,
    bob:       User,
    carol:     User,
  }

  /// alice and bob are friends; carol is a stranger to both.
  async fn world() -> World {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let alice = store.add_user("alice", None).await.unwrap();
    let bob = store.add_user("bob", None).await.unwrap();
    let carol = store.add_user("carol", None).await.unwrap();
    store.befriend("alice", "bob").await.unwrap();

    let store = Arc::new(store);
    let messenger = Arc::new(Messenger::new(store.clone(), store));
    World { messenger, alice, bob, carol }
  }

  async fn call(
    w: &World,
    viewer: &User,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(w.messenger.clone())
      .layer(Extension(Viewer(viewer.clone())))
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  /// Send `body` verbatim as `application/json`, well-formed or not.
  async fn call_raw(w: &World, viewer: &User, method: &str, uri: &str, body: &str) -> Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_owned()))
      .unwrap();
    api_router(w.messenger.clone())
      .layer(Extension(Viewer(viewer.clone())))
      .oneshot(req)
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn send(w: &World, from: &User, to: &str, content: &str) -> Value {
    let resp = call(
      w,
      from,
      "POST",
      "/messages",
      Some(json!({ "receiver": to, "content": content })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
  }

  // ── Messages ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn send_returns_created_view() {
    let w = world().await;
    let view = send(&w, &w.alice, "bob", "hello").await;
    assert_eq!(view["sender"], "alice");
    assert_eq!(view["receiver"], "bob");
    assert_eq!(view["content"], "hello");
    assert_eq!(view["is_read"], false);
  }

  #[tokio::test]
  async fn send_to_stranger_is_403() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/messages",
      Some(json!({ "receiver": "carol", "content": "hi" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = json_body(resp).await;
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn send_to_unknown_user_is_404() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/messages",
      Some(json!({ "receiver": "ghost", "content": "hi" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn empty_send_is_400() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/messages",
      Some(json!({ "receiver": "bob", "content": "  " })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = call(&w, &w.alice, "POST", "/messages", Some(json!({ "content": "hi" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn image_only_send_is_accepted() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/messages",
      Some(json!({ "receiver": "bob", "image_url": "https://cdn.example/p.png" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let view = json_body(resp).await;
    assert_eq!(view["image_url"], "https://cdn.example/p.png");
  }

  #[tokio::test]
  async fn delete_is_sender_only() {
    let w = world().await;
    let view = send(&w, &w.alice, "bob", "oops").await;
    let uri = format!("/messages/{}", view["message_id"]);

    let resp = call(&w, &w.bob, "DELETE", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = call(&w, &w.alice, "DELETE", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call(&w, &w.alice, "DELETE", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn mark_seen_is_receiver_only() {
    let w = world().await;
    let view = send(&w, &w.alice, "bob", "read me").await;
    let uri = format!("/messages/{}/seen", view["message_id"]);

    let resp = call(&w, &w.alice, "POST", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = call(&w, &w.bob, "POST", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let seen = json_body(resp).await;
    assert_eq!(seen["is_read"], true);
    assert!(seen["seen_at"].is_string());

    let resp = call(&w, &w.carol, "POST", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn screenshot_is_a_system_message() {
    let w = world().await;
    let resp = call(
      &w,
      &w.bob,
      "POST",
      "/messages/screenshot",
      Some(json!({ "receiver": "alice" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let view = json_body(resp).await;
    assert_eq!(view["is_system_message"], true);
    assert_eq!(view["content"], "bob took a screenshot");
  }

  // ── Conversations ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn fetching_a_conversation_clears_unread() {
    let w = world().await;
    send(&w, &w.alice, "bob", "one").await;
    send(&w, &w.alice, "bob", "two").await;

    let resp = call(&w, &w.bob, "GET", "/messages/unread-count", None).await;
    assert_eq!(json_body(resp).await["count"], 2);

    let resp = call(&w, &w.bob, "GET", "/conversations/alice", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let history = json_body(resp).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["content"], "one");
    assert!(history.iter().all(|m| m["is_read"] == true));

    let resp = call(&w, &w.bob, "GET", "/messages/unread-count", None).await;
    assert_eq!(json_body(resp).await["count"], 0);
  }

  #[tokio::test]
  async fn conversation_with_stranger_is_403() {
    let w = world().await;
    let resp = call(&w, &w.carol, "GET", "/conversations/alice", None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn reply_preview_is_embedded() {
    let w = world().await;
    let original = send(&w, &w.alice, "bob", "<b>question</b>").await;
    let resp = call(
      &w,
      &w.bob,
      "POST",
      "/messages",
      Some(json!({
        "receiver": "alice",
        "content": "answer",
        "reply_to": original["message_id"],
      })),
    )
    .await;
    let reply = json_body(resp).await;
    assert_eq!(reply["reply_to"]["message_id"], original["message_id"]);
    assert_eq!(reply["reply_to"]["sender"], "alice");
  }

  #[tokio::test]
  async fn chat_list_shows_friends_with_preview() {
    let w = world().await;
    send(&w, &w.bob, "alice", "hey there").await;

    let resp = call(&w, &w.alice, "GET", "/chats", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list = json_body(resp).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["username"], "bob");
    assert_eq!(list[0]["last_message"], "hey there");
    assert_eq!(list[0]["is_new"], true);

    let resp = call(&w, &w.alice, "GET", "/chats?q=zzz", None).await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn presence_marks_friend_online() {
    let w = world().await;
    let resp = call(&w, &w.bob, "POST", "/presence", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call(&w, &w.alice, "GET", "/chats", None).await;
    let list = json_body(resp).await;
    assert_eq!(list[0]["is_online"], true);
  }

  // ── Notifications ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn message_creates_notification_and_list_marks_read() {
    let w = world().await;
    send(&w, &w.alice, "bob", "ping").await;

    let resp = call(&w, &w.bob, "GET", "/notifications/unread-count", None).await;
    assert_eq!(json_body(resp).await["count"], 1);

    let resp = call(&w, &w.bob, "GET", "/notifications", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list = json_body(resp).await;
    assert_eq!(list[0]["kind"], "message");
    assert_eq!(list[0]["is_read"], true);

    let resp = call(&w, &w.bob, "GET", "/notifications/unread-count", None).await;
    assert_eq!(json_body(resp).await["count"], 0);
  }

  #[tokio::test]
  async fn mark_read_checks_recipient() {
    let w = world().await;
    let n = w
      .messenger
      .notifier()
      .record_activity(&w.alice, &w.bob, courier_core::notification::NotificationKind::Like, None)
      .await
      .unwrap();
    let uri = format!("/notifications/{}/read", n.notification_id);

    let resp = call(&w, &w.alice, "POST", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = call(&w, &w.bob, "POST", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call(&w, &w.bob, "POST", "/notifications/9999/read", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn activity_hook_notifies_recipient() {
    let w = world().await;
    let resp = call(
      &w,
      &w.carol,
      "POST",
      "/activity",
      Some(json!({ "kind": "reel_comment", "recipient": "alice", "related_id": "r-9" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = call(&w, &w.alice, "GET", "/notifications", None).await;
    let list = json_body(resp).await;
    assert_eq!(list[0]["kind"], "reel_comment");
    assert_eq!(list[0]["related_id"], "r-9");
    assert_eq!(list[0]["content"], "carol commented on your reel");
  }

  #[tokio::test]
  async fn activity_on_self_is_accepted_but_silent() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/activity",
      Some(json!({ "kind": "like", "recipient": "alice" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = call(&w, &w.alice, "GET", "/notifications/unread-count", None).await;
    assert_eq!(json_body(resp).await["count"], 0);

    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/activity",
      Some(json!({ "kind": "like", "recipient": "ghost" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Malformed requests ──────────────────────────────────────────────────────

  async fn assert_json_400(resp: Response) {
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].is_string(), "expected JSON error body, got {body}");
  }

  #[tokio::test]
  async fn unknown_activity_kind_is_json_400() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/activity",
      Some(json!({ "kind": "poke", "recipient": "bob" })),
    )
    .await;
    assert_json_400(resp).await;
  }

  #[tokio::test]
  async fn mistyped_reply_to_is_json_400() {
    let w = world().await;
    let resp = call(
      &w,
      &w.alice,
      "POST",
      "/messages",
      Some(json!({ "receiver": "bob", "content": "hi", "reply_to": "x" })),
    )
    .await;
    assert_json_400(resp).await;
  }

  #[tokio::test]
  async fn unparseable_body_is_json_400() {
    let w = world().await;
    let resp = call_raw(&w, &w.alice, "POST", "/messages", "not json").await;
    assert_json_400(resp).await;
  }

  #[tokio::test]
  async fn non_numeric_message_id_is_json_400() {
    let w = world().await;
    let resp = call(&w, &w.alice, "DELETE", "/messages/abc", None).await;
    assert_json_400(resp).await;

    let resp = call(&w, &w.bob, "POST", "/notifications/abc/read", None).await;
    assert_json_400(resp).await;
  }
}
