//! HTTP Basic authentication against the user directory.
//!
//! Each request's credentials are checked against the argon2 hash stored for
//! that username. On success the user is attached to the request as a
//! [`Viewer`] for the API handlers.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use courier_api::Viewer;
use courier_core::user::User;
use courier_store_sqlite::SqliteStore;
use rand_core::OsRng;

use crate::{AppState, error::Error};

/// Produce an argon2 PHC string for `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Split a `Basic` authorization header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Resolve the user the request authenticates as.
pub async fn verify_auth(headers: &HeaderMap, store: &SqliteStore) -> Result<User, Error> {
  let (username, password) = basic_credentials(headers)?;

  let (user, hash) = store
    .credentials(&username)
    .await?
    .ok_or(Error::Unauthorized)?;

  // Accounts without a password cannot log in.
  let hash = hash.ok_or(Error::Unauthorized)?;
  let parsed_hash = PasswordHash::new(&hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(user)
}

/// Middleware: reject unauthenticated requests with 401, otherwise insert the
/// [`Viewer`] extension.
pub async fn require_auth(
  State(state): State<AppState>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let user = match verify_auth(req.headers(), &state.store).await {
    Ok(user) => user,
    Err(e) => {
      tracing::debug!(error = %e, path = %req.uri().path(), "authentication failed");
      return Err(e);
    }
  };
  req.extensions_mut().insert(Viewer(user));
  Ok(next.run(req).await)
}
