//! Shared-secret check for the send trigger.
//!
//! The scheduler sends `Authorization: Bearer <secret>`. The header must equal
//! that string exactly. Both sides are hashed before comparison so the time
//! taken does not depend on where they first differ.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

use crate::error::TriggerError;

/// Verify the trigger secret. An unconfigured secret rejects every request.
pub fn verify_trigger(headers: &HeaderMap, secret: Option<&str>) -> Result<(), TriggerError> {
  let secret = secret.filter(|s| !s.is_empty()).ok_or(TriggerError::Unauthorized)?;

  let presented = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(TriggerError::Unauthorized)?;

  let expected = format!("Bearer {secret}");
  if Sha256::digest(presented.as_bytes()) != Sha256::digest(expected.as_bytes()) {
    return Err(TriggerError::Unauthorized);
  }
  Ok(())
}
