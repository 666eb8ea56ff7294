//! Error types for `memping-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("prompt text must not be empty")]
  EmptyText,

  #[error("photo url must not be empty")]
  EmptyPhotoUrl,

  #[error("unknown prompt kind discriminant: {0:?}")]
  UnknownPromptKind(String),

  #[error("prompt of kind {0:?} is missing its payload")]
  MissingPayload(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
