//! Trigger error type and axum `IntoResponse` implementation.
//!
//! Every failure names the step it happened in. Steps that already completed
//! are not rolled back: if mail went out but recording failed, the error says
//! so and the mail stays sent.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TriggerError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("failed to load prompts: {0}")]
  LoadPrompts(#[source] BoxError),

  #[error("failed to send mail for prompt {prompt_id}: {source}")]
  Mail {
    prompt_id: Uuid,
    #[source]
    source:    BoxError,
  },

  #[error("mail for prompt {prompt_id} was sent but recording the delivery failed: {source}")]
  RecordDelivery {
    prompt_id: Uuid,
    #[source]
    source:    BoxError,
  },

  #[error("mail for prompt {0} was sent but the prompt was deleted before its delivery was recorded")]
  PromptVanished(Uuid),
}

impl TriggerError {
  /// The step of the send pipeline that failed.
  pub fn step(&self) -> &'static str {
    match self {
      TriggerError::Unauthorized => "authorize",
      TriggerError::LoadPrompts(_) => "load_prompts",
      TriggerError::Mail { .. } => "send_mail",
      TriggerError::RecordDelivery { .. } | TriggerError::PromptVanished(_) => "record_delivery",
    }
  }
}

impl IntoResponse for TriggerError {
  fn into_response(self) -> Response {
    let status = match self {
      TriggerError::Unauthorized => StatusCode::UNAUTHORIZED,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "error": self.to_string(), "step": self.step() });
    (status, Json(body)).into_response()
  }
}
