//! The daily send: snapshot → select → (optionally) mail → (optionally) record.
//!
//! Steps run strictly in that order. A dry run stops after composing the
//! message and touches neither the mailer nor the store's send history.

use chrono::{DateTime, Utc};
use memping_core::{
  compose::{ComposeConfig, compose},
  prompt::PromptKind,
  select::{Draw, SelectionConfig, select},
  store::PromptStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::TriggerError, mail::Mailer};

/// Everything the send pipeline is configured with.
#[derive(Debug, Clone, Default)]
pub struct SendConfig {
  pub selection: SelectionConfig,
  pub compose:   ComposeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
  Live,
  DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendStatus {
  Sent,
  DryRun,
  NoPrompts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
  pub subject: String,
}

/// The outcome reported back to whoever fired the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
  pub status:    SendStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id:        Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub preview:   Option<Preview>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind:      Option<PromptKind>,
  pub has_photo: bool,
}

impl SendReport {
  fn no_prompts() -> Self {
    Self { status: SendStatus::NoPrompts, id: None, preview: None, kind: None, has_photo: false }
  }
}

/// Run one send. Authentication is the caller's job.
pub async fn run<S, M, D>(
  store: &S,
  mailer: &M,
  config: &SendConfig,
  mode: SendMode,
  now: DateTime<Utc>,
  draw: &mut D,
) -> Result<SendReport, TriggerError>
where
  S: PromptStore,
  M: Mailer,
  D: Draw + Send,
{
  let prompts = store
    .list_prompts(Some(true))
    .await
    .map_err(|e| TriggerError::LoadPrompts(Box::new(e)))?;

  let Some(selection) = select(&prompts, &config.selection, now, draw) else {
    tracing::info!("no active prompts; nothing to send");
    return Ok(SendReport::no_prompts());
  };
  let prompt = selection.prompt.clone();
  tracing::info!(
    prompt_id = %prompt.prompt_id,
    pool_size = selection.pool_size,
    fallback = selection.fallback,
    "prompt selected"
  );

  let message = compose(&prompt, &config.compose);

  let status = match mode {
    SendMode::DryRun => SendStatus::DryRun,
    SendMode::Live => {
      mailer
        .send(&message)
        .await
        .map_err(|e| TriggerError::Mail { prompt_id: prompt.prompt_id, source: Box::new(e) })?;

      store
        .record_delivery(prompt.prompt_id, now)
        .await
        .map_err(|e| TriggerError::RecordDelivery {
          prompt_id: prompt.prompt_id,
          source:    Box::new(e),
        })?
        .ok_or(TriggerError::PromptVanished(prompt.prompt_id))?;
      SendStatus::Sent
    }
  };

  tracing::info!(prompt_id = %prompt.prompt_id, ?status, "trigger finished");
  Ok(SendReport {
    status,
    id: Some(prompt.prompt_id),
    preview: Some(Preview { subject: message.subject }),
    kind: Some(prompt.kind()),
    has_photo: prompt.kind() == PromptKind::Photo,
  })
}
