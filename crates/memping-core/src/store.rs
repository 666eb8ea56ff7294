//! The `PromptStore` trait.
//!
//! Implemented by storage backends (e.g. `memping-store-sqlite`). The API and
//! the server depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::prompt::{Delivery, NewPrompt, Prompt, PromptPatch};

/// Abstraction over a memping prompt store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PromptStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Prompts ───────────────────────────────────────────────────────────

  /// Persist a new prompt. Identity, `created_at` and an empty send history
  /// are assigned by the store.
  fn create_prompt(
    &self,
    input: NewPrompt,
  ) -> impl Future<Output = Result<Prompt, Self::Error>> + Send + '_;

  /// Retrieve a prompt by UUID. Returns `None` if not found.
  fn get_prompt(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Prompt>, Self::Error>> + Send + '_;

  /// List prompts, newest first, optionally filtered by the `active` flag.
  fn list_prompts(
    &self,
    active: Option<bool>,
  ) -> impl Future<Output = Result<Vec<Prompt>, Self::Error>> + Send + '_;

  /// Apply a partial update and return the updated prompt, or `None` if the
  /// prompt does not exist.
  fn update_prompt(
    &self,
    id: Uuid,
    patch: PromptPatch,
  ) -> impl Future<Output = Result<Option<Prompt>, Self::Error>> + Send + '_;

  /// Delete a prompt. Returns `false` if it did not exist. Deliveries that
  /// reference it are kept.
  fn delete_prompt(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Send history ──────────────────────────────────────────────────────

  /// Record a successful send: append a [`Delivery`] and bump the prompt's
  /// `last_sent_at` / `times_sent` together, atomically.
  ///
  /// Returns `None` (and writes nothing) if the prompt does not exist.
  fn record_delivery(
    &self,
    prompt_id: Uuid,
    sent_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Delivery>, Self::Error>> + Send + '_;

  /// List deliveries, newest first, optionally for a single prompt.
  fn list_deliveries(
    &self,
    prompt_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Delivery>, Self::Error>> + Send + '_;
}
