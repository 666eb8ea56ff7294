//! JSON REST API for memping.
//!
//! Exposes an axum [`Router`] backed by any [`memping_core::store::PromptStore`].
//! The send trigger, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", memping_api::api_router(state.clone()))
//! .nest_service(PHOTO_ROUTE, photos.service())
//! ```

pub mod deliveries;
pub mod error;
pub mod photos;
pub mod prompts;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use memping_core::store::PromptStore;

pub use error::ApiError;
pub use photos::{PHOTO_ROUTE, PhotoStorage};

/// Slack on top of the photo limit for multipart framing and text fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// State shared by the API handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub photos: Arc<PhotoStorage>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), photos: Arc::clone(&self.photos) }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: PromptStore + Clone + 'static,
{
  let body_limit = state.photos.max_bytes() + FORM_OVERHEAD_BYTES;
  Router::new()
    // Prompts
    .route("/prompts", get(prompts::list::<S>).post(prompts::create::<S>))
    .route(
      "/prompts/{id}",
      get(prompts::get_one::<S>)
        .patch(prompts::update_one::<S>)
        .delete(prompts::delete_one::<S>),
    )
    // Audit log
    .route("/deliveries", get(deliveries::list::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
