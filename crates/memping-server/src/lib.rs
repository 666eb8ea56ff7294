//! The memping HTTP server.
//!
//! Mounts the management API and the photo directory, and adds the
//! secret-protected send trigger that an external scheduler calls once a day.

pub mod auth;
pub mod error;
pub mod mail;
pub mod trigger;

pub use error::TriggerError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::HeaderMap,
  routing::get,
};
use chrono::Utc;
use memping_api::{ApiState, PHOTO_ROUTE, PhotoStorage, photos::DEFAULT_MAX_UPLOAD_BYTES};
use memping_core::{compose::ComposeConfig, select::{RngDraw, SelectionConfig}, store::PromptStore};
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use auth::verify_trigger;
use mail::{DEFAULT_RESEND_ENDPOINT, Mailer, ResendConfig};
use trigger::{SendConfig, SendMode, SendReport};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `memping.toml` and
/// `MEMPING_*` environment variables. Every field has a default.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  /// Public origin of this server, used for photo links in mail.
  pub base_url:          String,
  pub store_path:        PathBuf,
  pub photo_dir:         PathBuf,
  pub max_upload_bytes:  usize,
  pub min_gap_days:      u32,
  pub never_sent_weight: u64,
  pub subject_prefix:    String,
  pub cron_secret:       Option<String>,
  pub resend_api_key:    Option<String>,
  pub from_email:        Option<String>,
  pub to_email:          Option<String>,
  pub resend_endpoint:   String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let selection = SelectionConfig::default();
    let compose = ComposeConfig::default();
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              3000,
      base_url:          compose.base_url,
      store_path:        PathBuf::from("memping.db"),
      photo_dir:         PathBuf::from("photos"),
      max_upload_bytes:  DEFAULT_MAX_UPLOAD_BYTES,
      min_gap_days:      selection.min_gap_days,
      never_sent_weight: selection.never_sent_weight,
      subject_prefix:    compose.subject_prefix,
      cron_secret:       None,
      resend_api_key:    None,
      from_email:        None,
      to_email:          None,
      resend_endpoint:   DEFAULT_RESEND_ENDPOINT.to_owned(),
    }
  }
}

impl ServerConfig {
  pub fn send_config(&self) -> SendConfig {
    SendConfig {
      selection: SelectionConfig {
        min_gap_days:      self.min_gap_days,
        never_sent_weight: self.never_sent_weight,
      },
      compose:   ComposeConfig {
        subject_prefix: self.subject_prefix.clone(),
        base_url:       self.base_url.clone(),
      },
    }
  }

  pub fn resend_config(&self) -> ResendConfig {
    ResendConfig {
      api_key:  self.resend_api_key.clone(),
      from:     self.from_email.clone(),
      to:       self.to_email.clone(),
      endpoint: self.resend_endpoint.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the trigger handler.
pub struct AppState<S, M> {
  pub store:        Arc<S>,
  pub mailer:       Arc<M>,
  pub photos:       Arc<PhotoStorage>,
  pub config:       Arc<ServerConfig>,
  /// Held for the whole of a trigger so two sends never interleave.
  pub trigger_lock: Arc<Mutex<()>>,
}

impl<S, M> AppState<S, M> {
  pub fn new(store: S, mailer: M, config: ServerConfig) -> Self {
    let photos = PhotoStorage::new(config.photo_dir.clone(), config.max_upload_bytes);
    Self {
      store:        Arc::new(store),
      mailer:       Arc::new(mailer),
      photos:       Arc::new(photos),
      config:       Arc::new(config),
      trigger_lock: Arc::default(),
    }
  }

  /// Run one send outside of HTTP, under the same lock as the trigger route.
  pub async fn send_now(&self, mode: SendMode) -> Result<SendReport, TriggerError>
  where
    S: PromptStore,
    M: Mailer,
  {
    let _guard = self.trigger_lock.lock().await;
    let mut draw = RngDraw(StdRng::from_entropy());
    trigger::run(
      self.store.as_ref(),
      self.mailer.as_ref(),
      &self.config.send_config(),
      mode,
      Utc::now(),
      &mut draw,
    )
    .await
  }
}

impl<S, M> Clone for AppState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      mailer:       Arc::clone(&self.mailer),
      photos:       Arc::clone(&self.photos),
      config:       Arc::clone(&self.config),
      trigger_lock: Arc::clone(&self.trigger_lock),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
///
/// ```text
/// /api/prompts, /api/deliveries   management API
/// /api/send-daily                 scheduler trigger
/// /photos/*                       uploaded photos
/// ```
pub fn router<S, M>(state: AppState<S, M>) -> Router
where
  S: PromptStore + Clone + 'static,
  M: Mailer + 'static,
{
  let api = memping_api::api_router(ApiState {
    store:  Arc::clone(&state.store),
    photos: Arc::clone(&state.photos),
  });
  let photos = state.photos.service();

  let trigger = Router::new()
    .route("/send-daily", get(send_daily::<S, M>))
    .with_state(state);

  Router::new()
    .nest("/api", api.merge(trigger))
    .nest_service(PHOTO_ROUTE, photos)
    .layer(TraceLayer::new_for_http())
}

// ─── Trigger handler ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TriggerQuery {
  dry: Option<String>,
}

impl TriggerQuery {
  fn mode(&self) -> SendMode {
    match self.dry.as_deref() {
      Some("1" | "true") => SendMode::DryRun,
      _ => SendMode::Live,
    }
  }
}

async fn send_daily<S, M>(
  State(state): State<AppState<S, M>>,
  headers: HeaderMap,
  Query(query): Query<TriggerQuery>,
) -> Result<Json<SendReport>, TriggerError>
where
  S: PromptStore + 'static,
  M: Mailer + 'static,
{
  if let Err(e) = verify_trigger(&headers, state.config.cron_secret.as_deref()) {
    tracing::warn!("rejected send trigger: bad or missing secret");
    return Err(e);
  }

  let mode = query.mode();
  match state.send_now(mode).await {
    Ok(report) => Ok(Json(report)),
    Err(e) => {
      tracing::error!(step = e.step(), error = %e, "send trigger failed");
      Err(e)
    }
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
