//! Handler for `GET /deliveries`, the read side of the send audit log.

use axum::{
  Json,
  extract::{Query, State},
};
use memping_core::{prompt::Delivery, store::PromptStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub prompt_id: Option<Uuid>,
}

/// `GET /deliveries[?prompt_id=<id>]`, newest first.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Delivery>>, ApiError>
where
  S: PromptStore,
{
  let deliveries = state
    .store
    .list_deliveries(params.prompt_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(deliveries))
}
