//! Handlers for `/prompts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/prompts` | Optional `?active=true\|false`; newest first |
//! | `POST`   | `/prompts` | JSON [`CreateTextBody`] or multipart photo upload; returns 201 |
//! | `GET`    | `/prompts/{id}` | 404 if not found |
//! | `PATCH`  | `/prompts/{id}` | Body: [`PromptPatch`] |
//! | `DELETE` | `/prompts/{id}` | 204; 404 if not found |

use axum::{
  Json,
  extract::{
    FromRequest, Multipart, Path, Query, Request, State,
    multipart::MultipartError,
    rejection::{JsonRejection, QueryRejection},
  },
  http::{StatusCode, header},
  response::IntoResponse,
};
use memping_core::{
  prompt::{NewPrompt, Prompt, PromptContent, PromptPatch},
  store::PromptStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  photos::{PhotoStorage, SavedPhoto},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub active: Option<bool>,
}

/// `GET /prompts[?active=<bool>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Prompt>>, ApiError>
where
  S: PromptStore,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let prompts = state
    .store
    .list_prompts(params.active)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(prompts))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /prompts/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Prompt>, ApiError>
where
  S: PromptStore,
{
  let prompt = state
    .store
    .get_prompt(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("prompt {id} not found")))?;
  Ok(Json(prompt))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /prompts` for text prompts.
#[derive(Debug, Deserialize)]
pub struct CreateTextBody {
  pub text:          String,
  pub tag:           Option<String>,
  #[serde(default)]
  pub cooldown_days: u32,
}

/// `POST /prompts`: JSON creates a text prompt; `multipart/form-data` with a
/// `photo` file field (plus optional `tag` and `cooldown_days`) creates a
/// photo prompt. Returns 201 + the stored [`Prompt`].
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  request: Request,
) -> Result<impl IntoResponse, ApiError>
where
  S: PromptStore + Clone + 'static,
{
  let is_multipart = request
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| ct.starts_with("multipart/form-data"));

  let (input, photo) = if is_multipart {
    let multipart = Multipart::from_request(request, &state)
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (input, photo) = photo_prompt(&state.photos, multipart).await?;
    (input, Some(photo))
  } else {
    let Json(body) = Json::<CreateTextBody>::from_request(request, &state)
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = NewPrompt::new(PromptContent::text(&body.text)?)
      .with_tag(body.tag)
      .with_cooldown(body.cooldown_days);
    (input, None)
  };

  let prompt = match state.store.create_prompt(input).await {
    Ok(prompt) => prompt,
    Err(e) => {
      if let Some(photo) = &photo {
        state.photos.discard(photo).await;
      }
      return Err(ApiError::Store(Box::new(e)));
    }
  };
  tracing::info!(prompt_id = %prompt.prompt_id, kind = prompt.kind().discriminant(), "prompt added");
  Ok((StatusCode::CREATED, Json(prompt)))
}

/// Read the multipart form, validating every field before the photo is
/// written, so a bad request leaves nothing behind.
async fn photo_prompt(
  photos: &PhotoStorage,
  mut multipart: Multipart,
) -> Result<(NewPrompt, SavedPhoto), ApiError> {
  let mut photo = None;
  let mut tag = None;
  let mut cooldown_days = 0;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(multipart_error)?
  {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "photo" => {
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await.map_err(multipart_error)?;
        photo = Some((data, content_type));
      }
      "tag" => {
        tag = Some(field.text().await.map_err(multipart_error)?);
      }
      "cooldown_days" | "cooldown" => {
        let raw = field.text().await.map_err(multipart_error)?;
        cooldown_days = parse_cooldown(&raw)?;
      }
      _ => {}
    }
  }

  let (data, content_type) =
    photo.ok_or_else(|| ApiError::BadRequest("missing `photo` field".to_owned()))?;
  let photo = photos.save(data, content_type.as_deref()).await?;
  let input = NewPrompt::new(PromptContent::photo(photo.url.clone())?)
    .with_tag(tag)
    .with_cooldown(cooldown_days);
  Ok((input, photo))
}

/// Keep the body-limit status; everything else is a malformed form.
fn multipart_error(e: MultipartError) -> ApiError {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    ApiError::BodyTooLarge(e.body_text())
  } else {
    ApiError::BadRequest(e.body_text())
  }
}

fn parse_cooldown(raw: &str) -> Result<u32, ApiError> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(0);
  }
  raw
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("invalid cooldown_days: {raw:?}")))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /prompts/{id}`, body: `{"tag":..., "active":..., "cooldown_days":...}`
pub async fn update_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  patch: Result<Json<PromptPatch>, JsonRejection>,
) -> Result<Json<Prompt>, ApiError>
where
  S: PromptStore,
{
  let Json(patch) = patch.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  if patch.is_empty() {
    return Err(ApiError::BadRequest("no fields to update".to_owned()));
  }
  let prompt = state
    .store
    .update_prompt(id, patch)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("prompt {id} not found")))?;
  Ok(Json(prompt))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /prompts/{id}`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PromptStore,
{
  let deleted = state
    .store
    .delete_prompt(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !deleted {
    return Err(ApiError::NotFound(format!("prompt {id} not found")));
  }
  tracing::info!(prompt_id = %id, "prompt deleted");
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cooldown_parsing() {
    assert_eq!(parse_cooldown("").unwrap(), 0);
    assert_eq!(parse_cooldown(" 14 ").unwrap(), 14);
    assert!(parse_cooldown("-1").is_err());
    assert!(parse_cooldown("soon").is_err());
  }
}
