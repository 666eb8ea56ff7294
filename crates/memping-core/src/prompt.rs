//! Prompt types: the unit of content that gets mailed out.
//!
//! A prompt is either a short text or a stored photo. Its send history
//! (`last_sent_at`, `times_sent`) only changes when a send succeeds, and each
//! successful send also appends a [`Delivery`] to the audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Content ─────────────────────────────────────────────────────────────────

/// Which payload a prompt carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
  Text,
  Photo,
}

impl PromptKind {
  /// The discriminant string stored in the `kind` column.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Photo => "photo",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "text" => Ok(Self::Text),
      "photo" => Ok(Self::Photo),
      other => Err(Error::UnknownPromptKind(other.to_owned())),
    }
  }
}

/// The payload of a prompt. Exactly one of text or photo exists per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PromptContent {
  Text {
    text: String,
  },
  Photo {
    /// Site-relative URL of the stored image, e.g. `/photos/<hash>.jpg`.
    url: String,
  },
}

impl PromptContent {
  /// Build a text payload. Surrounding whitespace is trimmed; an empty result
  /// is rejected.
  pub fn text(text: impl AsRef<str>) -> Result<Self> {
    let trimmed = text.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::EmptyText);
    }
    Ok(Self::Text { text: trimmed.to_owned() })
  }

  pub fn photo(url: impl Into<String>) -> Result<Self> {
    let url = url.into();
    if url.trim().is_empty() {
      return Err(Error::EmptyPhotoUrl);
    }
    Ok(Self::Photo { url })
  }

  pub fn kind(&self) -> PromptKind {
    match self {
      Self::Text { .. } => PromptKind::Text,
      Self::Photo { .. } => PromptKind::Photo,
    }
  }

  /// Reassemble a payload from the discriminant and the two nullable payload
  /// columns used by storage backends.
  pub fn from_parts(
    kind: &str,
    text: Option<String>,
    photo_url: Option<String>,
  ) -> Result<Self> {
    match PromptKind::from_discriminant(kind)? {
      PromptKind::Text => text
        .map(|text| Self::Text { text })
        .ok_or(Error::MissingPayload("text")),
      PromptKind::Photo => photo_url
        .map(|url| Self::Photo { url })
        .ok_or(Error::MissingPayload("photo")),
    }
  }

  /// Split into `(text, photo_url)` column values.
  pub fn to_parts(&self) -> (Option<&str>, Option<&str>) {
    match self {
      Self::Text { text } => (Some(text), None),
      Self::Photo { url } => (None, Some(url)),
    }
  }
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// A stored prompt together with its send history.
///
/// `times_sent == 0` exactly when `last_sent_at` is `None`; stores keep the
/// two in step by writing them in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
  pub prompt_id:     Uuid,
  pub created_at:    DateTime<Utc>,
  #[serde(flatten)]
  pub content:       PromptContent,
  pub tag:           Option<String>,
  pub active:        bool,
  /// Per-prompt minimum gap between sends, on top of the global minimum.
  pub cooldown_days: u32,
  pub last_sent_at:  Option<DateTime<Utc>>,
  pub times_sent:    u32,
}

impl Prompt {
  pub fn kind(&self) -> PromptKind { self.content.kind() }

  pub fn has_been_sent(&self) -> bool { self.last_sent_at.is_some() }
}

/// Input to [`crate::store::PromptStore::create_prompt`].
///
/// Identity, creation time and send history are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPrompt {
  pub content:       PromptContent,
  pub tag:           Option<String>,
  pub cooldown_days: u32,
}

impl NewPrompt {
  pub fn new(content: PromptContent) -> Self {
    Self { content, tag: None, cooldown_days: 0 }
  }

  /// Attach a tag; blank tags are dropped.
  pub fn with_tag(mut self, tag: Option<String>) -> Self {
    self.tag = normalize_tag(tag);
    self
  }

  pub fn with_cooldown(mut self, days: u32) -> Self {
    self.cooldown_days = days;
    self
  }
}

/// A partial update. `None` leaves the field unchanged. Send history is not
/// editable here; see [`crate::store::PromptStore::record_delivery`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptPatch {
  /// `Some(None)` clears the tag.
  #[serde(default, deserialize_with = "double_option")]
  pub tag:           Option<Option<String>>,
  pub active:        Option<bool>,
  pub cooldown_days: Option<u32>,
}

impl PromptPatch {
  pub fn is_empty(&self) -> bool {
    self.tag.is_none() && self.active.is_none() && self.cooldown_days.is_none()
  }
}

fn double_option<'de, D>(de: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  Option::<String>::deserialize(de).map(|tag| Some(normalize_tag(tag)))
}

/// Trim a tag and treat blank input as "no tag".
pub fn normalize_tag(tag: Option<String>) -> Option<String> {
  tag
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty())
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// One successful send. Append-only; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
  pub delivery_id: Uuid,
  pub prompt_id:   Uuid,
  pub sent_at:     DateTime<Utc>,
}
