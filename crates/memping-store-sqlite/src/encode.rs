//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings (microsecond precision, `Z`
//! suffix) so that lexical order matches chronological order. UUIDs are
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use memping_core::prompt::{Delivery, Prompt, PromptContent};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counters ────────────────────────────────────────────────────────────────

fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawPrompt::from_row`].
pub const PROMPT_COLUMNS: &str = "prompt_id, created_at, kind, text, photo_url, tag, \
                                  active, cooldown_days, last_sent_at, times_sent";

/// Raw values read directly from a `prompts` row.
pub struct RawPrompt {
  pub prompt_id:     String,
  pub created_at:    String,
  pub kind:          String,
  pub text:          Option<String>,
  pub photo_url:     Option<String>,
  pub tag:           Option<String>,
  pub active:        bool,
  pub cooldown_days: i64,
  pub last_sent_at:  Option<String>,
  pub times_sent:    i64,
}

impl RawPrompt {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      prompt_id:     row.get(0)?,
      created_at:    row.get(1)?,
      kind:          row.get(2)?,
      text:          row.get(3)?,
      photo_url:     row.get(4)?,
      tag:           row.get(5)?,
      active:        row.get(6)?,
      cooldown_days: row.get(7)?,
      last_sent_at:  row.get(8)?,
      times_sent:    row.get(9)?,
    })
  }

  pub fn into_prompt(self) -> Result<Prompt> {
    Ok(Prompt {
      prompt_id:     decode_uuid(&self.prompt_id)?,
      created_at:    decode_dt(&self.created_at)?,
      content:       PromptContent::from_parts(&self.kind, self.text, self.photo_url)?,
      tag:           self.tag,
      active:        self.active,
      cooldown_days: decode_u32("cooldown_days", self.cooldown_days)?,
      last_sent_at:  self.last_sent_at.as_deref().map(decode_dt).transpose()?,
      times_sent:    decode_u32("times_sent", self.times_sent)?,
    })
  }
}

/// Raw strings read directly from a `deliveries` row.
pub struct RawDelivery {
  pub delivery_id: String,
  pub prompt_id:   String,
  pub sent_at:     String,
}

impl RawDelivery {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      delivery_id: row.get(0)?,
      prompt_id:   row.get(1)?,
      sent_at:     row.get(2)?,
    })
  }

  pub fn into_delivery(self) -> Result<Delivery> {
    Ok(Delivery {
      delivery_id: decode_uuid(&self.delivery_id)?,
      prompt_id:   decode_uuid(&self.prompt_id)?,
      sent_at:     decode_dt(&self.sent_at)?,
    })
  }
}
