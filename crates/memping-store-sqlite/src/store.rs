//! [`SqliteStore`]: the SQLite implementation of [`PromptStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use rusqlite::types::Value;
use uuid::Uuid;

use memping_core::{
  prompt::{Delivery, NewPrompt, Prompt, PromptPatch},
  store::PromptStore,
};

use crate::{
  encode::{PROMPT_COLUMNS, RawDelivery, RawPrompt, encode_dt, encode_uuid},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A memping prompt store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn select_prompt(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawPrompt>> {
  conn
    .query_row(
      &format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE prompt_id = ?1"),
      rusqlite::params![id_str],
      RawPrompt::from_row,
    )
    .optional()
}

// ─── PromptStore impl ────────────────────────────────────────────────────────

impl PromptStore for SqliteStore {
  type Error = crate::Error;

  // ── Prompts ───────────────────────────────────────────────────────────────

  async fn create_prompt(&self, input: NewPrompt) -> Result<Prompt> {
    let prompt = Prompt {
      prompt_id:     Uuid::new_v4(),
      created_at:    Utc::now(),
      content:       input.content,
      tag:           input.tag,
      active:        true,
      cooldown_days: input.cooldown_days,
      last_sent_at:  None,
      times_sent:    0,
    };

    let id_str        = encode_uuid(prompt.prompt_id);
    let at_str        = encode_dt(prompt.created_at);
    let kind          = prompt.kind().discriminant();
    let (text, photo) = prompt.content.to_parts();
    let text          = text.map(str::to_owned);
    let photo         = photo.map(str::to_owned);
    let tag           = prompt.tag.clone();
    let cooldown      = i64::from(prompt.cooldown_days);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO prompts (prompt_id, created_at, kind, text, photo_url, tag, cooldown_days)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, at_str, kind, text, photo, tag, cooldown],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(prompt_id = %prompt.prompt_id, kind, "prompt created");
    Ok(prompt)
  }

  async fn get_prompt(&self, id: Uuid) -> Result<Option<Prompt>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPrompt> = self
      .conn
      .call(move |conn| Ok(select_prompt(conn, &id_str)?))
      .await?;

    raw.map(RawPrompt::into_prompt).transpose()
  }

  async fn list_prompts(&self, active: Option<bool>) -> Result<Vec<Prompt>> {
    let raws: Vec<RawPrompt> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(flag) = active {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE active = ?1
             ORDER BY created_at DESC, rowid DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![flag], RawPrompt::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts ORDER BY created_at DESC, rowid DESC"
          ))?;
          stmt
            .query_map([], RawPrompt::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrompt::into_prompt).collect()
  }

  async fn update_prompt(&self, id: Uuid, patch: PromptPatch) -> Result<Option<Prompt>> {
    let id_str = encode_uuid(id);

    // Build SET clause dynamically.
    let mut sets: Vec<&'static str> = vec![];
    let mut values: Vec<Value> = vec![Value::Text(id_str.clone())];
    if let Some(tag) = patch.tag {
      sets.push("tag = ?");
      values.push(tag.map_or(Value::Null, Value::Text));
    }
    if let Some(active) = patch.active {
      sets.push("active = ?");
      values.push(Value::Integer(i64::from(active)));
    }
    if let Some(days) = patch.cooldown_days {
      sets.push("cooldown_days = ?");
      values.push(Value::Integer(i64::from(days)));
    }

    let raw: Option<RawPrompt> = self
      .conn
      .call(move |conn| {
        if !sets.is_empty() {
          let assignments = sets
            .iter()
            .enumerate()
            .map(|(i, s)| s.replace('?', &format!("?{}", i + 2)))
            .collect::<Vec<_>>()
            .join(", ");
          conn.execute(
            &format!("UPDATE prompts SET {assignments} WHERE prompt_id = ?1"),
            rusqlite::params_from_iter(values),
          )?;
        }
        Ok(select_prompt(conn, &id_str)?)
      })
      .await?;

    raw.map(RawPrompt::into_prompt).transpose()
  }

  async fn delete_prompt(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM prompts WHERE prompt_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Send history ──────────────────────────────────────────────────────────

  async fn record_delivery(
    &self,
    prompt_id: Uuid,
    sent_at: DateTime<Utc>,
  ) -> Result<Option<Delivery>> {
    let delivery = Delivery {
      delivery_id: Uuid::new_v4(),
      prompt_id,
      sent_at,
    };

    let del_id_str    = encode_uuid(delivery.delivery_id);
    let prompt_id_str = encode_uuid(prompt_id);
    let at_str        = encode_dt(sent_at);

    let recorded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE prompts SET last_sent_at = ?2, times_sent = times_sent + 1
           WHERE prompt_id = ?1",
          rusqlite::params![prompt_id_str, at_str],
        )?;
        if updated == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO deliveries (delivery_id, prompt_id, sent_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![del_id_str, prompt_id_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(recorded.then_some(delivery))
  }

  async fn list_deliveries(&self, prompt_id: Option<Uuid>) -> Result<Vec<Delivery>> {
    let prompt_id_str = prompt_id.map(encode_uuid);

    let raws: Vec<RawDelivery> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(id) = prompt_id_str {
          let mut stmt = conn.prepare(
            "SELECT delivery_id, prompt_id, sent_at FROM deliveries
             WHERE prompt_id = ?1 ORDER BY sent_at DESC, rowid DESC",
          )?;
          stmt
            .query_map(rusqlite::params![id], RawDelivery::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT delivery_id, prompt_id, sent_at FROM deliveries
             ORDER BY sent_at DESC, rowid DESC",
          )?;
          stmt
            .query_map([], RawDelivery::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDelivery::into_delivery).collect()
  }
}
