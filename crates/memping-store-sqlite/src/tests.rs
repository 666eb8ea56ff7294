//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use memping_core::{
  prompt::{NewPrompt, PromptContent, PromptKind, PromptPatch},
  store::PromptStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn text_prompt(text: &str) -> NewPrompt {
  NewPrompt::new(PromptContent::text(text).unwrap())
}

// ─── Prompts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_text_prompt() {
  let s = store().await;

  let created = s
    .create_prompt(
      text_prompt("Remember the lake house")
        .with_tag(Some("family".into()))
        .with_cooldown(3),
    )
    .await
    .unwrap();
  assert!(created.active);
  assert_eq!(created.times_sent, 0);
  assert!(created.last_sent_at.is_none());

  let fetched = s.get_prompt(created.prompt_id).await.unwrap().unwrap();
  assert_eq!(fetched.prompt_id, created.prompt_id);
  assert_eq!(fetched.content, PromptContent::Text { text: "Remember the lake house".into() });
  assert_eq!(fetched.tag.as_deref(), Some("family"));
  assert_eq!(fetched.cooldown_days, 3);
}

#[tokio::test]
async fn create_and_get_photo_prompt() {
  let s = store().await;
  let created = s
    .create_prompt(NewPrompt::new(PromptContent::photo("/photos/abc.jpg").unwrap()))
    .await
    .unwrap();

  let fetched = s.get_prompt(created.prompt_id).await.unwrap().unwrap();
  assert_eq!(fetched.kind(), PromptKind::Photo);
  assert_eq!(fetched.content, PromptContent::Photo { url: "/photos/abc.jpg".into() });
}

#[tokio::test]
async fn get_prompt_missing_returns_none() {
  let s = store().await;
  assert!(s.get_prompt(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_prompts_newest_first() {
  let s = store().await;
  let a = s.create_prompt(text_prompt("first")).await.unwrap();
  let b = s.create_prompt(text_prompt("second")).await.unwrap();
  let c = s.create_prompt(text_prompt("third")).await.unwrap();

  let ids: Vec<Uuid> = s
    .list_prompts(None)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.prompt_id)
    .collect();
  assert_eq!(ids, vec![c.prompt_id, b.prompt_id, a.prompt_id]);
}

#[tokio::test]
async fn list_prompts_filtered_by_active() {
  let s = store().await;
  let a = s.create_prompt(text_prompt("a")).await.unwrap();
  s.create_prompt(text_prompt("b")).await.unwrap();
  s.update_prompt(a.prompt_id, PromptPatch { active: Some(false), ..Default::default() })
    .await
    .unwrap();

  let active = s.list_prompts(Some(true)).await.unwrap();
  assert_eq!(active.len(), 1);
  assert!(active.iter().all(|p| p.active));

  let inactive = s.list_prompts(Some(false)).await.unwrap();
  assert_eq!(inactive.len(), 1);
  assert_eq!(inactive[0].prompt_id, a.prompt_id);
}

#[tokio::test]
async fn update_prompt_applies_only_given_fields() {
  let s = store().await;
  let p = s
    .create_prompt(text_prompt("x").with_tag(Some("old".into())).with_cooldown(2))
    .await
    .unwrap();

  let updated = s
    .update_prompt(p.prompt_id, PromptPatch { cooldown_days: Some(10), ..Default::default() })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.cooldown_days, 10);
  assert_eq!(updated.tag.as_deref(), Some("old"));
  assert!(updated.active);

  let cleared = s
    .update_prompt(
      p.prompt_id,
      PromptPatch { tag: Some(None), active: Some(false), ..Default::default() },
    )
    .await
    .unwrap()
    .unwrap();
  assert!(cleared.tag.is_none());
  assert!(!cleared.active);
  assert_eq!(cleared.cooldown_days, 10);
}

#[tokio::test]
async fn update_missing_prompt_returns_none() {
  let s = store().await;
  let result = s
    .update_prompt(Uuid::new_v4(), PromptPatch { active: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn delete_prompt() {
  let s = store().await;
  let p = s.create_prompt(text_prompt("bye")).await.unwrap();

  assert!(s.delete_prompt(p.prompt_id).await.unwrap());
  assert!(s.get_prompt(p.prompt_id).await.unwrap().is_none());
  assert!(!s.delete_prompt(p.prompt_id).await.unwrap());
}

// ─── Send history ────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_delivery_updates_history_together() {
  let s = store().await;
  let p = s.create_prompt(text_prompt("ping")).await.unwrap();

  let first = Utc::now() - Duration::days(8);
  let second = Utc::now();
  s.record_delivery(p.prompt_id, first).await.unwrap().unwrap();
  let delivery = s.record_delivery(p.prompt_id, second).await.unwrap().unwrap();
  assert_eq!(delivery.prompt_id, p.prompt_id);

  let fetched = s.get_prompt(p.prompt_id).await.unwrap().unwrap();
  assert_eq!(fetched.times_sent, 2);
  let last = fetched.last_sent_at.unwrap();
  assert!((last - second).num_milliseconds().abs() < 1);

  let log = s.list_deliveries(Some(p.prompt_id)).await.unwrap();
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].delivery_id, delivery.delivery_id, "newest first");
}

#[tokio::test]
async fn record_delivery_for_missing_prompt_writes_nothing() {
  let s = store().await;
  let result = s.record_delivery(Uuid::new_v4(), Utc::now()).await.unwrap();
  assert!(result.is_none());
  assert!(s.list_deliveries(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn deliveries_survive_prompt_deletion() {
  let s = store().await;
  let p = s.create_prompt(text_prompt("gone")).await.unwrap();
  s.record_delivery(p.prompt_id, Utc::now()).await.unwrap();
  s.delete_prompt(p.prompt_id).await.unwrap();

  let log = s.list_deliveries(None).await.unwrap();
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].prompt_id, p.prompt_id);
}

#[tokio::test]
async fn list_deliveries_filters_by_prompt() {
  let s = store().await;
  let a = s.create_prompt(text_prompt("a")).await.unwrap();
  let b = s.create_prompt(text_prompt("b")).await.unwrap();
  s.record_delivery(a.prompt_id, Utc::now()).await.unwrap();
  s.record_delivery(b.prompt_id, Utc::now()).await.unwrap();
  s.record_delivery(b.prompt_id, Utc::now()).await.unwrap();

  assert_eq!(s.list_deliveries(None).await.unwrap().len(), 3);
  assert_eq!(s.list_deliveries(Some(a.prompt_id)).await.unwrap().len(), 1);
  assert_eq!(s.list_deliveries(Some(b.prompt_id)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn file_backed_store_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("memping.db");

  let id = {
    let s = SqliteStore::open(&path).await.unwrap();
    s.create_prompt(text_prompt("durable")).await.unwrap().prompt_id
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get_prompt(id).await.unwrap().is_some());
}
