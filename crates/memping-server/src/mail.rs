//! Outgoing mail: the [`Mailer`] seam and its Resend implementation.

use std::{future::Future, time::Duration};

use memping_core::compose::Message;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

/// Delivers a composed message to the single configured recipient.
///
/// Failures surface unchanged; there is no retry.
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    message: &'a Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Resend ──────────────────────────────────────────────────────────────────

pub const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
  #[error("mail is not configured: missing {0}")]
  NotConfigured(&'static str),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("mail provider rejected the message ({status}): {body}")]
  Rejected { status: u16, body: String },
}

/// Credentials and addresses for the Resend HTTP API. Missing values are
/// reported when a send is attempted, so dry runs work without them.
#[derive(Clone, Default)]
pub struct ResendConfig {
  pub api_key:  Option<String>,
  pub from:     Option<String>,
  pub to:       Option<String>,
  pub endpoint: String,
}

impl ResendConfig {
  /// `(api_key, from, to)`, or the name of the first missing setting.
  fn credentials(&self) -> Result<(&str, &str, &str), &'static str> {
    let api_key = present(&self.api_key).ok_or("resend_api_key")?;
    let from = present(&self.from).ok_or("from_email")?;
    let to = present(&self.to).ok_or("to_email")?;
    Ok((api_key, from, to))
  }

  /// The first missing setting, if any.
  pub fn missing_field(&self) -> Option<&'static str> { self.credentials().err() }
}

fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
  from:    &'a str,
  to:      [&'a str; 1],
  subject: &'a str,
  html:    &'a str,
}

/// Sends mail through the Resend HTTP API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ResendMailer {
  client: Client,
  config: ResendConfig,
}

impl ResendMailer {
  pub fn new(config: ResendConfig) -> Result<Self, MailError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  async fn deliver(&self, message: &Message) -> Result<(), MailError> {
    let (api_key, from, to) = self
      .config
      .credentials()
      .map_err(MailError::NotConfigured)?;

    let resp = self
      .client
      .post(&self.config.endpoint)
      .bearer_auth(api_key)
      .json(&SendEmailBody {
        from,
        to: [to],
        subject: &message.subject,
        html: &message.html,
      })
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(MailError::Rejected { status: status.as_u16(), body });
    }
    tracing::info!(to = %to, subject = %message.subject, "mail accepted by provider");
    Ok(())
  }
}

impl Mailer for ResendMailer {
  type Error = MailError;

  fn send<'a>(
    &'a self,
    message: &'a Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    self.deliver(message)
  }
}

// ─── Test double ─────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
  };
  use tokio::net::TcpListener;

  use super::*;

  type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

  /// Spin up a local stand-in for the provider that answers with `status`.
  async fn fake_provider(status: StatusCode) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
      .route(
        "/emails",
        post(
          move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
            let auth = headers
              .get("authorization")
              .and_then(|v| v.to_str().ok())
              .map(str::to_owned);
            captured.lock().unwrap().push((auth, body));
            (status, "{\"id\":\"test\"}")
          },
        ),
      )
      .with_state(captured.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}/emails"), captured)
  }

  fn config(endpoint: String) -> ResendConfig {
    ResendConfig {
      api_key: Some("re_test".into()),
      from: Some("ping@example.com".into()),
      to: Some("me@example.com".into()),
      endpoint,
    }
  }

  fn message() -> Message {
    Message { subject: "Memory Ping: hi".into(), html: "<p>hi</p>".into() }
  }

  #[tokio::test]
  async fn posts_message_to_provider() {
    let (endpoint, captured) = fake_provider(StatusCode::OK).await;
    let mailer = ResendMailer::new(config(endpoint)).unwrap();

    mailer.send(&message()).await.unwrap();

    let calls = captured.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (auth, body) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer re_test"));
    assert_eq!(body["from"], "ping@example.com");
    assert_eq!(body["to"][0], "me@example.com");
    assert_eq!(body["subject"], "Memory Ping: hi");
    assert_eq!(body["html"], "<p>hi</p>");
  }

  #[tokio::test]
  async fn provider_rejection_is_surfaced() {
    let (endpoint, _) = fake_provider(StatusCode::UNPROCESSABLE_ENTITY).await;
    let mailer = ResendMailer::new(config(endpoint)).unwrap();

    let err = mailer.send(&message()).await.unwrap_err();
    assert!(matches!(err, MailError::Rejected { status: 422, .. }), "{err}");
  }

  #[tokio::test]
  async fn missing_credentials_fail_before_any_request() {
    let (endpoint, captured) = fake_provider(StatusCode::OK).await;
    let mut cfg = config(endpoint);
    cfg.to = None;
    let mailer = ResendMailer::new(cfg).unwrap();

    let err = mailer.send(&message()).await.unwrap_err();
    assert!(matches!(err, MailError::NotConfigured("to_email")));
    assert!(captured.lock().unwrap().is_empty());
  }
}
