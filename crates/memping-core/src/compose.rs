//! Turning a chosen prompt into an email subject and HTML body.
//!
//! All user-supplied text (prompt text, tags, photo URLs) is HTML-escaped
//! before it is embedded in markup.

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use crate::prompt::{Prompt, PromptContent};

/// Longest prompt-text excerpt placed in a subject line, in characters.
pub const SUBJECT_EXCERPT_CHARS: usize = 60;

/// Settings that shape the outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeConfig {
  pub subject_prefix: String,
  /// Absolute origin prepended to site-relative photo URLs.
  pub base_url:       String,
}

impl Default for ComposeConfig {
  fn default() -> Self {
    Self {
      subject_prefix: "Memory Ping: ".to_owned(),
      base_url:       "http://localhost:3000".to_owned(),
    }
  }
}

/// A ready-to-send email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub subject: String,
  pub html:    String,
}

pub fn compose(prompt: &Prompt, config: &ComposeConfig) -> Message {
  match &prompt.content {
    PromptContent::Text { text } => Message {
      subject: format!("{}{}", config.subject_prefix, excerpt(text)),
      html:    format!(
        "<p style=\"font-size:16px;line-height:1.6\">{}</p>",
        escape(text.as_str())
      ),
    },
    PromptContent::Photo { url } => {
      let src = format!("{}{}", config.base_url.trim_end_matches('/'), url);
      let tag_line = prompt
        .tag
        .as_deref()
        .map(|tag| {
          format!(
            "<p style=\"color:#666;font-style:italic\">Tag: #{}</p>",
            escape(tag)
          )
        })
        .unwrap_or_default();
      Message {
        subject: format!("{}Photo: {}", config.subject_prefix, photo_file_name(url)),
        html:    format!(
          "<div style=\"font-size:16px;line-height:1.6\">\
           <p>Here's your daily photo memory:</p>\
           <img src=\"{}\" alt=\"Daily Memory\" \
           style=\"max-width:100%;height:auto;border-radius:8px;margin:20px 0\" />\
           {tag_line}</div>",
          escape(src.as_str()),
        ),
      }
    }
  }
}

/// The first [`SUBJECT_EXCERPT_CHARS`] characters of `text` on a single
/// line: whitespace runs, newlines and control characters become one space.
fn excerpt(text: &str) -> String {
  text
    .split(|c: char| c.is_whitespace() || c.is_control())
    .filter(|word| !word.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .chars()
    .take(SUBJECT_EXCERPT_CHARS)
    .collect()
}

/// Last path segment of a photo URL, or `"photo"` if there is none.
fn photo_file_name(url: &str) -> &str {
  url
    .rsplit('/')
    .next()
    .filter(|s| !s.is_empty())
    .unwrap_or("photo")
}
