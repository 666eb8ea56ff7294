//! Core types and the prompt selection algorithm for memping.
//!
//! This crate has no HTTP or database dependencies.
//! The store backend, the JSON API and the server all depend on it.

// Native `async fn` in trait impls; the trait spells out the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod compose;
pub mod error;
pub mod prompt;
pub mod select;
pub mod store;

pub use error::{Error, Result};
