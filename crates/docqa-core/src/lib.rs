//! Core types, traits and configuration for the document question-answering
//! pipeline.
//!
//! Configuration uses Figment to merge compiled-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars. Collaborators (embedder, indices,
//! web search, answerer, history) are reached only through the traits in
//! [`traits`], so every stage can run against the fakes in `testing`.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod catalog;
pub mod chunker;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod query;
pub mod stopwords;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, Result};
