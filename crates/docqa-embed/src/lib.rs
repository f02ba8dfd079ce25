//! Embedder implementations.
//!
//! `HashEmbedder` is a deterministic bag-of-words projection used offline and
//! in tests; `OpenAiEmbedder` calls an OpenAI-compatible `/embeddings`
//! endpoint. `get_default_embedder` picks one from settings.

pub mod hashing;
pub mod http;

use std::sync::Arc;

use tracing::info;

use docqa_core::config::ServiceSettings;
use docqa_core::error::Result;
use docqa_core::traits::Embedder;

pub use hashing::HashEmbedder;
pub use http::OpenAiEmbedder;

/// Hashing embedder when `use_hashing_embedder` is set (or `APP_USE_FAKE_EMBEDDINGS=1`),
/// otherwise the HTTP client.
pub fn get_default_embedder(services: &ServiceSettings) -> Result<Arc<dyn Embedder>> {
    let forced = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if forced || services.use_hashing_embedder {
        info!(dim = services.embedding_dimension, "using hashing embedder");
        return Ok(Arc::new(HashEmbedder::new(services.embedding_dimension)));
    }
    let api_key = std::env::var(&services.api_key_env).unwrap_or_default();
    info!(model = %services.embedder_model, url = %services.embedder_url, "using HTTP embedder");
    Ok(Arc::new(OpenAiEmbedder::new(
        &services.embedder_url,
        api_key,
        &services.embedder_model,
        services.embedding_dimension,
    )?))
}
