use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads `config.toml` (+ `config.<env>.toml`) from the working directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same layering as [`Config::load`], with the TOML files looked up in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wraps an already-built figment, e.g. one assembled by a test.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub search: SearchSettings,
    pub answer: AnswerSettings,
    pub confidence: ConfidenceSettings,
    pub timeouts: TimeoutSettings,
    pub services: ServiceSettings,
    pub data: DataSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }

        let s = &self.search;
        for (name, v) in [
            ("search.vector_weight", s.vector_weight),
            ("search.lexical_weight", s.lexical_weight),
            ("search.min_relevance", s.min_relevance),
            ("search.web_score_cap", s.web_score_cap),
        ] {
            unit_interval(name, v)?;
        }
        if s.web_score_cap >= s.min_relevance {
            return Err(Error::InvalidConfig(format!(
                "search.web_score_cap ({}) must stay below search.min_relevance ({})",
                s.web_score_cap, s.min_relevance
            )));
        }
        if s.max_results_limit == 0 {
            return Err(Error::InvalidConfig("search.max_results_limit must be > 0".into()));
        }
        if s.default_max_results == 0 || s.default_max_results > s.max_results_limit {
            return Err(Error::InvalidConfig(format!(
                "search.default_max_results must be in 1..={}",
                s.max_results_limit
            )));
        }
        if s.over_fetch == 0 {
            return Err(Error::InvalidConfig("search.over_fetch must be > 0".into()));
        }

        let k = &self.confidence;
        for (name, v) in [
            ("confidence.no_evidence", k.no_evidence),
            ("confidence.no_evidence_ceiling", k.no_evidence_ceiling),
            ("confidence.single_source_factor", k.single_source_factor),
            ("confidence.hedge_factor", k.hedge_factor),
            ("confidence.web_ceiling", k.web_ceiling),
        ] {
            unit_interval(name, v)?;
        }
        if k.no_evidence_ceiling > MAX_NO_EVIDENCE_CONFIDENCE {
            return Err(Error::InvalidConfig(format!(
                "confidence.no_evidence_ceiling ({}) must not exceed {MAX_NO_EVIDENCE_CONFIDENCE}",
                k.no_evidence_ceiling
            )));
        }
        if k.no_evidence > k.no_evidence_ceiling {
            return Err(Error::InvalidConfig(
                "confidence.no_evidence must not exceed no_evidence_ceiling".into(),
            ));
        }

        if self.services.embedding_dimension == 0 {
            return Err(Error::InvalidConfig("services.embedding_dimension must be > 0".into()));
        }
        Ok(())
    }
}

fn unit_interval(name: &str, v: f32) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be within [0, 1], got {v}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub vector_weight: f32,
    pub lexical_weight: f32,
    pub min_relevance: f32,
    pub over_fetch: usize,
    pub web_score_cap: f32,
    pub default_max_results: usize,
    pub max_results_limit: usize,
    pub phrase_bonus: f32,
    pub domain_term_bonus: f32,
    pub max_domain_bonus: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            lexical_weight: 0.3,
            min_relevance: 0.35,
            over_fetch: 2,
            web_score_cap: 0.3,
            default_max_results: 10,
            max_results_limit: 50,
            phrase_bonus: 0.1,
            domain_term_bonus: 0.05,
            max_domain_bonus: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_results: usize,
    pub model: String,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2000,
            context_results: 5,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Hard upper bound on the confidence of an answer with no evidence.
pub const MAX_NO_EVIDENCE_CONFIDENCE: f32 = 0.2;

/// Policy knobs for the reported confidence; see `docqa_answer::confidence`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub no_evidence: f32,
    pub no_evidence_ceiling: f32,
    pub min_corroborating: usize,
    pub single_source_factor: f32,
    pub hedge_factor: f32,
    pub web_ceiling: f32,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            no_evidence: 0.1,
            no_evidence_ceiling: 0.2,
            min_corroborating: 2,
            single_source_factor: 0.9,
            hedge_factor: 0.75,
            web_ceiling: 0.5,
        }
    }
}

/// Per-collaborator time limits in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutSettings {
    pub embedder: u64,
    pub vector_index: u64,
    pub lexical_index: u64,
    pub web_search: u64,
    pub answerer: u64,
    pub retries: u32,
}

impl TimeoutSettings {
    pub fn embedder(&self) -> Duration {
        Duration::from_millis(self.embedder)
    }
    pub fn vector_index(&self) -> Duration {
        Duration::from_millis(self.vector_index)
    }
    pub fn lexical_index(&self) -> Duration {
        Duration::from_millis(self.lexical_index)
    }
    pub fn web_search(&self) -> Duration {
        Duration::from_millis(self.web_search)
    }
    pub fn answerer(&self) -> Duration {
        Duration::from_millis(self.answerer)
    }
    /// At most one retry is ever attempted.
    pub fn retries(&self) -> u32 {
        self.retries.min(1)
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            embedder: 5_000,
            vector_index: 3_000,
            lexical_index: 3_000,
            web_search: 10_000,
            answerer: 60_000,
            retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    pub embedder_url: String,
    pub embedder_model: String,
    pub answerer_url: String,
    pub api_key_env: String,
    pub web_search_url: String,
    pub web_search_enabled: bool,
    pub embedding_dimension: usize,
    pub use_hashing_embedder: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            embedder_url: "https://api.openai.com/v1".to_string(),
            embedder_model: "text-embedding-3-small".to_string(),
            answerer_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            web_search_url: "https://api.duckduckgo.com/".to_string(),
            web_search_enabled: true,
            embedding_dimension: 1024,
            use_hashing_embedder: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSettings {
    pub tantivy_index_dir: String,
    pub lancedb_dir: String,
    pub raw_txt_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            tantivy_index_dir: ".docqa/index/tantivy".to_string(),
            lancedb_dir: ".docqa/index/lancedb".to_string(),
            raw_txt_dir: "data".to_string(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn web_cap_must_stay_below_threshold() {
        let mut s = Settings::default();
        s.search.web_score_cap = 0.4;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn no_evidence_ceiling_is_bounded() {
        let mut s = Settings::default();
        s.confidence.no_evidence_ceiling = 0.5;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
        s.confidence.no_evidence_ceiling = MAX_NO_EVIDENCE_CONFIDENCE;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut s = Settings::default();
        s.chunking.chunk_overlap = s.chunking.chunk_size;
        assert!(s.validate().is_err());
    }

    #[test]
    fn retries_are_clamped() {
        let t = TimeoutSettings { retries: 5, ..TimeoutSettings::default() };
        assert_eq!(t.retries(), 1);
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(resolve_with_base(base, "data"), PathBuf::from("/srv/app/data"));
    }
}
