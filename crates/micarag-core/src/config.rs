//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + the plain environment names of the deployment (`TOP_K`, `OLLAMA_MODEL`, ...)
//! + `APP_*` env vars, then validates the result once at startup.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment names accepted without the `APP_` prefix.
const PLAIN_ENV_KEYS: &[&str] = &[
    "index_uri",
    "collection_name",
    "embedding_model",
    "reranker_model",
    "llm_provider",
    "ollama_model",
    "ollama_url",
    "top_k",
    "top_n",
];

/// Generation backends. Only a local Ollama server is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(Error::Configuration(format!(
                "unsupported llm_provider '{other}', only 'ollama' is available"
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Ollama => f.write_str("ollama"),
        }
    }
}

/// Every tunable of the query pipeline, the indexer and the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Local LanceDB directory. Must not start with `db`, which LanceDB
    /// reserves for cloud addresses.
    pub index_uri: String,
    pub collection_name: String,
    pub embedding_model: String,
    pub reranker_model: String,
    pub llm_provider: String,
    pub ollama_model: String,
    pub ollama_url: String,
    /// Directory holding downloaded model files, one subdirectory per model.
    pub models_dir: String,
    /// Retrieval breadth.
    pub top_k: usize,
    /// Answer breadth, `1 <= top_n <= top_k`.
    pub top_n: usize,
    pub reranker_max_len: usize,
    pub search_timeout_ms: u64,
    pub generation_timeout_ms: u64,
    pub processed_dir: String,
    pub index_batch_size: usize,
    pub server_addr: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            index_uri: "data/lancedb".to_string(),
            collection_name: "crypto_mica_v1".to_string(),
            embedding_model: "intfloat/multilingual-e5-small".to_string(),
            reranker_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            llm_provider: "ollama".to_string(),
            ollama_model: "mistral:7b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            models_dir: "models".to_string(),
            top_k: 12,
            top_n: 5,
            reranker_max_len: 512,
            search_timeout_ms: 10_000,
            generation_timeout_ms: 120_000,
            processed_dir: "data/processed".to_string(),
            index_batch_size: 128,
            server_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<()> {
        self.provider()?;
        let required = [
            ("index_uri", &self.index_uri),
            ("collection_name", &self.collection_name),
            ("embedding_model", &self.embedding_model),
            ("reranker_model", &self.reranker_model),
            ("ollama_model", &self.ollama_model),
            ("ollama_url", &self.ollama_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{name} must not be empty")));
            }
        }
        let location = self.index_location();
        if location.starts_with("db") || location.contains("://") {
            return Err(Error::Configuration(format!(
                "index_uri '{location}' is not a local directory; remote indexes are not supported \
                 (a relative path starting with 'db' can be written as './{location}')"
            )));
        }
        if self.top_n == 0 {
            return Err(Error::Configuration("top_n must be at least 1".into()));
        }
        if self.top_n > self.top_k {
            return Err(Error::Configuration(format!(
                "top_n ({}) must not exceed top_k ({})",
                self.top_n, self.top_k
            )));
        }
        if self.reranker_max_len == 0 {
            return Err(Error::Configuration("reranker_max_len must be positive".into()));
        }
        if self.search_timeout_ms == 0 || self.generation_timeout_ms == 0 {
            return Err(Error::Configuration("timeouts must be positive".into()));
        }
        if self.index_batch_size == 0 {
            return Err(Error::Configuration("index_batch_size must be positive".into()));
        }
        Ok(())
    }

    pub fn provider(&self) -> Result<LlmProvider> {
        self.llm_provider.parse()
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn models_path(&self) -> PathBuf {
        expand_path(&self.models_dir)
    }

    pub fn processed_path(&self) -> PathBuf {
        expand_path(&self.processed_dir)
    }

    /// `index_uri` after `~`/`${VAR}` expansion.
    pub fn index_location(&self) -> String {
        expand_path(&self.index_uri).to_string_lossy().into_owned()
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(RagSettings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::raw().only(PLAIN_ENV_KEYS))
            .merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    /// Wrap an already assembled figment, e.g. in tests.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extract and validate the full settings.
    pub fn settings(&self) -> Result<RagSettings> {
        let settings: RagSettings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// `~` and `${VAR}` expansion for configured paths. Unknown variables are
/// left as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let with_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}
