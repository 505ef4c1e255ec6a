//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K=5`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self::from_figment(figment);
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Ok(flag) = self.get::<serde_json::Value>("use_fake_models") {
            settings.models.use_fake |= match flag {
                serde_json::Value::Bool(b) => b,
                serde_json::Value::Number(n) => n.as_u64() == Some(1),
                serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
                _ => false,
            };
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub retrieval: RetrievalSettings,
    pub answer: AnswerSettings,
    pub models: ModelSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub docs_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        let chunking = ChunkingConfig::default();
        Self {
            docs_dir: "docs".to_string(),
            chunk_size: chunking.size,
            chunk_overlap: chunking.overlap,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub low_confidence_threshold: f32,
    pub max_context_chars: Option<usize>,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self { low_confidence_threshold: 0.05, max_context_chars: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedder_dir: Option<String>,
    pub extractor_dir: Option<String>,
    pub use_fake: bool,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking()
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("corpus: {e}")))?;
        if self.corpus.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("corpus.embed_batch_size must be greater than zero".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be greater than zero".into()));
        }
        let threshold = self.answer.low_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!(
                "answer.low_confidence_threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(())
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { size: self.corpus.chunk_size, overlap: self.corpus.chunk_overlap }
    }

    pub fn docs_dir(&self) -> PathBuf {
        expand_path(&self.corpus.docs_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_any_source() {
        Jail::expect_with(|_jail| {
            let settings = Config::load_for_env("dev").expect("config").settings().expect("settings");
            assert_eq!(settings.corpus.chunk_size, 500);
            assert_eq!(settings.corpus.chunk_overlap, 50);
            assert_eq!(settings.retrieval.top_k, 3);
            assert!((settings.answer.low_confidence_threshold - 0.05).abs() < f32::EPSILON);
            assert!(settings.answer.max_context_chars.is_none());
            assert!(!settings.models.use_fake);
            Ok(())
        });
    }

    #[test]
    fn env_file_and_variables_layer_over_base_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[corpus]\nchunk_size = 300\ndocs_dir = \"pdfs\"\n[retrieval]\ntop_k = 4\n")?;
            jail.create_file("config.test.toml", "[retrieval]\ntop_k = 6\n")?;
            jail.set_env("APP_CORPUS__CHUNK_OVERLAP", "20");
            jail.set_env("APP_USE_FAKE_MODELS", "1");
            let settings = Config::load_for_env("test").expect("config").settings().expect("settings");
            assert_eq!(settings.corpus.chunk_size, 300);
            assert_eq!(settings.corpus.chunk_overlap, 20);
            assert_eq!(settings.retrieval.top_k, 6);
            assert_eq!(settings.docs_dir(), PathBuf::from("pdfs"));
            assert!(settings.models.use_fake);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected_at_load() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[corpus]\nchunk_size = 10\nchunk_overlap = 10\n")?;
            assert!(matches!(Config::load_for_env("dev"), Err(Error::InvalidConfig(_))));
            jail.create_file("config.toml", "[answer]\nlow_confidence_threshold = 1.5\n")?;
            assert!(matches!(Config::load_for_env("dev"), Err(Error::InvalidConfig(_))));
            jail.create_file("config.toml", "[retrieval]\ntop_k = 0\n")?;
            assert!(matches!(Config::load_for_env("dev"), Err(Error::InvalidConfig(_))));
            Ok(())
        });
    }

    #[test]
    fn resolve_keeps_absolute_and_joins_relative() {
        let base = Path::new("/srv/docqa");
        assert_eq!(resolve_with_base(base, "models/minilm"), PathBuf::from("/srv/docqa/models/minilm"));
        assert_eq!(resolve_with_base(base, "/opt/models"), PathBuf::from("/opt/models"));
    }
}
