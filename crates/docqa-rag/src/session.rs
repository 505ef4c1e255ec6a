//! Process-wide question answering session.
//!
//! Models load on first use and stay for the life of the session. The corpus is
//! built on first use and replaced as a whole by [`Session::reload`]; readers keep
//! whatever snapshot they already hold.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

use docqa_core::config::Settings;
use docqa_core::traits::{DocumentSource, Embedder, Extractor};

use crate::corpus::{Corpus, CorpusStats};
use crate::pipeline::answer_question;
use crate::policy::{AnswerPolicy, Outcome};

type Loader<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

pub struct Session {
    settings: Settings,
    docs_dir: PathBuf,
    source: Box<dyn DocumentSource>,
    load_embedder: Loader<dyn Embedder>,
    load_extractor: Loader<dyn Extractor>,
    embedder: OnceCell<Arc<dyn Embedder>>,
    extractor: OnceCell<Arc<dyn Extractor>>,
    corpus: Mutex<Option<Arc<Corpus>>>,
}

impl Session {
    pub fn new<E, X>(settings: Settings, source: Box<dyn DocumentSource>, load_embedder: E, load_extractor: X) -> Self
    where
        E: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
        X: Fn() -> Result<Arc<dyn Extractor>> + Send + Sync + 'static,
    {
        let docs_dir = settings.docs_dir();
        Self {
            settings,
            docs_dir,
            source,
            load_embedder: Box::new(load_embedder),
            load_extractor: Box::new(load_extractor),
            embedder: OnceCell::new(),
            extractor: OnceCell::new(),
            corpus: Mutex::new(None),
        }
    }

    /// Session over already loaded models.
    pub fn with_models(
        settings: Settings,
        source: Box<dyn DocumentSource>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let session = Self::new(settings, source, || anyhow::bail!("embedder preset"), || anyhow::bail!("extractor preset"));
        let _ = session.embedder.set(embedder);
        let _ = session.extractor.set(extractor);
        session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn docs_dir(&self) -> &std::path::Path {
        &self.docs_dir
    }

    pub fn embedder(&self) -> Result<&Arc<dyn Embedder>> {
        self.embedder.get_or_try_init(|| {
            tracing::info!("Loading embedding model");
            (self.load_embedder)().context("failed to load embedding model")
        })
    }

    pub fn extractor(&self) -> Result<&Arc<dyn Extractor>> {
        self.extractor.get_or_try_init(|| {
            tracing::info!("Loading question answering model");
            (self.load_extractor)().context("failed to load question answering model")
        })
    }

    /// Current corpus snapshot, built from the docs folder on first call.
    pub fn corpus(&self) -> Result<Arc<Corpus>> {
        let mut slot = self.lock_corpus();
        if let Some(corpus) = slot.as_ref() {
            return Ok(Arc::clone(corpus));
        }
        let corpus = Arc::new(self.build_corpus()?);
        *slot = Some(Arc::clone(&corpus));
        Ok(corpus)
    }

    /// Rebuild the corpus and swap it in. On failure the previous snapshot stays.
    pub fn reload(&self) -> Result<Arc<Corpus>> {
        let corpus = Arc::new(self.build_corpus()?);
        *self.lock_corpus() = Some(Arc::clone(&corpus));
        tracing::info!(passages = corpus.passages().len(), "corpus reloaded");
        Ok(corpus)
    }

    pub fn stats(&self) -> Result<CorpusStats> {
        Ok(self.corpus()?.stats())
    }

    /// Answer `question` against the current snapshot. Errors here are setup
    /// failures (models or corpus); per-question failures come back as [`Outcome::Failed`].
    pub fn ask(&self, question: &str) -> Result<Outcome> {
        let corpus = self.corpus()?;
        let embedder = self.embedder()?;
        let extractor = self.extractor()?;
        let policy = AnswerPolicy::from(&self.settings.answer);
        Ok(answer_question(
            question,
            &corpus,
            embedder.as_ref(),
            extractor.as_ref(),
            self.settings.retrieval.top_k,
            &policy,
        ))
    }

    fn build_corpus(&self) -> Result<Corpus> {
        let documents = self
            .source
            .load(&self.docs_dir)
            .with_context(|| format!("failed to load documents from {}", self.docs_dir.display()))?;
        tracing::info!(documents = documents.len(), dir = %self.docs_dir.display(), "documents loaded");
        let embedder = self.embedder()?;
        let corpus = Corpus::build(
            &documents,
            self.settings.chunking(),
            embedder.as_ref(),
            self.settings.corpus.embed_batch_size,
        )?;
        Ok(corpus)
    }

    fn lock_corpus(&self) -> MutexGuard<'_, Option<Arc<Corpus>>> {
        self.corpus.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

static GLOBAL: OnceCell<Session> = OnceCell::new();

/// Install the process-wide session. Fails if one is already installed.
pub fn install(session: Session) -> Result<&'static Session> {
    GLOBAL.set(session).map_err(|_| anyhow::anyhow!("session already installed"))?;
    global().context("session missing after install")
}

pub fn global() -> Option<&'static Session> {
    GLOBAL.get()
}
