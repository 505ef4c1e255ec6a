//! Corpus snapshot: passages and their index, built together and replaced together.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use docqa_core::chunker::{spans, ChunkingConfig};
use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use docqa_core::types::{Document, Passage, Vector};
use docqa_vector::FlatIndex;

/// Immutable passages + index pair. Passage `i` is vector `i` in the index.
#[derive(Debug)]
pub struct Corpus {
    documents: usize,
    passages: Vec<Passage>,
    index: Option<FlatIndex>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub passages: usize,
    pub dim: Option<usize>,
    pub sample: Option<String>,
}

impl Corpus {
    /// Chunk, embed and index `documents`. A corpus without any text builds
    /// successfully but has no index, so every retrieval fails with `EmptyIndex`.
    pub fn build(documents: &[Document], chunking: ChunkingConfig, embedder: &dyn Embedder, batch_size: usize) -> Result<Self> {
        let passages = split_documents(documents, chunking)?;
        if passages.is_empty() {
            tracing::warn!(documents = documents.len(), "no passages to index");
            return Ok(Self { documents: documents.len(), passages, index: None });
        }
        tracing::info!("Embedding {} passages from {} documents", passages.len(), documents.len());
        let vectors = embed_passages(&passages, embedder, batch_size.max(1))?;
        let index = FlatIndex::build(&vectors)?;
        tracing::info!(passages = passages.len(), dim = index.dim(), "corpus index built");
        Ok(Self { documents: documents.len(), passages, index: Some(index) })
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn index(&self) -> Option<&FlatIndex> {
        self.index.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            documents: self.documents,
            passages: self.passages.len(),
            dim: self.index.as_ref().map(FlatIndex::dim),
            sample: self.passages.first().map(|p| p.text.chars().take(100).collect()),
        }
    }
}

/// Split every document into passages numbered consecutively across the corpus.
pub fn split_documents(documents: &[Document], chunking: ChunkingConfig) -> Result<Vec<Passage>> {
    chunking.validate()?;
    let mut passages = Vec::new();
    for doc in documents {
        for (start, text) in spans(&doc.text, chunking) {
            passages.push(Passage { index: passages.len(), source: doc.source.clone(), start, text: text.to_string() });
        }
    }
    Ok(passages)
}

fn embed_passages(passages: &[Passage], embedder: &dyn Embedder, batch_size: usize) -> Result<Vec<Vector>> {
    let pb = ProgressBar::new(passages.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let mut vectors = Vec::with_capacity(passages.len());
    for batch in passages.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        let embedded = embedder.embed_batch(&texts).map_err(|e| Error::extraction(&e))?;
        if embedded.len() != texts.len() {
            return Err(Error::ExtractionFailure(format!(
                "embedder returned {} vectors for {} passages",
                embedded.len(),
                texts.len()
            )));
        }
        for v in &embedded {
            if v.len() != embedder.dim() {
                return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: v.len() });
            }
        }
        vectors.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(vectors)
}
