use serde::Serialize;

use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use docqa_core::types::Passage;

use crate::corpus::Corpus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub passage: Passage,
    /// Squared Euclidean distance to the query; lower is closer.
    pub distance: f32,
}

/// Passages ordered by ascending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedPassage>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedPassage> {
        self.hits.iter()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.passage.text.as_str())
    }
}

/// Embed `query_text` and return the `k` closest passages of `corpus`.
pub fn retrieve(query_text: &str, corpus: &Corpus, embedder: &dyn Embedder, k: usize) -> Result<RetrievalResult> {
    let index = corpus.index().ok_or(Error::EmptyIndex)?;
    let mut embedded = embedder
        .embed_batch(&[query_text.to_string()])
        .map_err(|e| Error::extraction(&e))?;
    if embedded.len() != 1 {
        return Err(Error::ExtractionFailure(format!("embedder returned {} vectors for one query", embedded.len())));
    }
    let query = embedded.remove(0);
    let neighbors = index.search(&query, k)?;
    let hits = neighbors
        .into_iter()
        .map(|n| RetrievedPassage { passage: corpus.passages()[n.position].clone(), distance: n.distance })
        .collect::<Vec<_>>();
    tracing::debug!(
        query = query_text,
        hits = ?hits.iter().map(|h| (h.passage.index, h.distance)).collect::<Vec<_>>(),
        "retrieved passages"
    );
    Ok(RetrievalResult { hits })
}

/// Retrieval with a fixed embedder and `top_k`.
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    pub fn retrieve(&self, query_text: &str, corpus: &Corpus) -> Result<RetrievalResult> {
        retrieve(query_text, corpus, self.embedder, self.top_k)
    }
}
