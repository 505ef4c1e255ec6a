use std::path::Path;

use crate::types::{Document, ExtractedSpan, Vector};

/// Maps texts to fixed-dimension vectors. Every call in a session returns `dim()`-long vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vector>>;
}

/// Extractive question answering over a context string.
pub trait Extractor: Send + Sync {
    fn answer(&self, question: &str, context: &str) -> anyhow::Result<ExtractedSpan>;
}

/// Produces the documents of a corpus from a folder.
pub trait DocumentSource: Send + Sync {
    fn load(&self, folder: &Path) -> anyhow::Result<Vec<Document>>;
}

/// Turns a PDF file into plain text; an empty string means nothing could be read.
pub trait PdfTextSource: Send + Sync {
    fn extract(&self, path: &Path) -> anyhow::Result<String>;
}
