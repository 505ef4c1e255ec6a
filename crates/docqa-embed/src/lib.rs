//! docqa-embed
//!
//! Model adapters behind the `Embedder` and `Extractor` seams: candle BERT models
//! for real runs, hashing/lexical stand-ins when `models.use_fake` is set.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::config::ModelSettings;
use docqa_core::traits::{Embedder, Extractor};

pub mod device;
pub mod embedder;
pub mod hashing;
pub mod lexical;
pub mod models;
pub mod pool;
pub mod qa;
pub mod tokenize;

pub use embedder::BertEmbedder;
pub use hashing::HashingEmbedder;
pub use lexical::LexicalExtractor;
pub use pool::masked_mean_l2;
pub use qa::BertQaExtractor;

/// Dimension of the hashing stand-in, matching all-MiniLM-L6-v2.
pub const FAKE_EMBEDDING_DIM: usize = 384;

pub fn get_default_embedder(settings: &ModelSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake {
        tracing::info!("Using HashingEmbedder");
        return Ok(Arc::new(HashingEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    let base = std::env::current_dir()?;
    let dir = models::resolve_model_dir(settings.embedder_dir.as_deref(), models::DEFAULT_EMBEDDER_MODEL, &base)?;
    Ok(Arc::new(BertEmbedder::load(&dir)?))
}

pub fn get_default_extractor(settings: &ModelSettings) -> Result<Arc<dyn Extractor>> {
    if settings.use_fake {
        tracing::info!("Using LexicalExtractor");
        return Ok(Arc::new(LexicalExtractor));
    }
    let base = std::env::current_dir()?;
    let dir = models::resolve_model_dir(settings.extractor_dir.as_deref(), models::DEFAULT_EXTRACTOR_MODEL, &base)?;
    Ok(Arc::new(BertQaExtractor::load(&dir)?))
}
