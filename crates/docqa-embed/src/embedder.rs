use anyhow::{anyhow, Result};
use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

use docqa_core::traits::Embedder;
use docqa_core::types::Vector;

use crate::device::select_device;
use crate::models::{load_tokenizer, load_weights, read_config};
use crate::pool::masked_mean_l2;
use crate::tokenize::{encode, to_device};

/// Sentence embedder for BERT-architecture sentence-transformers models (all-MiniLM-L6-v2 by default).
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!("Loading sentence embedder from {}", model_dir.display());
        let tokenizer = load_tokenizer(model_dir)?;
        let raw_config = read_config(model_dir)?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let shape: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = json_usize(&shape, "hidden_size")?;
        let max_len = json_usize(&shape, "max_position_embeddings")?.min(256);
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, max_len, "Sentence embedder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    fn embed_text(&self, text: &str) -> Result<Vector> {
        let encoding = encode(&self.tokenizer, text)?;
        let input = to_device(&encoding, self.max_len, &self.device)?;
        let hidden = self
            .model
            .forward(&input.input_ids, &input.token_type_ids, Some(&input.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &input.attention_mask)?;
        let embedding: Vector = pooled.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1()?;
        if embedding.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", embedding.len(), self.dim));
        }
        Ok(embedding)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let start = Instant::now();
        let embeddings = texts.iter().map(|t| self.embed_text(t)).collect::<Result<Vec<_>>>()?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis(), "embedded batch");
        Ok(embeddings)
    }
}

pub(crate) fn json_usize(config: &serde_json::Value, key: &str) -> Result<usize> {
    config
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| anyhow!("config.json has no usable '{key}'"))
}
