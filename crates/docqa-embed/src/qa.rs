//! Extractive question answering with a BERT encoder and a `qa_outputs` span head.

use anyhow::Result;
use candle_core::{Device, IndexOp, Module};
use candle_nn::Linear;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use tokenizers::Tokenizer;

use docqa_core::traits::Extractor;
use docqa_core::types::ExtractedSpan;

use crate::device::select_device;
use crate::embedder::json_usize;
use crate::models::{load_tokenizer, load_weights, read_config};
use crate::tokenize::{encode, to_device};

/// Longest answer, in tokens, considered when pairing start and end positions.
pub const MAX_ANSWER_TOKENS: usize = 15;

pub struct BertQaExtractor {
    model: BertModel,
    qa_outputs: Linear,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl BertQaExtractor {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!("Loading extractive QA model from {}", model_dir.display());
        let tokenizer = load_tokenizer(model_dir)?;
        let raw_config = read_config(model_dir)?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let shape: serde_json::Value = serde_json::from_str(&raw_config)?;
        let hidden_size = json_usize(&shape, "hidden_size")?;
        let max_len = json_usize(&shape, "max_position_embeddings")?.min(384);
        let (model, qa_outputs) = {
            let vb = load_weights(model_dir, &device)?;
            let qa_outputs = candle_nn::linear(hidden_size, 2, vb.pp("qa_outputs"))?;
            (BertModel::load(vb, &config)?, qa_outputs)
        };
        tracing::info!(max_len, "Extractive QA model loaded");
        Ok(Self { model, qa_outputs, tokenizer, device, max_len })
    }
}

impl Extractor for BertQaExtractor {
    fn answer(&self, question: &str, context: &str) -> Result<ExtractedSpan> {
        if context.trim().is_empty() {
            return Ok(ExtractedSpan::new("", 0.0));
        }
        let encoding = encode(&self.tokenizer, (question, context))?;
        let input = to_device(&encoding, self.max_len, &self.device)?;
        let hidden = self
            .model
            .forward(&input.input_ids, &input.token_type_ids, Some(&input.attention_mask))?;
        let logits = self.qa_outputs.forward(&hidden)?.squeeze(0)?;
        let start_logits: Vec<f32> = logits.i((.., 0))?.to_vec1()?;
        let end_logits: Vec<f32> = logits.i((.., 1))?.to_vec1()?;

        // Only tokens of the context (second sequence) may open or close an answer.
        let candidates: Vec<usize> = encoding
            .get_sequence_ids()
            .iter()
            .take(input.len)
            .enumerate()
            .filter_map(|(i, seq)| (*seq == Some(1)).then_some(i))
            .collect();
        let Some(best) = best_span(&start_logits, &end_logits, &candidates, MAX_ANSWER_TOKENS) else {
            return Ok(ExtractedSpan::new("", 0.0));
        };
        let offsets = encoding.get_offsets();
        let (from, to) = (offsets[best.start].0, offsets[best.end].1);
        let span = context.get(from..to).unwrap_or_default().trim();
        let response = serde_json::json!({ "answer": span, "score": best.score, "start": from, "end": to });
        tracing::debug!(%response, "extractive QA response");
        Ok(ExtractedSpan::from_json(&response)?)
    }
}

/// Best answer found by [`best_span`]: token positions and joint probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanScore {
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// Pick `start <= end < start + max_tokens` among `candidates` maximising
/// `p_start * p_end`, with both distributions softmaxed over the candidates only.
pub fn best_span(start_logits: &[f32], end_logits: &[f32], candidates: &[usize], max_tokens: usize) -> Option<SpanScore> {
    let start_p = softmax_over(start_logits, candidates);
    let end_p = softmax_over(end_logits, candidates);
    let mut best: Option<SpanScore> = None;
    for (a, &start) in candidates.iter().enumerate() {
        for (b, &end) in candidates.iter().enumerate().skip(a) {
            if end - start >= max_tokens {
                break;
            }
            let score = start_p[a] * end_p[b];
            if best.map_or(true, |s| score > s.score) {
                best = Some(SpanScore { start, end, score });
            }
        }
    }
    best
}

fn softmax_over(logits: &[f32], candidates: &[usize]) -> Vec<f32> {
    let max = candidates.iter().map(|&i| logits[i]).fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = candidates.iter().map(|&i| (logits[i] - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
