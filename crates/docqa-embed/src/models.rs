//! Locating and reading model directories (`config.json`, `tokenizer.json`, weights).

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use docqa_core::config::resolve_with_base;

pub const DEFAULT_EMBEDDER_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_EXTRACTOR_MODEL: &str = "bert-base-cased-squad2";

/// First existing directory among the configured one, `models/<name>` and `../models/<name>`,
/// relative paths taken from `base`.
pub fn resolve_model_dir(configured: Option<&str>, name: &str, base: &Path) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = resolve_with_base(base, dir);
        if p.exists() {
            tracing::info!("Using configured model dir: {}", p.display());
            return Ok(p);
        }
        tracing::warn!("Configured model dir {} does not exist", p.display());
    }
    for candidate in [base.join("models").join(name), base.join("../models").join(name)] {
        if candidate.exists() {
            tracing::info!("Using model dir: {}", candidate.display());
            return Ok(candidate);
        }
    }
    Err(anyhow!("Could not locate model directory for {name}"))
}

pub fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))
}

pub fn read_config(model_dir: &Path) -> Result<String> {
    let config_path = model_dir.join("config.json");
    std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))
}

/// `model.safetensors` when present, otherwise `pytorch_model.bin`.
pub fn load_weights<'a>(model_dir: &Path, device: &'a Device) -> Result<VarBuilder<'a>> {
    let safetensors = model_dir.join("model.safetensors");
    let weights: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, &Device::Cpu)
            .with_context(|| format!("loading {}", safetensors.display()))?
    } else {
        let weights_path = model_dir.join("pytorch_model.bin");
        candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("loading {}", weights_path.display()))?
            .into_iter()
            .collect()
    };
    Ok(VarBuilder::from_tensors(weights, DType::F32, device))
}
