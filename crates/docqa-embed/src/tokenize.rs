use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Encoding, Tokenizer};

/// Model inputs for a single sequence, each shaped `[1, T]`.
pub struct EncodedInput {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
    /// Tokens kept after truncation.
    pub len: usize,
}

pub fn encode<'s, E>(tokenizer: &Tokenizer, input: E) -> Result<Encoding>
where
    E: Into<EncodeInput<'s>>,
{
    tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))
}

/// Truncate `encoding` to `max_len` tokens and move it onto `device`. No padding: one sequence per call.
pub fn to_device(encoding: &Encoding, max_len: usize, device: &Device) -> Result<EncodedInput> {
    let len = encoding.get_ids().len().min(max_len);
    if len < encoding.get_ids().len() {
        tracing::debug!(tokens = encoding.get_ids().len(), max_len, "truncating model input");
    }
    let input_ids = Tensor::new(&encoding.get_ids()[..len], device)?.unsqueeze(0)?;
    let token_type_ids = Tensor::new(&encoding.get_type_ids()[..len], device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(&encoding.get_attention_mask()[..len], device)?.unsqueeze(0)?;
    Ok(EncodedInput { input_ids, token_type_ids, attention_mask, len })
}
