use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Sentence vector from token states: mean over tokens where `attention_mask` is set,
/// scaled to unit length. `[B,T,H]` + `[B,T]` -> `[B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, width) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, tokens],
        "mask shape {:?} does not match hidden states {:?}",
        attention_mask.dims(),
        hidden.dims()
    );

    let weights = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&weights.unsqueeze(2)?)?.sum(1)?;
    let counts = weights.sum_keepdim(1)?;
    let mean = summed.broadcast_div(&counts)?;

    let eps = if hidden.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, eps)?;
    let pooled = mean.broadcast_div(&norm)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?}", pooled.dims());
    Ok(pooled)
}
