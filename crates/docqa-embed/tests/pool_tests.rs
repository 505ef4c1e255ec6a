use candle_core::{DType, Device, Tensor};
use docqa_embed::masked_mean_l2;

fn pooled(hidden: &[f32], shape: (usize, usize, usize), mask: &[u32]) -> Vec<Vec<f32>> {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(hidden, shape, &dev).expect("hidden");
    let m = Tensor::from_slice(mask, (shape.0, shape.1), &dev).expect("mask");
    masked_mean_l2(&h, &m).expect("pool").to_dtype(DType::F32).expect("dtype").to_vec2().expect("vec")
}

#[test]
fn masked_tokens_do_not_contribute() {
    let out = pooled(&[3.0, 4.0, 100.0, -100.0], (1, 2, 2), &[1, 0]);
    assert!((out[0][0] - 0.6).abs() < 1e-5);
    assert!((out[0][1] - 0.8).abs() < 1e-5);
}

#[test]
fn unmasked_tokens_are_averaged() {
    let out = pooled(&[2.0, 0.0, 0.0, 2.0], (1, 2, 2), &[1, 1]);
    let expected = 1.0f32 / 2.0f32.sqrt();
    assert!((out[0][0] - expected).abs() < 1e-5);
    assert!((out[0][1] - expected).abs() < 1e-5);
}

#[test]
fn rows_are_pooled_independently() {
    let hidden = [1.0, 0.0, 1.0, 0.0, 0.0, 5.0, 9.0, 9.0];
    let out = pooled(&hidden, (2, 2, 2), &[1, 1, 1, 0]);
    assert!((out[0][0] - 1.0).abs() < 1e-5 && out[0][1].abs() < 1e-5);
    assert!(out[1][0].abs() < 1e-5 && (out[1][1] - 1.0).abs() < 1e-5);
}

#[test]
fn mismatched_mask_is_rejected() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((1, 3, 2), DType::F32, &dev).expect("hidden");
    let m = Tensor::ones((1, 2), DType::F32, &dev).expect("mask");
    assert!(masked_mean_l2(&h, &m).is_err());
}
