use anyhow::Result;
use candle_core::{Device, Tensor};

/// Observation convertible into a tensor.
pub trait TensorObs {
    /// Returns a tensor without batch dimension, `f32` for network input.
    fn to_tensor(&self, device: &Device) -> candle_core::Result<Tensor>;
}

/// Stacks observations along a new batch dimension.
pub(crate) fn stack_obs<O: TensorObs>(obs: &[O], device: &Device) -> Result<Tensor> {
    let xs = obs
        .iter()
        .map(|o| o.to_tensor(device))
        .collect::<candle_core::Result<Vec<_>>>()?;
    Ok(Tensor::stack(&xs, 0)?)
}
