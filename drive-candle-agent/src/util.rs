//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor, Var};
use candle_nn::VarMap;
use log::trace;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
mod named_tensors;
pub use named_tensors::NamedTensors;

/// Critic loss type.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: i64);
}

pub(crate) fn lock_vars(varmap: &VarMap) -> Result<MutexGuard<'_, HashMap<String, Var>>> {
    lock(varmap.data())
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|e| anyhow!("Failed to lock variables: {}", e))
}

/// Copies the values of all variables in `src` into the variables of the
/// same name in `dest`.
///
/// After the copy both maps hold bit-identical values.
pub fn copy_varmap(dest: &VarMap, src: &VarMap) -> Result<()> {
    trace!("dest");
    let dest = lock_vars(dest)?;
    trace!("src");
    let src = lock_vars(src)?;

    for (name, v_dest) in dest.iter() {
        let v_src = src
            .get(name)
            .ok_or_else(|| anyhow!("Variable {} not found in source", name))?;
        v_dest.set(v_src.as_tensor())?;
    }

    Ok(())
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?;
    let m2 = (1.0 - &m1)?;
    (((0.5 * m1)? * d.powf(2.0))? + m2 * (d - 0.5))?.mean_all()
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::Device;
    use candle_nn::Init;

    fn varmap(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), "var1", init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        lock_vars(&vm)?.get("var1").unwrap().set(&t)?;
        Ok(vm)
    }

    #[test]
    fn test_copy_varmap() -> Result<()> {
        let src = varmap(&[1.0, 2.0, 3.0])?;
        let dest = varmap(&[4.0, 5.0, 6.0])?;
        copy_varmap(&dest, &src)?;

        let t: Vec<f32> = lock_vars(&dest)?["var1"].as_tensor().to_vec1()?;
        assert_eq!(t, vec![1.0, 2.0, 3.0]);

        // The copy does not alias the source.
        let t = Tensor::from_slice(&[7.0f32, 8.0, 9.0], (3,), &Device::Cpu)?;
        lock_vars(&src)?["var1"].set(&t)?;
        let t: Vec<f32> = lock_vars(&dest)?["var1"].as_tensor().to_vec1()?;
        assert_eq!(t, vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_smooth_l1_loss() -> Result<()> {
        let x = Tensor::from_slice(&[0.0f32, 0.0], (2,), &Device::Cpu)?;
        let y = Tensor::from_slice(&[0.5f32, 3.0], (2,), &Device::Cpu)?;
        // (0.5 * 0.25 + (3.0 - 0.5)) / 2
        let loss = smooth_l1_loss(&x, &y)?.to_scalar::<f32>()?;
        assert!((loss - 1.3125).abs() < 1e-6);
        Ok(())
    }
}
