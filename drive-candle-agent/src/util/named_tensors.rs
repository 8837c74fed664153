use super::lock_vars;
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use std::collections::HashMap;

/// Named tensors to send model parameters using a channel.
///
/// The tensors are deep copies on the CPU, so later updates of the source
/// do not show up in a snapshot.
#[derive(Clone, Debug)]
pub struct NamedTensors {
    pub named_tensors: HashMap<String, Tensor>,
}

impl NamedTensors {
    /// Copy data of [`VarMap`] to CPU.
    pub fn copy_from(vm: &VarMap) -> Result<Self> {
        let vars = lock_vars(vm)?;
        let named_tensors = vars
            .iter()
            .map(|(k, v)| {
                let t = v.as_tensor().detach().to_device(&Device::Cpu)?.copy()?;
                Ok((k.clone(), t))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { named_tensors })
    }

    /// Copy named tensors to [`VarMap`].
    pub fn copy_to(&self, vm: &VarMap) -> Result<()> {
        let vars = lock_vars(vm)?;
        for (name, var) in vars.iter() {
            let src = self
                .named_tensors
                .get(name)
                .ok_or_else(|| anyhow!("Parameter {} not found in snapshot", name))?;
            var.set(&src.to_device(var.device())?)?;
        }
        Ok(())
    }

    /// Returns `true` if both hold the same names and bit-identical values.
    pub fn bit_eq(&self, other: &Self) -> Result<bool> {
        if self.named_tensors.len() != other.named_tensors.len() {
            return Ok(false);
        }
        for (name, t) in self.named_tensors.iter() {
            let o = match other.named_tensors.get(name) {
                Some(o) => o,
                None => return Ok(false),
            };
            if t.dims() != o.dims() {
                return Ok(false);
            }
            let a: Vec<f32> = t.flatten_all()?.to_vec1()?;
            let b: Vec<f32> = o.flatten_all()?.to_vec1()?;
            if a.iter().zip(b.iter()).any(|(x, y)| x.to_bits() != y.to_bits()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::{linear, Module, VarBuilder};

    #[test]
    fn test_named_tensors() -> Result<()> {
        let vm1 = VarMap::new();
        let model1 = linear(3, 2, VarBuilder::from_varmap(&vm1, DType::F32, &Device::Cpu).pp("l1"))?;
        let vm2 = VarMap::new();
        let model2 = linear(3, 2, VarBuilder::from_varmap(&vm2, DType::F32, &Device::Cpu).pp("l1"))?;

        let x = Tensor::from_slice(&[1.0f32, 2.0, 3.0], (1, 3), &Device::Cpu)?;
        let y1: Vec<f32> = model1.forward(&x)?.flatten_all()?.to_vec1()?;
        let y2: Vec<f32> = model2.forward(&x)?.flatten_all()?.to_vec1()?;
        assert_ne!(y1, y2);

        let nt = NamedTensors::copy_from(&vm1)?;
        assert!(!nt.bit_eq(&NamedTensors::copy_from(&vm2)?)?);
        nt.copy_to(&vm2)?;
        let y3: Vec<f32> = model2.forward(&x)?.flatten_all()?.to_vec1()?;
        assert_eq!(y1, y3);
        assert!(nt.bit_eq(&NamedTensors::copy_from(&vm2)?)?);
        Ok(())
    }
}
