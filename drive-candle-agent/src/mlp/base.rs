use super::MlpConfig;
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let mut dims = vec![config.in_dim as usize];
    dims.extend(config.units.iter().map(|&u| u as usize));
    dims.push(config.out_dim as usize);
    let vs = vs.pp(prefix);

    Ok(dims
        .windows(2)
        .enumerate()
        .map(|(i, w)| linear(w[0], w[1], vs.pp(format!("ln{}", i))))
        .collect::<Result<_, _>>()?)
}

/// Multilayer perceptron with ReLU activation function.
///
/// The input is flattened from the second dimension, so observations of any
/// shape can be fed as long as the number of elements matches `in_dim`.
pub struct Mlp {
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> candle_core::Result<Tensor> {
        let mut xs = xs.to_device(&self.device)?.flatten_from(1)?;
        let n_layers = self.layers.len();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < n_layers {
                xs = xs.relu()?;
            }
        }
        Ok(xs)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config)?;
        Ok(Self { device, layers })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_forward() -> Result<()> {
        let vm = VarMap::new();
        let vb = VarBuilder::from_varmap(&vm, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, MlpConfig::new(6, vec![8, 8], 3))?;
        assert_eq!(vm.all_vars().len(), 6);

        let xs = Tensor::zeros((5, 2, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(mlp.forward(&xs)?.dims(), &[5, 3]);
        Ok(())
    }
}
