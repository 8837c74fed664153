use super::CnnConfig;
use crate::model::SubModel1;
use anyhow::{ensure, Result};
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d, linear,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};

#[allow(clippy::upper_case_acronyms)]
/// Convolutional Q-network on camera images.
///
/// The input is a batch of channel-last images `[N, H, W, C]` with values
/// in `[0, 1]`. A stack of strided convolutions is followed by global
/// average pooling and a linear head, so any image size is accepted.
pub struct Cnn {
    device: Device,
    seq: Sequential,
}

// SAFETY: `Sequential` erases `Send` from its boxed layers, but `create_net`
// only adds `Func` (an `Arc<dyn Fn + Send + Sync>`), `Conv2d` and `Linear`,
// all of which are `Send`.
unsafe impl Send for Cnn {}

impl Cnn {
    fn stride(s: usize) -> Conv2dConfig {
        Conv2dConfig {
            stride: s,
            ..Default::default()
        }
    }

    fn create_net(vb: &VarBuilder, config: &CnnConfig) -> Result<Sequential> {
        let mut seq = seq().add_fn(|xs| xs.to_dtype(F32)?.permute((0, 3, 1, 2)));

        let mut in_channels = config.in_channels;
        for (i, layer) in config.conv_layers.iter().enumerate() {
            seq = seq
                .add(conv2d(
                    in_channels,
                    layer.out_channels,
                    layer.kernel_size,
                    Self::stride(layer.stride),
                    vb.pp(format!("c{}", i + 1)),
                )?)
                .add_fn(|xs| xs.relu());
            in_channels = layer.out_channels;
        }

        let seq = seq
            // Global average pooling
            .add_fn(|xs| xs.mean((2, 3)))
            .add(linear(in_channels, config.out_dim as _, vb.pp("head"))?);

        Ok(seq)
    }
}

impl SubModel1 for Cnn {
    type Config = CnnConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, x: &Self::Input) -> candle_core::Result<Tensor> {
        self.seq.forward(&x.to_device(&self.device)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        ensure!(!config.conv_layers.is_empty(), "Cnn needs a convolution layer");
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, &config)?;

        Ok(Self { device, seq })
    }
}
