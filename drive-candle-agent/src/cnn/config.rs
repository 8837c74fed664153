use crate::util::OutDim;
use serde::{Deserialize, Serialize};

/// A convolution layer followed by ReLU.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ConvLayerConfig {
    pub out_channels: usize,
    pub kernel_size: usize,
    pub stride: usize,
}

impl ConvLayerConfig {
    pub fn new(out_channels: usize, kernel_size: usize, stride: usize) -> Self {
        Self {
            out_channels,
            kernel_size,
            stride,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Cnn`](super::Cnn).
pub struct CnnConfig {
    /// Number of channels of the input image.
    pub in_channels: usize,
    pub conv_layers: Vec<ConvLayerConfig>,
    pub out_dim: i64,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            conv_layers: vec![
                ConvLayerConfig::new(16, 5, 2),
                ConvLayerConfig::new(32, 3, 2),
                ConvLayerConfig::new(64, 3, 2),
            ],
            out_dim: 3,
        }
    }
}

impl CnnConfig {
    pub fn conv_layers(mut self, conv_layers: Vec<ConvLayerConfig>) -> Self {
        self.conv_layers = conv_layers;
        self
    }
}

impl OutDim for CnnConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: i64) {
        self.out_dim = v;
    }
}
