//! Optimizers.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of the optimizer of the Q-network.
///
/// In YAML, `Adam: { lr: 0.001 }` or `AdamW: { lr: 0.0003, weight_decay: 0.01 }`.
/// Omitted AdamW hyperparameters take the defaults of [`ParamsAdamW`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam without weight decay.
    Adam { lr: f64 },

    AdamW {
        lr: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        beta1: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        beta2: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eps: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight_decay: Option<f64>,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 0.001 }
    }
}

impl OptimizerConfig {
    /// Learning rate of the optimizer.
    pub fn lr(&self) -> f64 {
        match self {
            Self::Adam { lr } | Self::AdamW { lr, .. } => *lr,
        }
    }

    /// Constructs the optimizer updating `vars`.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        let opt = match self {
            Self::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                Optimizer::Adam(Adam::new(vars, params)?)
            }
            Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let d = ParamsAdamW::default();
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: beta1.unwrap_or(d.beta1),
                    beta2: beta2.unwrap_or(d.beta2),
                    eps: eps.unwrap_or(d.eps),
                    weight_decay: weight_decay.unwrap_or(d.weight_decay),
                };
                Optimizer::AdamW(AdamW::new(vars, params)?)
            }
        };
        Ok(opt)
    }
}

/// Optimizer built from [`OptimizerConfig`].
pub enum Optimizer {
    Adam(Adam),
    AdamW(AdamW),
}

impl Optimizer {
    /// Computes gradients of `loss` and updates the variables.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::Adam(opt) => opt.backward_step(loss)?,
            Self::AdamW(opt) => opt.backward_step(loss)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_adamw_defaults_from_yaml() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.0003\n")?;
        assert_eq!(config.lr(), 0.0003);
        assert_eq!(
            config,
            OptimizerConfig::AdamW {
                lr: 0.0003,
                beta1: None,
                beta2: None,
                eps: None,
                weight_decay: None,
            }
        );
        assert_eq!(OptimizerConfig::default().lr(), 0.001);
        Ok(())
    }
}
