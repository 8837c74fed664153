use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{copy_varmap, NamedTensors, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{debug, info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`DqnModel`].
///
/// `q_config` must be set before building the model; its output dimension
/// is the number of actions.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnModelConfig<Q>
where
    Q: OutDim,
{
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
}

impl<Q> Default for DqnModelConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<Q> DqnModelConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim,
{
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets the number of actions. Has no effect before `q_config`.
    pub fn out_dim(mut self, v: i64) -> Self {
        if let Some(q_config) = &mut self.q_config {
            q_config.set_out_dim(v);
        }
        self
    }

    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`DqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Q-network: a [`SubModel1`] with the [`VarMap`] holding its parameters
/// and the optimizer updating them.
///
/// Two models built from the same configuration have the same variable
/// names, so parameters can be copied between them with [`Self::copy_from`].
pub struct DqnModel<Q>
where
    Q: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim,
{
    varmap: VarMap,
    q: Q,
    opt: Optimizer,
    pub(super) out_dim: i64,
}

impl<Q> DqnModel<Q>
where
    Q: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    pub fn build(config: DqnModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = config.q_config.context("q_config of DqnModelConfig is not set")?;
        let out_dim = q_config.get_out_dim();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let q = Q::build(vb, q_config)?;
        let opt = config.opt_config.build(varmap.all_vars())?;
        debug!(
            "Built Q-network with {} variables, {} actions",
            varmap.all_vars().len(),
            out_dim
        );

        Ok(Self {
            varmap,
            q,
            opt,
            out_dim,
        })
    }

    /// Action values of a batch of observations, `[batch_size, out_dim]`.
    pub fn forward(&self, obs: &Q::Input) -> Result<Tensor> {
        Ok(self.q.forward(obs)?)
    }

    /// One gradient step on `loss`.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Overwrites every parameter with the value in `src`.
    pub fn copy_from(&self, src: &Self) -> Result<()> {
        copy_varmap(&self.varmap, &src.varmap)
    }

    /// Snapshot of the parameters, detached from this model.
    pub fn params(&self) -> Result<NamedTensors> {
        NamedTensors::copy_from(&self.varmap)
    }

    /// Writes the parameters in safetensors format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.varmap.save(path)?;
        info!("Saved Q-network in {:?}", path);
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.varmap.load(path)?;
        info!("Loaded Q-network from {:?}", path);
        Ok(())
    }
}
