//! DQN agent implemented with candle.
use super::{config::DqnConfig, explorer::EpsilonGreedy, model::DqnModel};
use crate::{
    model::SubModel1,
    tensor_batch::stack_obs,
    util::{smooth_l1_loss, CriticLoss, OutDim},
    TensorObs,
};
use anyhow::{anyhow, ensure, Result};
use candle_core::{shape::D, Device, Tensor};
use candle_nn::loss::mse;
use drive_core::{
    record::{Record, RecordValue},
    replay_buffer::TransitionBatch,
    Agent, Configurable, DiscreteAct, Env, Policy, ReplayBufferBase,
};
use log::debug;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::{convert::TryFrom, fs, marker::PhantomData, path::Path};

/// Bootstrapped targets `r + gamma * max_a' Q_tgt(s', a')`, with the
/// bootstrap term dropped for terminal transitions.
fn td_target(reward: &Tensor, is_not_done: &Tensor, q_next: &Tensor, gamma: f64) -> Result<Tensor> {
    let bootstrap = (is_not_done * q_next)?.affine(gamma, 0.0)?;
    Ok((reward + bootstrap)?.detach())
}

#[allow(clippy::upper_case_acronyms)]
/// DQN agent with a live and a target action-value network.
///
/// The target network is overwritten with the live parameters every
/// `target_update_interval` optimization steps and is otherwise frozen.
pub struct Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    pub(in crate::dqn) target_update_interval: usize,
    pub(in crate::dqn) target_update_counter: usize,
    pub(in crate::dqn) min_transitions_warmup: usize,
    pub(in crate::dqn) batch_size: usize,
    pub(in crate::dqn) qnet: DqnModel<Q>,
    pub(in crate::dqn) qnet_tgt: DqnModel<Q>,
    pub(in crate::dqn) train: bool,
    pub(in crate::dqn) phantom: PhantomData<(E, R)>,
    pub(in crate::dqn) discount_factor: f64,
    pub(in crate::dqn) explorer: EpsilonGreedy,
    pub(in crate::dqn) device: Device,
    pub(in crate::dqn) n_opts: usize,
    pub(in crate::dqn) critic_loss: CriticLoss,
    last_random: bool,
    rng: SmallRng,
}

impl<E, Q, R> Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    fn update_critic(&mut self, buffer: &mut R) -> Result<(f32, usize)> {
        let batch = buffer.batch(self.batch_size)?;
        let n = batch.len();
        let (obs, act, next_obs, reward, is_done) = batch.unpack();
        let obs = stack_obs(&obs, &self.device)?;
        let next_obs = stack_obs(&next_obs, &self.device)?;
        let act = {
            let act = act.iter().map(|a| a.index() as i64).collect::<Vec<_>>();
            Tensor::from_vec(act, (n, 1), &self.device)?
        };
        let reward = Tensor::from_vec(reward, (n,), &self.device)?;
        let is_not_done = {
            let is_not_done = is_done
                .into_iter()
                .map(|v| if v { 0f32 } else { 1f32 })
                .collect::<Vec<_>>();
            Tensor::from_vec(is_not_done, (n,), &self.device)?
        };

        // Only the component of the taken action is trained.
        let pred = self
            .qnet
            .forward(&obs)?
            .gather(&act, D::Minus1)?
            .squeeze(D::Minus1)?;

        let tgt = {
            let q_next = self.qnet_tgt.forward(&next_obs)?.max(D::Minus1)?;
            td_target(&reward, &is_not_done, &q_next, self.discount_factor)?
        };

        let loss = match self.critic_loss {
            CriticLoss::Mse => mse(&pred, &tgt)?,
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt)?,
        };

        // Backprop
        self.qnet.backward_step(&loss)?;

        Ok((loss.to_scalar::<f32>()?, n))
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Record> {
        let (loss, batch_size) = self.update_critic(buffer)?;
        self.n_opts += 1;

        self.target_update_counter += 1;
        if self.target_update_counter >= self.target_update_interval {
            self.target_update_counter = 0;
            self.qnet_tgt.copy_from(&self.qnet)?;
            debug!("Updated target network at opt step {}", self.n_opts);
        }

        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("batch_size", RecordValue::Scalar(batch_size as f32)),
        ]))
    }

    fn greedy(&self, obs: &E::Obs) -> Result<usize> {
        let x = obs.to_tensor(&self.device)?.unsqueeze(0)?;
        let q = self.qnet.forward(&x)?;
        Ok(q.argmax(D::Minus1)?.squeeze(0)?.to_scalar::<u32>()? as usize)
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon()
    }

    /// Number of optimization steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Live action-value network.
    pub fn qnet(&self) -> &DqnModel<Q> {
        &self.qnet
    }

    /// Target action-value network.
    pub fn qnet_tgt(&self) -> &DqnModel<Q> {
        &self.qnet_tgt
    }
}

impl<E, Q, R> Configurable for Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    type Config = DqnConfig<Q::Config>;

    /// Constructs DQN agent.
    ///
    /// The target network starts as a copy of the live network.
    fn build(config: Self::Config) -> Result<Self> {
        let device = Device::try_from(config.device.unwrap_or(crate::Device::Cpu))?;
        let qnet = DqnModel::build(config.model_config.clone(), device.clone())?;
        let qnet_tgt = DqnModel::build(config.model_config, device.clone())?;
        qnet_tgt.copy_from(&qnet)?;
        ensure!(
            qnet.out_dim as usize == E::Act::n_actions(),
            "Output dimension {} does not match the number of actions {}",
            qnet.out_dim,
            E::Act::n_actions()
        );
        ensure!(
            config.target_update_interval > 0,
            "target_update_interval must be positive"
        );

        Ok(Dqn {
            qnet,
            qnet_tgt,
            target_update_interval: config.target_update_interval,
            target_update_counter: 0,
            min_transitions_warmup: config.min_transitions_warmup,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            train: config.train,
            explorer: config.explorer,
            device,
            n_opts: 0,
            critic_loss: config.critic_loss,
            phantom: PhantomData,
            last_random: false,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }
}

impl<E, Q, R> Policy<E> for Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    /// Epsilon-greedy in training mode, greedy in evaluation mode.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        self.last_random = self.train && self.explorer.explore(&mut self.rng);
        let ix = match self.last_random {
            true => self.rng.gen_range(0..E::Act::n_actions()),
            false => self.greedy(obs)?,
        };
        E::Act::from_index(ix).ok_or_else(|| anyhow!("Action index {} out of range", ix))
    }

    fn last_sample_was_random(&self) -> bool {
        self.last_random
    }
}

impl<E, Q, R> Agent<E, R> for Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, buffer: &mut R) -> Result<Option<Record>> {
        if buffer.len() >= self.min_transitions_warmup {
            Ok(Some(self.opt_(buffer)?))
        } else {
            Ok(None)
        }
    }

    fn on_episode_end(&mut self) -> Record {
        self.explorer.on_episode_end();
        Record::from_scalar("epsilon", self.explorer.epsilon() as f32)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.safetensors"))?;
        self.qnet_tgt.save(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.safetensors"))?;
        self.qnet_tgt.load(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }
}

#[cfg(feature = "drive-async-trainer")]
use {crate::util::NamedTensors, drive_async_trainer::SyncModel};

#[cfg(feature = "drive-async-trainer")]
impl<E, Q, R> SyncModel for Dqn<E, Q, R>
where
    E: Env,
    E::Obs: TensorObs,
    E::Act: DiscreteAct,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R: ReplayBufferBase<Batch = TransitionBatch<E::Obs, E::Act>>,
{
    type ModelInfo = NamedTensors;

    fn model_info(&self) -> Result<(usize, Self::ModelInfo)> {
        Ok((self.n_opts, self.qnet.params()?))
    }

    fn sync_model(&mut self, model_info: &Self::ModelInfo) -> Result<()> {
        model_info.copy_to(self.qnet.varmap())
    }
}
