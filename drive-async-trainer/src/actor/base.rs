use crate::{ActorConfig, ActorStat, AsyncTrainerError, EpisodeWindow, SyncModel};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use drive_core::{
    record::{Record, RecordValue::Scalar, Recorder},
    replay_buffer::Transition,
    Agent, Env, ExperienceBufferBase, ReplayBufferBase,
};
use log::{debug, info, trace};
use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Directory name of a checkpoint, tagged with the reward stats of the window.
pub fn checkpoint_name(model_name: &str, max: f32, avg: f32, min: f32, unix_secs: u64) -> String {
    format!(
        "{}__{:_>7.2}max_{:_>7.2}avg_{:_>7.2}min__{}",
        model_name, max, avg, min, unix_secs
    )
}

/// Runs interaction between an [`Agent`] and an [`Env`], taking samples.
///
/// Transitions are sent to the learner, which pushes them into the replay
/// memory, so a step of the actor never waits for an optimization step.
/// Before each action, the newest model published by the learner is applied
/// to the agent of the actor.
pub struct Actor<A, E, R>
where
    A: Agent<E, R> + SyncModel,
    E: Env,
    R: ExperienceBufferBase<Item = Transition<E::Obs, E::Act>> + ReplayBufferBase,
{
    agent: A,
    env: E,
    transition_sender: Sender<Transition<E::Obs, E::Act>>,
    model_info_receiver: Receiver<(usize, A::ModelInfo)>,
    config: ActorConfig,
    window: EpisodeWindow,
    n_episodes: usize,
    env_steps: usize,

    /// Optimization steps of the model the agent currently acts with.
    model_opt_steps: usize,
    phantom: PhantomData<R>,
}

impl<A, E, R> Actor<A, E, R>
where
    A: Agent<E, R> + SyncModel,
    E: Env,
    R: ExperienceBufferBase<Item = Transition<E::Obs, E::Act>> + ReplayBufferBase,
{
    pub fn new(
        agent: A,
        env: E,
        transition_sender: Sender<Transition<E::Obs, E::Act>>,
        model_info_receiver: Receiver<(usize, A::ModelInfo)>,
        config: ActorConfig,
    ) -> Self {
        let window = EpisodeWindow::new(config.aggregate_stats_every);
        Self {
            agent,
            env,
            transition_sender,
            model_info_receiver,
            config,
            window,
            n_episodes: 0,
            env_steps: 0,
            model_opt_steps: 0,
            phantom: PhantomData,
        }
    }

    /// Blocks until the learner publishes its first model, then applies it.
    pub fn wait_for_model(&mut self) -> Result<()> {
        let (opt_steps, model_info) = self
            .model_info_receiver
            .recv()
            .map_err(|_| AsyncTrainerError::ModelInfoDisconnected)?;
        self.agent.sync_model(&model_info)?;
        self.model_opt_steps = opt_steps;
        info!("Received the initial model");
        Ok(())
    }

    /// Applies the newest published model, if any arrived since the last call.
    fn sync_latest(&mut self) -> Result<()> {
        if let Some((opt_steps, model_info)) = self.model_info_receiver.try_iter().last() {
            self.agent.sync_model(&model_info)?;
            self.model_opt_steps = opt_steps;
            trace!("Synchronized model at opt step {}", opt_steps);
        }
        Ok(())
    }

    /// Runs a single episode and returns its total reward.
    pub fn run_episode(&mut self) -> Result<f32> {
        let mut obs = self.env.reset_with_retry(self.config.max_reset_attempts)?;
        let mut episode_reward = 0f32;
        let mut episode_steps = 0;

        loop {
            self.sync_latest()?;
            let act = self.agent.sample(&obs)?;
            if self.agent.last_sample_was_random() {
                if let Some(fps) = self.config.fps {
                    std::thread::sleep(Duration::from_secs_f32(1.0 / fps));
                }
            }

            let (step, _) = self.env.step(&act)?;
            let reward = step.reward;
            let is_done = step.is_done();
            let next_obs = step.obs;
            episode_reward += reward;
            episode_steps += 1;

            let tr = Transition::new(obs, act, reward, next_obs.clone(), is_done);
            if self.transition_sender.send(tr).is_err() {
                // The learner has exited; the episode still runs to its end.
                trace!("Receiver of transitions was dropped");
            }
            obs = next_obs;

            if is_done {
                break;
            }
        }

        self.env_steps += episode_steps;
        self.n_episodes += 1;
        debug!(
            "Episode {} finished in {} steps with reward {}",
            self.n_episodes, episode_steps, episode_reward
        );

        Ok(episode_reward)
    }

    fn checkpoint_dir(&self, model_dir: &Path, max: f32, avg: f32, min: f32) -> PathBuf {
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        model_dir.join(checkpoint_name(
            &self.config.model_name,
            max,
            avg,
            min,
            unix_secs,
        ))
    }

    /// Aggregates the reward window, records it and saves a checkpoint if
    /// the minimum reward reached the threshold.
    fn on_aggregate(&mut self, mut record: Record, recorder: &mut impl Recorder) -> Result<()> {
        let (avg, min, max) = match (self.window.avg(), self.window.min(), self.window.max()) {
            (Some(avg), Some(min), Some(max)) => (avg, min, max),
            _ => return Ok(()),
        };
        record.insert("episode", Scalar(self.n_episodes as f32));
        record.insert("reward_avg", Scalar(avg));
        record.insert("reward_min", Scalar(min));
        record.insert("reward_max", Scalar(max));
        record.insert("model_opt_steps", Scalar(self.model_opt_steps as f32));
        recorder.write(record);
        info!(
            "Episode {}: reward avg {:.2}, min {:.2}, max {:.2}",
            self.n_episodes, avg, min, max
        );

        if min >= self.config.min_reward {
            if let Some(model_dir) = &self.config.model_dir {
                let path = self.checkpoint_dir(Path::new(model_dir), max, avg, min);
                self.agent.save_params(&path)?;
                info!("Saved checkpoint in {:?}", path);
            }
        }
        Ok(())
    }

    /// Runs episodes until `n_episodes` have finished or `keep_going`
    /// returns `false`. `keep_going` is checked before every episode.
    pub fn run(
        &mut self,
        recorder: &mut impl Recorder,
        mut keep_going: impl FnMut() -> bool,
    ) -> Result<ActorStat> {
        let time = SystemTime::now();
        let aggregate_every = self.config.aggregate_stats_every.max(1);

        while self.n_episodes < self.config.n_episodes {
            if !keep_going() {
                info!("Actor stopped after {} episodes", self.n_episodes);
                break;
            }

            let episode_reward = self.run_episode()?;
            let record = self.agent.on_episode_end();
            self.window.push(episode_reward);

            if self.n_episodes == 1 || self.n_episodes % aggregate_every == 0 {
                self.on_aggregate(record, recorder)?;
            }
        }

        Ok(ActorStat {
            n_episodes: self.n_episodes,
            env_steps: self.env_steps,
            duration: time.elapsed().unwrap_or_default(),
        })
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Consumes the actor, returning its agent and environment.
    pub fn into_inner(self) -> (A, E) {
        (self.agent, self.env)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_checkpoint_name() {
        assert_eq!(
            checkpoint_name("cnn", 12.5, -3.25, -200.0, 1700000000),
            "cnn____12.50max___-3.25avg_-200.00min__1700000000"
        );
    }
}
