//! Asynchronous training with a learner thread and an acting loop.
//!
//! * The learner ([`AsyncTrainer`]) owns the agent being trained and runs
//!   optimization steps on a background thread, reading batches from the
//!   replay memory.
//! * The actor ([`Actor`]) runs episodes on the calling thread and sends
//!   transitions to the learner, which pushes them into the replay memory
//!   before each optimization step.
//!
//! # Messages
//! * From the actor to the learner
//!   - [`Transition`](drive_core::replay_buffer::Transition), one per
//!     environment step.
//! * From the learner to the actor
//!   - `(usize, SyncModel::ModelInfo)`, the number of optimization steps and a
//!     snapshot of the model. The first message is sent before the first
//!     optimization step and tells the actor the learner is ready.
//!
//! The learner is stopped through a [`StopSignal`] and always joined; see
//! [`LearnerHandle::stop_and_join`].
mod actor;
mod async_trainer;
mod error;
mod stop_signal;
mod sync_model;
mod util;
pub use actor::{checkpoint_name, Actor, ActorConfig, ActorStat, EpisodeWindow};
pub use async_trainer::{AsyncTrainStat, AsyncTrainer, AsyncTrainerConfig, LearnerHandle};
pub use error::AsyncTrainerError;
pub use stop_signal::StopSignal;
pub use sync_model::SyncModel;
pub use util::train_async;

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;
    use crossbeam_channel::unbounded;
    use drive_core::{
        dummy::{DummyAgent, DummyAgentConfig, DummyEnv, DummyEnvConfig, DummyReplayMemory},
        record::{BufferedRecorder, NullRecorder},
        replay_buffer::ReplayMemoryConfig,
        Configurable, Env, ReplayBufferBase,
    };
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };
    use test_log::test;

    impl SyncModel for DummyAgent {
        type ModelInfo = usize;

        fn model_info(&self) -> Result<(usize, Self::ModelInfo)> {
            Ok((self.n_opts(), self.n_opts()))
        }

        fn sync_model(&mut self, _model_info: &Self::ModelInfo) -> Result<()> {
            Ok(())
        }
    }

    fn agent_config(fail_at: Option<usize>) -> DummyAgentConfig {
        DummyAgentConfig {
            warmup: 3,
            batch_size: 4,
            fail_at,
        }
    }

    fn memory() -> Result<Arc<Mutex<DummyReplayMemory>>> {
        let config = ReplayMemoryConfig::default().capacity(100);
        Ok(Arc::new(Mutex::new(DummyReplayMemory::build(&config)?)))
    }

    #[test]
    fn test_learner_publishes_initial_model_and_stops() -> Result<()> {
        let (model_s, model_r) = unbounded();
        let (_transition_s, transition_r) = unbounded();
        let stop = StopSignal::new();
        let learner = AsyncTrainer::<DummyAgent, DummyEnv, DummyReplayMemory>::new(
            DummyAgent::build(agent_config(None))?,
            memory()?,
            transition_r,
            AsyncTrainerConfig::default(),
            model_s,
            stop.clone(),
            Box::new(NullRecorder {}),
        )
        .spawn()?;

        let (opt_steps, _) = model_r.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(opt_steps, 0);
        assert!(!learner.is_finished());

        // Below warm-up the learner idles until stopped.
        let (agent, stat) = learner.stop_and_join()?;
        assert!(stop.is_stopped());
        assert_eq!(stat.opt_steps, 0);
        assert_eq!(agent.n_opts(), 0);
        Ok(())
    }

    #[test]
    fn test_actor_sends_transitions() -> Result<()> {
        let (model_s, model_r) = unbounded();
        let (transition_s, transition_r) = unbounded();
        model_s.send((0, 0))?;

        let env = DummyEnv::build(&DummyEnvConfig { episode_len: 5 }, 0)?;
        let agent = DummyAgent::build(agent_config(None))?;
        let config = ActorConfig::default()
            .n_episodes(4)
            .aggregate_stats_every(2)
            .fps(None);
        let mut actor = Actor::new(agent, env, transition_s, model_r, config);
        let mut recorder = BufferedRecorder::new();

        actor.wait_for_model()?;
        let stat = actor.run(&mut recorder, || true)?;
        assert_eq!(stat.n_episodes, 4);
        assert_eq!(stat.env_steps, 20);
        let transitions = transition_r.try_iter().collect::<Vec<_>>();
        assert_eq!(transitions.len(), 20);
        assert_eq!(transitions.iter().filter(|tr| tr.is_done).count(), 4);
        assert_eq!(actor.agent().n_episodes(), 4);

        // Aggregated at episodes 1, 2 and 4.
        let episodes = recorder
            .iter()
            .map(|r| r.get_scalar("episode").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(episodes, vec![1.0, 2.0, 4.0]);
        let record = recorder.iter().last().unwrap();
        assert_eq!(record.get_scalar("reward_avg")?, 5.0);
        assert_eq!(record.get_scalar("n_episodes")?, 4.0);
        Ok(())
    }

    #[test]
    fn test_actor_stops_when_told() -> Result<()> {
        let (model_s, model_r) = unbounded();
        model_s.send((0, 0))?;
        let env = DummyEnv::build(&DummyEnvConfig { episode_len: 2 }, 0)?;
        let agent = DummyAgent::build(agent_config(None))?;
        let (transition_s, _transition_r) = unbounded();
        let mut actor = Actor::new(
            agent,
            env,
            transition_s,
            model_r,
            ActorConfig::default().fps(None),
        );

        actor.wait_for_model()?;
        let mut n = 0;
        let stat = actor.run(&mut NullRecorder {}, || {
            n += 1;
            n <= 3
        })?;
        assert_eq!(stat.n_episodes, 3);
        Ok(())
    }

    #[test]
    fn test_actor_fails_without_learner() -> Result<()> {
        let (model_s, model_r) = unbounded::<(usize, usize)>();
        drop(model_s);
        let env = DummyEnv::build(&DummyEnvConfig { episode_len: 2 }, 0)?;
        let agent = DummyAgent::build(agent_config(None))?;
        let (transition_s, _transition_r) = unbounded();
        let mut actor = Actor::new(agent, env, transition_s, model_r, ActorConfig::default());

        let err = actor.wait_for_model().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AsyncTrainerError>(),
            Some(AsyncTrainerError::ModelInfoDisconnected)
        ));
        Ok(())
    }
}
