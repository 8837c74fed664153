//! Utility function.
use crate::{
    Actor, ActorConfig, ActorStat, AsyncTrainStat, AsyncTrainer, AsyncTrainerConfig,
    AsyncTrainerError, StopSignal, SyncModel,
};
use anyhow::Result;
use crossbeam_channel::unbounded;
use drive_core::{
    record::Recorder, replay_buffer::Transition, Agent, Configurable, Env, ExperienceBufferBase,
    ReplayBufferBase,
};
use log::{info, warn};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

pub(crate) fn lock_memory<R>(buffer: &Mutex<R>) -> Result<MutexGuard<'_, R>, AsyncTrainerError> {
    buffer
        .lock()
        .map_err(|_| AsyncTrainerError::PoisonedReplayMemory)
}

/// Runs asynchronous training.
///
/// The learner runs on its own thread while the actor runs on the calling
/// thread. The actor sends transitions and the learner sends model
/// snapshots, both over [`crossbeam_channel`]s. Only the learner thread
/// locks the replay memory.
///
/// ```mermaid
/// graph LR
///     A[Actor]-->|Transition|C[Learner]
///     C-->|push|B[Replay memory]
///     B -->|TransitionBatch|C
///     C -->|ModelInfo|A
/// ```
///
/// When the actor finishes its episodes, the learner is stopped with the
/// [`StopSignal`] and joined. An error of the learner takes precedence over
/// an error of the actor. The final model of the learner is saved in
/// `{model_dir}/final` if `model_dir` of `async_trainer_config` is set.
///
/// * `agent_config` - Configuration of the agent, used both for learning and acting.
/// * `env_config` - Configuration of the environment with which transitions are sampled.
/// * `replay_buffer_config` - Configuration of the replay memory.
/// * `async_trainer_config` - Configuration of [`AsyncTrainer`].
/// * `actor_config` - Configuration of [`Actor`].
#[cfg_attr(doc, aquamarine::aquamarine)]
#[allow(clippy::too_many_arguments)]
pub fn train_async<A, E, R>(
    agent_config: &A::Config,
    env_config: &E::Config,
    replay_buffer_config: &R::Config,
    async_trainer_config: &AsyncTrainerConfig,
    actor_config: &ActorConfig,
    env_seed: i64,
    learner_recorder: Box<dyn Recorder + Send>,
    actor_recorder: &mut impl Recorder,
) -> Result<(AsyncTrainStat, ActorStat)>
where
    A: Agent<E, R> + Configurable + SyncModel + Send + 'static,
    A::ModelInfo: Send + 'static,
    E: Env + 'static,
    E::Obs: Send + 'static,
    E::Act: Send + 'static,
    R: ExperienceBufferBase<Item = Transition<E::Obs, E::Act>> + ReplayBufferBase + Send + 'static,
{
    let buffer = Arc::new(Mutex::new(R::build(replay_buffer_config)?));
    let stop = StopSignal::new();
    let (model_s, model_r) = unbounded();
    let (transition_s, transition_r) = unbounded();

    let env = E::build(env_config, env_seed)?;
    let mut actor = Actor::<A, E, R>::new(
        A::build(agent_config.clone())?,
        env,
        transition_s,
        model_r,
        actor_config.clone(),
    );
    let learner = AsyncTrainer::<A, E, R>::new(
        A::build(agent_config.clone())?,
        buffer,
        transition_r,
        async_trainer_config.clone(),
        model_s,
        stop,
        learner_recorder,
    )
    .spawn()?;

    let actor_result = actor.wait_for_model().and_then(|_| {
        actor.run(actor_recorder, || {
            let alive = !learner.is_finished();
            if !alive {
                warn!("Learner thread exited before the actor finished");
            }
            alive
        })
    });
    let learner_result = learner.stop_and_join();

    let (agent, trainer_stat) = learner_result?;
    let actor_stat = actor_result?;
    info!("Stats of async trainer");
    info!("{}", trainer_stat.fmt());
    info!("Stats of the actor");
    info!("{}", actor_stat.fmt());

    if let Some(model_dir) = &async_trainer_config.model_dir {
        let path = Path::new(model_dir).join("final");
        agent.save_params(&path)?;
        info!("Saved the final model in {:?}", path);
    }

    Ok((trainer_stat, actor_stat))
}
