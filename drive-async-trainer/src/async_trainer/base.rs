use crate::{
    util::lock_memory, AsyncTrainStat, AsyncTrainerConfig, AsyncTrainerError, StopSignal, SyncModel,
};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use drive_core::{
    record::{Record, RecordValue::Scalar, Recorder},
    Agent, Env, ExperienceBufferBase, ReplayBufferBase,
};
use log::{debug, info, warn};
use std::{
    any::Any,
    marker::PhantomData,
    path::Path,
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, SystemTime},
};

/// Runs the optimization loop of an agent on a background thread.
///
/// The learner owns the agent being trained. Transitions sent by the
/// [`Actor`](crate::Actor) are pushed into the replay memory right before
/// each optimization step, while the lock for that step is held; the actor
/// itself never locks the memory. Snapshots of the model are published over
/// another channel. The loop runs until the
/// [`StopSignal`] is raised, an optimization step fails, or `max_opts`
/// steps have been taken.
pub struct AsyncTrainer<A, E, R>
where
    A: Agent<E, R> + SyncModel,
    E: Env,
    R: ExperienceBufferBase + ReplayBufferBase,
{
    agent: A,

    buffer: Arc<Mutex<R>>,

    transition_receiver: Receiver<<R as ExperienceBufferBase>::Item>,

    config: AsyncTrainerConfig,

    /// Sender of model snapshots, tagged with the number of optimization steps.
    model_info_sender: Sender<(usize, A::ModelInfo)>,

    stop: StopSignal,

    recorder: Box<dyn Recorder + Send>,

    phantom: PhantomData<fn() -> E>,
}

impl<A, E, R> AsyncTrainer<A, E, R>
where
    A: Agent<E, R> + SyncModel + Send + 'static,
    A::ModelInfo: Send + 'static,
    E: Env + 'static,
    R: ExperienceBufferBase + ReplayBufferBase + Send + 'static,
    <R as ExperienceBufferBase>::Item: Send + 'static,
{
    /// Creates [`AsyncTrainer`].
    pub fn new(
        agent: A,
        buffer: Arc<Mutex<R>>,
        transition_receiver: Receiver<<R as ExperienceBufferBase>::Item>,
        config: AsyncTrainerConfig,
        model_info_sender: Sender<(usize, A::ModelInfo)>,
        stop: StopSignal,
        recorder: Box<dyn Recorder + Send>,
    ) -> Self {
        Self {
            agent,
            buffer,
            transition_receiver,
            config,
            model_info_sender,
            stop,
            recorder,
            phantom: PhantomData,
        }
    }

    /// Starts the learner thread.
    ///
    /// The first message sent by the thread is the initial model, which
    /// serves as the readiness signal for the actor.
    pub fn spawn(self) -> Result<LearnerHandle<A>> {
        let stop = self.stop.clone();
        let handle = std::thread::Builder::new()
            .name("learner".to_string())
            .spawn(move || self.run())?;
        info!("Started learner thread");

        Ok(LearnerHandle { handle, stop })
    }

    fn save_model(agent: &A, model_dir: &Path) {
        match agent.save_params(model_dir) {
            Ok(()) => info!("Saved the model in {:?}", model_dir),
            Err(e) => warn!("Failed to save model in {:?}: {}", model_dir, e),
        }
    }

    /// Sends the current model to the actor.
    fn sync(&mut self) -> Result<()> {
        let msg = self.agent.model_info()?;
        if self.model_info_sender.send(msg).is_err() {
            debug!("Receiver of model info was dropped");
        }
        Ok(())
    }

    /// Record.
    fn record(&mut self, record: &mut Record, opt_steps_: &mut usize, time: &mut SystemTime) {
        let duration = time.elapsed().unwrap_or_default().as_secs_f32();
        let ops = (*opt_steps_ as f32) / duration.max(f32::EPSILON);
        record.insert("opt_per_sec", Scalar(ops));

        // Reset counter
        *opt_steps_ = 0;
        *time = SystemTime::now();
    }

    /// Save model.
    fn save(&mut self, opt_steps: usize) {
        if let Some(model_dir) = &self.config.model_dir {
            let model_dir = Path::new(model_dir).join(opt_steps.to_string());
            Self::save_model(&self.agent, &model_dir);
        }
    }

    fn run(mut self) -> Result<(A, AsyncTrainStat)> {
        self.sync()?;

        let idle = Duration::from_millis(self.config.idle_ms);
        let time_total = SystemTime::now();
        let mut time = SystemTime::now();
        let mut opt_steps = 0;
        let mut opt_steps_ = 0;

        while !self.stop.is_stopped() {
            let record = {
                let mut buffer = lock_memory(&self.buffer)?;
                for tr in self.transition_receiver.try_iter() {
                    buffer.push(tr)?;
                }
                self.agent.opt(&mut buffer)
            };

            let mut record = match record {
                Ok(Some(record)) => record,
                Ok(None) => {
                    std::thread::sleep(idle);
                    continue;
                }
                Err(e) => {
                    warn!("Optimization step {} failed: {}", opt_steps + 1, e);
                    return Err(e);
                }
            };

            opt_steps += 1;
            opt_steps_ += 1;
            debug!("Optimization step {}", opt_steps);

            let do_record = is_due(self.config.record_interval, opt_steps);
            let do_save = is_due(self.config.save_interval, opt_steps);
            let do_sync = is_due(self.config.sync_interval, opt_steps);

            if do_record {
                self.record(&mut record, &mut opt_steps_, &mut time);
                record.insert("opt_steps", Scalar(opt_steps as _));
                self.recorder.write(record);
            }
            if do_save {
                self.save(opt_steps);
            }
            if do_sync {
                self.sync()?;
            }
            if self.config.max_opts == Some(opt_steps) {
                info!("Reached the maximum number of optimization steps");
                break;
            }
        }

        let duration = time_total.elapsed().unwrap_or_default();
        let stat = AsyncTrainStat {
            opt_steps,
            opt_per_sec: opt_steps as f32 / duration.as_secs_f32().max(f32::EPSILON),
            duration,
        };
        info!("Stopped learner thread after {} optimization steps", opt_steps);

        Ok((self.agent, stat))
    }
}

/// Handle of the learner thread spawned by [`AsyncTrainer::spawn`].
pub struct LearnerHandle<A> {
    handle: JoinHandle<Result<(A, AsyncTrainStat)>>,
    stop: StopSignal,
}

impl<A> LearnerHandle<A> {
    /// Returns `true` if the learner thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raises the stop signal and waits for the learner thread.
    ///
    /// Returns the trained agent, or the error that ended the loop. A panic
    /// of the thread is returned as [`AsyncTrainerError::LearnerPanicked`].
    pub fn stop_and_join(self) -> Result<(A, AsyncTrainStat)> {
        self.stop.stop();
        match self.handle.join() {
            Ok(result) => result,
            Err(e) => Err(AsyncTrainerError::LearnerPanicked(panic_message(e)).into()),
        }
    }
}

/// Zero disables an interval.
fn is_due(interval: usize, step: usize) -> bool {
    interval > 0 && step % interval == 0
}

fn panic_message(e: Box<dyn Any + Send>) -> String {
    if let Some(s) = e.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown cause".to_string()
    }
}
