use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsyncTrainerError {
    #[error("Learner thread panicked: {0}")]
    LearnerPanicked(String),

    #[error("Learner finished before publishing its model")]
    ModelInfoDisconnected,

    #[error("Lock of the replay memory is poisoned")]
    PoisonedReplayMemory,
}
