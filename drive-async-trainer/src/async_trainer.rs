mod base;
mod config;
mod stat;
pub use base::{AsyncTrainer, LearnerHandle};
pub use config::AsyncTrainerConfig;
pub use stat::AsyncTrainStat;
