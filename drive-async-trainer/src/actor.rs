mod base;
mod config;
mod stat;
pub use base::{checkpoint_name, Actor};
pub use config::ActorConfig;
pub use stat::{ActorStat, EpisodeWindow};
