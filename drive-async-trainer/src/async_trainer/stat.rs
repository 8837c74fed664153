use std::time::Duration;

/// Stats of the learner thread of [`AsyncTrainer`](crate::AsyncTrainer).
#[derive(Clone, Debug)]
pub struct AsyncTrainStat {
    /// The number of optimization steps.
    pub opt_steps: usize,

    /// The number of optimization steps per second.
    pub opt_per_sec: f32,

    /// Duration of training.
    pub duration: Duration,
}

impl AsyncTrainStat {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "opt_steps, opt_steps/sec, duration\n".to_string();
        s += format!(
            "{}, {}, {}\n",
            self.opt_steps,
            self.opt_per_sec,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}
