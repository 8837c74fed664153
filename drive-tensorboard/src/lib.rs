//! Recorder writing training metrics as TFRecord for tensorboard.
use drive_core::record::{Record, RecordValue, Recorder};
use log::{trace, warn};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
///
/// Each record is written at the step read from the scalar value of
/// `step_key`, such as `opt_steps` for the learner or `episode` for the
/// actor.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P, step_key: impl Into<String>) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: step_key.into(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] with checking unsupported record value.
    ///
    /// Unsupported values are reported with a warning instead of being skipped silently.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(
        logdir: P,
        step_key: impl Into<String>,
    ) -> Self {
        Self {
            ignore_unsupported_value: false,
            ..Self::new(logdir, step_key)
        }
    }

    pub fn step_key(&self) -> &str {
        &self.step_key
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] in the [Record].
    /// [RecordValue::DateTime] is discarded. A record without the step key is skipped.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Record without scalar {:?} is skipped", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k != self.step_key {
                match v {
                    RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                    RecordValue::DateTime(_) => {} // discard value
                    _ => {
                        if !self.ignore_unsupported_value {
                            warn!("Unsupported value: {:?}", (k, v));
                        } else {
                            trace!("Skipped value of {}", k);
                        }
                    }
                };
            }
        }
        self.writer.flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_write_scalars() {
        let dir = TempDir::new("tensorboard").unwrap();
        let mut recorder = TensorboardRecorder::new(dir.path(), "episode");
        assert_eq!(recorder.step_key(), "episode");

        let mut record = Record::from_scalar("episode", 1.0);
        record.insert("reward_avg", RecordValue::Scalar(-12.0));
        recorder.write(record);

        // Skipped, no step
        recorder.write(Record::from_scalar("reward_avg", 3.0));

        let n_files = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(n_files >= 1);
    }
}
