//! Types and traits for recording training metrics.
//!
//! A [`Record`] is a bag of named values produced by an environment step,
//! an optimization step or an episode summary. A [`Recorder`] writes
//! records to some destination.
//!
//! ```rust
//! use drive_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(3.0));
//! record.insert("reward_avg", RecordValue::Scalar(-12.5));
//! assert_eq!(record.get_scalar("reward_avg").unwrap(), -12.5);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
