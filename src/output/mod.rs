//! Output stage: line formats, channel sinks and the scheduler

pub mod format;
mod scheduler;
mod sink;

pub use format::MeshFormat;
pub use scheduler::{OutputScheduler, ThrottleConfig};
pub use sink::{BufferedSink, DEFAULT_BUFFER_BYTES};
