//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{render_notification, run_broadcast, stdout_sink, BroadcastPlan, OutputSink};
pub use initialization::{configure_logging, load_configuration};
