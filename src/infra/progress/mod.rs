pub mod controller;
pub mod runner;

pub use controller::{LoadState, ProgressController};
pub use runner::{spawn_task, StepSink, TaskEvent, TaskHandle, TaskId, TaskIdAllocator, Work};
