//! Cooperative task scheduler driven by the timer tick

pub mod scheduler;
pub mod task;

pub use scheduler::{DispatchReport, Scheduler, SchedulerError};
pub use task::{Priority, TaskAction, TaskControlBlock, TaskHandler, TaskReport, TaskStatus};
