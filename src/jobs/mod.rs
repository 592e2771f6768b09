pub mod runner;
pub mod scheduler;

pub use runner::RunSummary;
pub use scheduler::{JobConfig, JobError, JobResult, JobScheduler};
