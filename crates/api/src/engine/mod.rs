//! Job execution engine.
//!
//! Contains the background scheduler that polls the job store for the next
//! pending group, plus the agent that runs every job of that group against
//! the external test runner and records each outcome.

pub mod agent;
pub mod scheduler;

pub use agent::Agent;
pub use scheduler::{JobScheduler, SchedulerHandle};
