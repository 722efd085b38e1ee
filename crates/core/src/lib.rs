//! Domain logic for the grouped test-job server.
//!
//! Holds the job model, the in-memory [`store::JobStore`] registry and the
//! [`runner::TestRunner`] seam used to drive external test processes. Nothing
//! in this crate knows about HTTP.

pub mod error;
pub mod job;
pub mod runner;
pub mod status;
pub mod store;
pub mod types;
