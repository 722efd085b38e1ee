//! `qgjob` command-line client for the test-job server.

pub mod args;
pub mod client;
