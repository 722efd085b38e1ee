pub mod debug;
pub mod jobs;
