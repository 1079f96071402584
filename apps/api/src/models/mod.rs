pub mod analysis;
pub mod application;
pub mod job;
