pub mod config;
pub mod error;
pub mod ideas;
pub mod meetings;
pub mod telemetry;
