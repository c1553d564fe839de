//! CLI command implementations.

mod config;
mod doctor;
mod fetch;
mod run;

pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use run::run_pipeline;
