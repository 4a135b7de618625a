//! Subcommands of `fall-monitor`: replay, config validation, config info.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;
