//! CLI command handlers, one file per command.

mod config;
mod fetch;

pub use config::run_config;
pub use fetch::{run_fetch, FetchArgs};
