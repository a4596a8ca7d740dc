//! `albumdl config` – show where the config lives and what is in effect.

use albumdl_core::config::{self, AppConfig};
use anyhow::Result;

pub fn run_config(cfg: &AppConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", config::render(cfg)?);
    Ok(())
}
