//! `rangedl config`: show the effective configuration.

use anyhow::Result;
use rangedl_core::{config, logging};

pub async fn run_config() -> Result<()> {
    let cfg = config::load_or_init()?;
    println!("# config: {}", config::config_path()?.display());
    if let Ok(path) = logging::log_path() {
        println!("# log:    {}", path.display());
    }
    print!("{}", cfg.to_toml()?);
    Ok(())
}
