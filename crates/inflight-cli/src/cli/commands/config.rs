//! `inflight config` – show config path and effective policy.

use anyhow::Result;
use inflight_core::config;

pub fn run_show_config() -> Result<()> {
    let path = config::config_path()?;
    let cfg = config::load_or_init()?;
    println!("# {}", path.display());
    print!("{}", config::to_toml(&cfg)?);
    let policy = cfg.retry_policy()?;
    match policy.attempt_timeout() {
        Some(t) => println!("# attempt timeout: {}ms", t.as_millis()),
        None => println!("# attempt timeout: none"),
    }
    Ok(())
}
