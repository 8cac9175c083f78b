//! CLI command handlers. Each command is in its own file.

mod completions;
mod config;
mod schedule;
mod simulate;

pub use completions::{run_completions, run_man};
pub use config::run_show_config;
pub use schedule::run_schedule;
pub use simulate::{run_simulate, SimulateArgs, Step};
