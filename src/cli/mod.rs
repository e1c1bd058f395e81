//! CLI command handling

pub mod agents;
pub mod config;
pub mod launcher;
pub mod output;
pub mod start;

pub use agents::*;
pub use config::{handle_config, load_config, ConfigArgs};
pub use launcher::*;
pub use output::*;
pub use start::*;
