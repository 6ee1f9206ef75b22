//! Widget configuration and the terminal host's commands.
//!
//! - [`config`]: CLI arguments, the YAML file and resolved configuration
//! - [`commands`]: slash command parsing

mod commands;
mod config;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    DEFAULT_ERROR_PREFIX, DEFAULT_LANG, TabConfig, WidgetArgs, WidgetConfig, WidgetFile,
    default_tabs,
};
