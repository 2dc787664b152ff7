pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
#[cfg(test)]
mod testing;
pub mod tui;

pub use taskdesk_core as core;
pub use taskdesk_core::model;

pub use taskdesk_core::AppConfig;
