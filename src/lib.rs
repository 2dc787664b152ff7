pub use taskdesk_tui::cli;
pub use taskdesk_tui::commands;
pub use taskdesk_tui::config;
pub use taskdesk_tui::logging;
pub use taskdesk_tui::tui;
pub use taskdesk_tui::AppConfig;

pub use taskdesk_core as core;
pub use taskdesk_core::model;
pub use taskdesk_core::services;
