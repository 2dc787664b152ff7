use std::time::Duration;

pub use taskdesk_core::config::*;

use crate::cli::Cli;

pub fn overrides(cli: &Cli) -> ConfigOverrides {
    ConfigOverrides {
        data_dir: cli.data_dir.clone(),
        api_url: cli.api_url.clone(),
        directory_url: cli.directory_url.clone(),
        request_timeout: cli.timeout_secs.map(Duration::from_secs),
    }
}

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    AppConfig::discover(overrides(cli))
}
