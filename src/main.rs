use anyhow::Result;
use clap::Parser;

use taskdesk::cli::{Cli, CliCommand};
use taskdesk::logging::{init_tracing, LogTarget};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = taskdesk::config::from_cli(&cli)?;

    match cli.command.clone() {
        Some(CliCommand::Tui) | None => {
            // The terminal owns stdout and stderr while the UI is up.
            init_tracing(cli.log_filter.as_deref(), LogTarget::File(config.log_path()))?;
            taskdesk::tui::run(config)?;
        }
        Some(command) => {
            init_tracing(cli.log_filter.as_deref(), LogTarget::Stderr)?;
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            taskdesk::commands::execute(&config, command, &mut handle)?;
        }
    }

    Ok(())
}
