mod dashboard;
mod export;
mod source;
mod watch;

use clap::{Parser, Subcommand};
use firewatch_telemetry::TargetZone;
use log::error;
use source::{Source, SourceArgs, SourceError};
use thiserror::Error;

/// Tool to monitor fire sensor readings held in a realtime database.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// UTC offset readings are shown, filtered and exported in
    #[arg(long, default_value = "+00:00", allow_hyphen_values = true, global = true)]
    timezone: TargetZone,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live view of today's readings
    Dashboard(dashboard::Cli),

    /// Log each poll of the database
    Watch(watch::Cli),

    /// Write the readings of a single day to a CSV file
    Export(export::Cli),
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

trait Runner {
    async fn run(&self, source: Source, zone: TargetZone) -> Result<(), Error>;
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The dashboard owns the terminal, log output would corrupt it
    let logging = !matches!(cli.command, Command::Dashboard(_));
    if logging {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let result = match cli.source.build() {
        Ok(source) => match cli.command {
            Command::Dashboard(cmd) => cmd.run(source, cli.timezone).await,
            Command::Watch(cmd) => cmd.run(source, cli.timezone).await,
            Command::Export(cmd) => cmd.run(source, cli.timezone).await,
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        if logging {
            error!("{e}");
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "firewatch-dashboard",
            "--file",
            "readings.json",
            "watch",
            "--timezone",
            "+01:00",
            "--count",
            "1",
        ])
        .unwrap();

        assert_eq!(cli.timezone, "+01:00".parse::<TargetZone>().unwrap());
        assert!(matches!(cli.command, Command::Watch(_)));
        assert!(matches!(cli.source.build(), Ok(Source::File(_))));
    }

    #[test]
    fn global_options_before_subcommand() {
        let cli = Cli::try_parse_from([
            "firewatch-dashboard",
            "--timezone",
            "-05:00",
            "export",
            "--file",
            "readings.json",
            "--date",
            "2024-03-07",
        ])
        .unwrap();

        assert_eq!(cli.timezone, "-05:00".parse::<TargetZone>().unwrap());
        assert!(matches!(cli.command, Command::Export(_)));
    }
}
