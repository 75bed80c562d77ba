use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "seefood-boot",
    version,
    about = "Brings the seefood backend up: waits for the database, runs setup, launches the API server"
)]
pub struct Cli {
    /// Config file path; otherwise searched in the standard locations
    #[arg(long, env = "SEEFOOD_CONFIG_PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Full sequence ending in exec of the server (the default)
    Run,
    /// Readiness probe and setup steps only; exit without launching
    Setup,
    /// Readiness probe only
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["seefood-boot", "setup"]);
        assert!(matches!(cli.command, Some(Command::Setup)));

        let cli = Cli::parse_from(["seefood-boot"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["seefood-boot", "--config", "/etc/seefood.yaml", "check"]);
        assert_eq!(cli.config.as_deref(), Some("/etc/seefood.yaml"));
        assert!(matches!(cli.command, Some(Command::Check)));
    }
}
