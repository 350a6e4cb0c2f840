pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "journalctl")]
#[command(about = "Journal API administration - tokens and database migrations")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a bearer token for the configured JWT secret")]
    Token(commands::token::TokenArgs),

    #[command(about = "Apply database migrations to DATABASE_URL")]
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_roles_in_order() {
        let cli = Cli::try_parse_from([
            "journalctl", "--json", "token", "alice", "--role", "user", "--role", "admin",
        ])
        .unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        match cli.command {
            Commands::Token(args) => {
                assert_eq!(args.user, "alice");
                assert_eq!(args.roles, vec!["user", "admin"]);
                assert_eq!(args.expiry_hours, None);
            }
            Commands::Migrate => panic!("expected token command"),
        }
    }

    #[test]
    fn parses_migrate() {
        let cli = Cli::try_parse_from(["journalctl", "migrate"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate));
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Text);
    }
}
