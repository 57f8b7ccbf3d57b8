//! Command-line interface for the AgenticPencil API server.

pub mod commands;

use clap::{Parser, Subcommand};

/// AgenticPencil API - metered SEO research endpoints
#[derive(Parser)]
#[command(name = "agenticpencil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (default)
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Issue an API key for an account, creating the account if needed
    CreateKey {
        /// Account email
        email: String,
        /// Key label
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete expired cache entries and old rate-limit windows
    Prune,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["agenticpencil"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["agenticpencil", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(8080) })));

        let cli =
            Cli::try_parse_from(["agenticpencil", "create-key", "ops@example.com", "--name", "ci"])
                .unwrap();
        match cli.command {
            Some(Commands::CreateKey { email, name }) => {
                assert_eq!(email, "ops@example.com");
                assert_eq!(name.as_deref(), Some("ci"));
            }
            _ => panic!("expected create-key"),
        }

        assert!(Cli::try_parse_from(["agenticpencil", "create-key"]).is_err());
    }
}
