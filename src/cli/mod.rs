pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "cyberfolio")]
#[command(about = "Cyberfolio CLI - manage portfolio content and achievements")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Test the connection to the content service")]
    Ping,

    #[command(about = "Free-text content blocks (hero, about)")]
    Content {
        #[command(subcommand)]
        cmd: commands::content::ContentCommands,
    },

    #[command(about = "Section header title and description")]
    Section {
        #[command(subcommand)]
        cmd: commands::content::SectionCommands,
    },

    #[command(about = "Rooms, machines and CTF challenges")]
    Records {
        #[command(subcommand)]
        cmd: commands::records::RecordCommands,
    },

    #[command(about = "Dashboard counts per category")]
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Ping => commands::ping::handle(output_format).await,
        Commands::Content { cmd } => commands::content::handle_content(cmd, output_format).await,
        Commands::Section { cmd } => commands::content::handle_section(cmd, output_format).await,
        Commands::Records { cmd } => commands::records::handle(cmd, output_format).await,
        Commands::Stats => commands::ping::stats(output_format).await,
    }
}
