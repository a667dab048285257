use clap::Subcommand;

use crate::auth::Capability;
use crate::cli::config::{AdminArgs, CliContext};
use crate::cli::utils::{output_data, output_success, read_text_input};
use crate::cli::OutputFormat;
use crate::content::{render_lines, CommitOutcome, SectionBinding, TextBinding};
use crate::models::SectionCopy;
use crate::views::home::{section_default, text_default};

#[derive(Subcommand)]
pub enum ContentCommands {
    #[command(about = "Show the displayed text for a key")]
    Get {
        #[arg(help = "Content key, e.g. hero-title, about-me")]
        key: String,
        #[arg(long, help = "Fallback shown when nothing is stored")]
        default: Option<String>,
    },

    #[command(about = "Save text for a key (reads stdin when TEXT is omitted)")]
    Set {
        #[arg(help = "Content key")]
        key: String,
        #[arg(help = "New text")]
        text: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(Subcommand)]
pub enum SectionCommands {
    #[command(about = "Show a section header")]
    Get {
        #[arg(help = "Section key: tryhackme, hackthebox or ctf")]
        key: String,
    },

    #[command(about = "Save a section header")]
    Set {
        #[arg(help = "Section key")]
        key: String,
        #[arg(long, help = "Section title")]
        title: String,
        #[arg(long, help = "Section description")]
        description: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

fn describe(outcome: CommitOutcome) -> &'static str {
    match outcome {
        CommitOutcome::Saved => "saved",
        CommitOutcome::Unchanged => "unchanged",
    }
}

pub async fn handle_content(cmd: ContentCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::from_env()?;

    match cmd {
        ContentCommands::Get { key, default } => {
            let default = default
                .or_else(|| text_default(&key).map(str::to_string))
                .unwrap_or_default();
            let text = TextBinding::new(ctx.gateway.clone(), key.as_str(), default).load().await;

            output_data(
                &output_format,
                serde_json::json!({ "key": key, "content": text }),
                || render_lines(&text).join("\n"),
            )
        }
        ContentCommands::Set { key, text, admin } => {
            let text = read_text_input(text)?;
            let default = text_default(&key).unwrap_or_default().to_string();
            let binding = TextBinding::new(ctx.gateway.clone(), key.as_str(), default);

            let session = ctx.admin(&admin).await?;
            binding.load().await;
            binding.begin_edit(session.capability()).await;
            let result = match binding.set_buffer(text).await {
                Ok(()) => binding.commit(session.capability()).await,
                Err(e) => Err(e),
            };
            ctx.release(&session).await;

            let outcome = result?;
            output_success(&output_format, &format!("Content '{}' {}", key, describe(outcome)), None)
        }
    }
}

pub async fn handle_section(cmd: SectionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::from_env()?;

    match cmd {
        SectionCommands::Get { key } => {
            let default = section_default(&key).ok_or_else(|| anyhow::anyhow!("Unknown section '{}'", key))?;
            let copy = SectionBinding::new(ctx.gateway.clone(), key.as_str(), default).load().await;

            output_data(&output_format, serde_json::to_value(&copy)?, || {
                format!("{}\n{}", copy.title, copy.description)
            })
        }
        SectionCommands::Set {
            key,
            title,
            description,
            admin,
        } => {
            let default = section_default(&key).ok_or_else(|| anyhow::anyhow!("Unknown section '{}'", key))?;
            let binding = SectionBinding::new(ctx.gateway.clone(), key.as_str(), default);

            let session = ctx.admin(&admin).await?;
            binding.load().await;
            let capability: Capability = session.capability();
            binding.begin_edit(capability).await;
            let result = match binding.set_buffer(SectionCopy::new(title, description)).await {
                Ok(()) => binding.commit(capability).await,
                Err(e) => Err(e),
            };
            ctx.release(&session).await;

            let outcome = result?;
            output_success(&output_format, &format!("Section '{}' {}", key, describe(outcome)), None)
        }
    }
}
