use clap::Subcommand;
use serde_json::{json, Value};

use crate::auth::Capability;
use crate::cli::config::{AdminArgs, CliContext};
use crate::cli::utils::{output_data, output_empty_collection, output_success, read_json_input};
use crate::cli::OutputFormat;
use crate::collections::{CollectionEditor, RemoveOutcome};
use crate::models::{Category, ChallengeRecord, CtfChallenge, HackTheBoxMachine, TryHackMeRoom};

#[derive(Subcommand)]
pub enum RecordCommands {
    #[command(about = "List records, newest first")]
    List {
        #[arg(help = "Category: rooms, machines or ctf")]
        category: Category,
    },

    #[command(about = "Create a record from JSON (--data or stdin)")]
    Create {
        #[arg(help = "Category: rooms, machines or ctf")]
        category: Category,
        #[arg(long, help = "Record fields as JSON")]
        data: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },

    #[command(about = "Update a record from JSON (--data or stdin)")]
    Update {
        #[arg(help = "Category: rooms, machines or ctf")]
        category: Category,
        #[arg(help = "Record ID")]
        id: String,
        #[arg(long, help = "Record fields as JSON")]
        data: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },

    #[command(about = "Delete a record")]
    Delete {
        #[arg(help = "Category: rooms, machines or ctf")]
        category: Category,
        #[arg(help = "Record ID")]
        id: String,
        #[arg(long, help = "Confirm the deletion")]
        yes: bool,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

/// One admin mutation against a category
enum Mutation {
    Create(Value),
    Update(String, Value),
    Delete(String, bool),
}

pub async fn handle(cmd: RecordCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::from_env()?;

    let (category, mutation, admin) = match cmd {
        RecordCommands::List { category } => {
            return match category {
                Category::Rooms => list::<TryHackMeRoom>(&ctx, &output_format).await,
                Category::Machines => list::<HackTheBoxMachine>(&ctx, &output_format).await,
                Category::Ctf => list::<CtfChallenge>(&ctx, &output_format).await,
            };
        }
        RecordCommands::Create { category, data, admin } => {
            (category, Mutation::Create(read_json_input(data)?), admin)
        }
        RecordCommands::Update {
            category,
            id,
            data,
            admin,
        } => (category, Mutation::Update(id, read_json_input(data)?), admin),
        RecordCommands::Delete {
            category,
            id,
            yes,
            admin,
        } => (category, Mutation::Delete(id, yes), admin),
    };

    if let Mutation::Delete(_, false) = mutation {
        anyhow::bail!("Refusing to delete without --yes");
    }

    let session = ctx.admin(&admin).await?;
    let capability = session.capability();
    let result = match category {
        Category::Rooms => mutate::<TryHackMeRoom>(&ctx, capability, mutation).await,
        Category::Machines => mutate::<HackTheBoxMachine>(&ctx, capability, mutation).await,
        Category::Ctf => mutate::<CtfChallenge>(&ctx, capability, mutation).await,
    };
    ctx.release(&session).await;

    let (message, data) = result?;
    output_success(&output_format, &message, data)
}

async fn list<R: ChallengeRecord>(ctx: &CliContext, output_format: &OutputFormat) -> anyhow::Result<()> {
    let editor = CollectionEditor::<R>::new(ctx.gateway.clone(), Capability::VISITOR);
    let items = editor.list().await?;
    if items.is_empty() {
        return output_empty_collection(output_format, R::TABLE, &format!("No {} records yet.", R::NOUN.to_lowercase()));
    }

    let cards = editor.cards().await;
    output_data(output_format, serde_json::to_value(&items)?, || {
        cards
            .iter()
            .map(|card| card.to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}

async fn mutate<R: ChallengeRecord>(
    ctx: &CliContext,
    capability: Capability,
    mutation: Mutation,
) -> anyhow::Result<(String, Option<Value>)> {
    let editor = CollectionEditor::<R>::new(ctx.gateway.clone(), capability);

    match mutation {
        Mutation::Create(raw) => {
            let fields: R::Fields = serde_json::from_value(raw)?;
            let created = editor.create(fields).await?;
            Ok((
                format!("{} added successfully ({})", R::NOUN, created.id()),
                Some(serde_json::to_value(&created)?),
            ))
        }
        Mutation::Update(id, raw) => {
            let fields: R::Fields = serde_json::from_value(raw)?;
            let updated = editor.update(&id, fields).await?;
            Ok((
                format!("{} updated successfully", R::NOUN),
                Some(serde_json::to_value(&updated)?),
            ))
        }
        Mutation::Delete(id, confirmed) => match editor.remove(&id, &confirmed).await? {
            RemoveOutcome::Removed => Ok((
                format!("{} deleted successfully", R::NOUN),
                Some(json!({ "id": id })),
            )),
            RemoveOutcome::Declined => Err(anyhow::anyhow!(
                "Refusing to delete {} without --yes",
                R::NOUN.to_lowercase()
            )),
        },
    }
}
