//! InkFusion CLI - notes with attachments from the terminal
//!
//! Every edit is saved in the background; one-shot commands wait for the
//! save before exiting.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::{run_add, NewNote};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::ClientContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, NoteChanges};
use crate::commands::list::run_list;
use crate::commands::session::run_session;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "inkfusion=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Add {
            title,
            description,
            tag,
            attach,
        }) => {
            let context = ClientContext::for_profile(profile)?;
            let note = NewNote {
                title,
                description,
                tag,
                attach,
            };
            run_add(&context, note).await?;
        }
        Some(Commands::List { limit, json }) => {
            let context = ClientContext::for_profile(profile)?;
            run_list(&context, limit, json).await?;
        }
        Some(Commands::Edit {
            id,
            title,
            description,
            tag,
            attach,
            paste,
            remove_saved,
        }) => {
            let context = ClientContext::for_profile(profile)?;
            let changes = NoteChanges {
                title,
                description,
                tag,
                attach,
                paste,
                remove_saved,
            };
            run_edit(&context, &id, changes).await?;
        }
        Some(Commands::Delete { id }) => {
            let context = ClientContext::for_profile(profile)?;
            run_delete(&context, &id).await?;
        }
        Some(Commands::Session) => {
            let context = ClientContext::for_profile(profile)?;
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            run_session(&context, input, &mut std::io::stdout()).await?;
        }
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        Some(Commands::Config { command }) => run_config(command, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, profile).await?,
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
