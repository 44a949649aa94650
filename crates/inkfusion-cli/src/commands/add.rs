use std::path::PathBuf;

use inkfusion_core::{DraftField, TokenStore};

use crate::commands::common::{ensure_saved, read_attachments, ClientContext};
use crate::error::CliError;

pub struct NewNote {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub attach: Vec<PathBuf>,
}

pub async fn run_add<S: TokenStore>(
    context: &ClientContext<S>,
    note: NewNote,
) -> Result<String, CliError> {
    let attachments = read_attachments(&note.attach)?;
    let workspace = context.workspace()?;
    let key = workspace.add_empty();

    let fields = [
        (DraftField::Title, note.title),
        (DraftField::Description, note.description),
        (DraftField::Tag, note.tag),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            workspace.set_field(key, field, value)?;
        }
    }
    workspace.add_files(key, attachments)?;

    if workspace.draft(key).is_some_and(|draft| draft.is_skippable()) {
        return Err(CliError::EmptyNote);
    }

    let saved = ensure_saved(&workspace, key).await?;
    let id = saved.id().map(ToString::to_string).unwrap_or_default();
    println!("{id}");
    Ok(id)
}
