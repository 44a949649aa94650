use std::path::PathBuf;

use inkfusion_core::{DraftField, TokenStore};

use crate::commands::common::{
    ensure_saved, parse_paste_spec, read_attachments, read_clipboard_item, resolve_note_key,
    zero_based, ClientContext,
};
use crate::error::CliError;

#[derive(Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub attach: Vec<PathBuf>,
    pub paste: Vec<String>,
    pub remove_saved: Vec<usize>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tag.is_none()
            && self.attach.is_empty()
            && self.paste.is_empty()
            && self.remove_saved.is_empty()
    }
}

pub async fn run_edit<S: TokenStore>(
    context: &ClientContext<S>,
    id: &str,
    changes: NoteChanges,
) -> Result<String, CliError> {
    if changes.is_empty() {
        return Err(CliError::NoChanges);
    }

    let attachments = read_attachments(&changes.attach)?;
    let clipboard = changes
        .paste
        .iter()
        .map(|spec| {
            let (mime_type, path) = parse_paste_spec(spec)?;
            read_clipboard_item(&mime_type, &path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut removals = changes
        .remove_saved
        .iter()
        .map(|position| zero_based(*position))
        .collect::<Result<Vec<_>, _>>()?;
    removals.sort_unstable();
    removals.dedup();

    let workspace = context.open_workspace().await?;
    let key = resolve_note_key(&workspace.drafts(), id)?;

    let saved_count = workspace
        .draft(key)
        .map_or(0, |draft| draft.saved_media().len());
    if let Some(index) = removals.iter().find(|index| **index >= saved_count) {
        return Err(CliError::InvalidArgument(format!(
            "note has {saved_count} saved attachments, no attachment {}",
            index + 1
        )));
    }
    // Highest first so earlier positions stay valid.
    for index in removals.into_iter().rev() {
        workspace.remove_saved_media(key, index)?;
    }

    let fields = [
        (DraftField::Title, changes.title),
        (DraftField::Description, changes.description),
        (DraftField::Tag, changes.tag),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            workspace.set_field(key, field, value)?;
        }
    }

    workspace.add_files(key, attachments)?;
    let pasted = workspace.paste(key, &clipboard)?;
    if pasted < clipboard.len() {
        tracing::warn!(
            "Skipped {} pasted item(s) that were not images",
            clipboard.len() - pasted
        );
    }

    let saved = ensure_saved(&workspace, key).await?;
    let id = saved.id().map(ToString::to_string).unwrap_or_default();
    println!("{id}");
    Ok(id)
}
