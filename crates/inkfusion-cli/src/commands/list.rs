use inkfusion_core::TokenStore;

use crate::commands::common::{format_note_lines, note_to_list_item, ClientContext, NoteListItem};
use crate::error::CliError;

pub async fn run_list<S: TokenStore>(
    context: &ClientContext<S>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let workspace = context.open_workspace().await?;
    let drafts = workspace
        .drafts()
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>();

    if as_json {
        let json_items = drafts
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_note_lines(&drafts) {
            println!("{line}");
        }
    }

    Ok(())
}
