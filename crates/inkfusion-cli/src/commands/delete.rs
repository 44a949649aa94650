use inkfusion_core::TokenStore;

use crate::commands::common::{resolve_note_key, ClientContext};
use crate::error::CliError;

pub async fn run_delete<S: TokenStore>(
    context: &ClientContext<S>,
    id: &str,
) -> Result<(), CliError> {
    let workspace = context.open_workspace().await?;
    let key = resolve_note_key(&workspace.drafts(), id)?;
    let note_id = workspace
        .draft(key)
        .and_then(|draft| draft.id().map(ToString::to_string))
        .unwrap_or_default();

    workspace.delete(key).await?;
    println!("{note_id}");
    Ok(())
}
