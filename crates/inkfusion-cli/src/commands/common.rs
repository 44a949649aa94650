use std::path::{Path, PathBuf};

use inkfusion_core::{
    AuthClient, ClientConfig, ClipboardItem, DisplayMedia, DraftKey, HttpNotesApi, MediaSource,
    NoteDraft, NotesWorkspace, PendingAttachment, Session, TokenStore,
};
use serde::Serialize;

use crate::auth::{session_for_profile, KeyringTokenStore};
use crate::commands::config::effective_config;
use crate::config_profiles::default_config_path;
use crate::error::CliError;

pub type CliWorkspace<S> = NotesWorkspace<HttpNotesApi<S>>;

/// Resolved profile: effective client config plus its token slot.
pub struct ClientContext<S: TokenStore> {
    pub profile_name: String,
    pub config: ClientConfig,
    pub session: Session<S>,
}

impl ClientContext<KeyringTokenStore> {
    pub fn for_profile(explicit: Option<&str>) -> Result<Self, CliError> {
        let path = default_config_path().map_err(CliError::Config)?;
        let (profile_name, config) = effective_config(&path, explicit)?;

        Ok(Self {
            session: session_for_profile(&profile_name),
            profile_name,
            config,
        })
    }
}

impl<S: TokenStore> ClientContext<S> {
    pub fn auth_client(&self) -> Result<AuthClient<S>, CliError> {
        Ok(AuthClient::new(&self.config, self.session.clone())?)
    }

    /// A workspace with nothing loaded yet.
    pub fn workspace(&self) -> Result<CliWorkspace<S>, CliError> {
        if !self.session.is_authenticated() {
            return Err(CliError::NotSignedIn(self.profile_name.clone()));
        }
        let api = HttpNotesApi::new(&self.config, self.session.clone())?;
        Ok(NotesWorkspace::new(api, &self.config))
    }

    /// A workspace holding the server's current notes.
    pub async fn open_workspace(&self) -> Result<CliWorkspace<S>, CliError> {
        let workspace = self.workspace()?;
        workspace.load().await?;
        Ok(workspace)
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub tag: String,
    pub media: Vec<String>,
    pub pending_files: Vec<String>,
}

pub fn normalize_note_identifier(raw_id: &str) -> Result<String, CliError> {
    let normalized = raw_id.trim();
    if normalized.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    Ok(normalized.to_string())
}

/// Find a draft by full server id, falling back to a unique id prefix.
pub fn resolve_note_key(drafts: &[NoteDraft], note_query: &str) -> Result<DraftKey, CliError> {
    let note_query = normalize_note_identifier(note_query)?;

    if let Some(draft) = drafts
        .iter()
        .find(|draft| draft.id().is_some_and(|id| id.as_str() == note_query))
    {
        return Ok(draft.key());
    }

    let matching = drafts
        .iter()
        .filter(|draft| {
            draft
                .id()
                .is_some_and(|id| id.as_str().starts_with(note_query.as_str()))
        })
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query)),
        [draft] => Ok(draft.key()),
        several => {
            let options = several
                .iter()
                .take(3)
                .filter_map(|draft| draft.id())
                .map(|id| id.as_str().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(drafts: &[NoteDraft]) -> Vec<String> {
    drafts
        .iter()
        .map(|draft| {
            let short_id = short_note_id(draft);
            let preview = note_preview(draft, 40);
            let media_count = draft.saved_media().len() + draft.pending_attachments().len();

            if media_count == 0 {
                format!("{short_id:<13}  {preview:<40}  #{}", draft.tag())
            } else {
                format!(
                    "{short_id:<13}  {preview:<40}  #{:<12}  {media_count} media",
                    draft.tag()
                )
            }
        })
        .collect()
}

pub fn short_note_id(draft: &NoteDraft) -> String {
    draft.id().map_or_else(
        || "(unsaved)".to_string(),
        |id| id.as_str().chars().take(13).collect(),
    )
}

pub fn note_to_list_item(draft: &NoteDraft) -> NoteListItem {
    NoteListItem {
        id: draft.id().map(ToString::to_string),
        title: draft.title().to_string(),
        description: draft.description().to_string(),
        tag: draft.tag().to_string(),
        media: draft
            .saved_media()
            .iter()
            .map(|media| media.url.clone())
            .collect(),
        pending_files: draft
            .pending_attachments()
            .iter()
            .map(|file| file.file_name().to_string())
            .collect(),
    }
}

/// Title when there is one, otherwise the first line of the description.
pub fn note_preview(draft: &NoteDraft, max_chars: usize) -> String {
    let source = if draft.title().trim().is_empty() {
        draft.description().lines().next().unwrap_or("")
    } else {
        draft.title()
    };
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "(untitled)".to_string()
    } else if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// One line per attachment, numbered from 1 within saved and pending.
pub fn format_media_lines(draft: &NoteDraft, media: &[DisplayMedia]) -> Vec<String> {
    media
        .iter()
        .map(|item| match item.source {
            MediaSource::Saved(index) => {
                format!("saved   {:>2}  {:<5}  {}", index + 1, item.kind.label(), item.locator)
            }
            MediaSource::Pending(index) => {
                let name = draft
                    .pending_attachments()
                    .get(index)
                    .map_or("", PendingAttachment::file_name);
                format!("pending {:>2}  {:<5}  {name}", index + 1, item.kind.label())
            }
        })
        .collect()
}

/// Convert a 1-based position typed by the user.
pub fn zero_based(position: usize) -> Result<usize, CliError> {
    position
        .checked_sub(1)
        .ok_or_else(|| CliError::InvalidArgument("positions start at 1".to_string()))
}

pub fn read_attachments(paths: &[PathBuf]) -> Result<Vec<PendingAttachment>, CliError> {
    paths
        .iter()
        .map(|path| PendingAttachment::read_from(path).map_err(CliError::from))
        .collect()
}

/// Split `MIME=PATH`.
pub fn parse_paste_spec(spec: &str) -> Result<(String, PathBuf), CliError> {
    let invalid = || CliError::InvalidArgument(format!("expected MIME=PATH, got '{spec}'"));
    let (mime_type, path) = spec.split_once('=').ok_or_else(invalid)?;
    let mime_type = mime_type.trim();
    let path = path.trim();
    if mime_type.is_empty() || path.is_empty() || !mime_type.contains('/') {
        return Err(invalid());
    }
    Ok((mime_type.to_ascii_lowercase(), PathBuf::from(path)))
}

/// Treat a file on disk as one clipboard item of the given type.
pub fn read_clipboard_item(mime_type: &str, path: &Path) -> Result<ClipboardItem, CliError> {
    Ok(ClipboardItem::file(mime_type, std::fs::read(path)?))
}

/// Flush pending saves and confirm the draft reached the server.
pub async fn ensure_saved<S: TokenStore>(
    workspace: &CliWorkspace<S>,
    key: DraftKey,
) -> Result<NoteDraft, CliError> {
    workspace.flush().await;
    let draft = workspace
        .draft(key)
        .ok_or_else(|| CliError::NoteNotFound(key.to_string()))?;
    if draft.is_dirty() || draft.id().is_none() {
        return Err(CliError::SaveFailed);
    }
    Ok(draft)
}
