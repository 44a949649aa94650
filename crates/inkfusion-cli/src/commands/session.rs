//! Line-oriented editing session.
//!
//! Edits land in the workspace immediately and are saved by the autosave
//! coordinator in the background; `quit` flushes whatever is still pending.

use std::io::Write;
use std::path::PathBuf;

use inkfusion_core::{DraftField, DraftKey, MediaSource, TokenStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::common::{
    format_media_lines, format_note_lines, read_attachments, read_clipboard_item, zero_based,
    ClientContext, CliWorkspace,
};
use crate::error::CliError;

const HELP: &str = "\
Commands (N is the note position shown by `list`):
  list                         show notes and save state
  new                          add an empty note at the top
  title N TEXT                 set the title
  desc N TEXT                  set the description (\\n for a line break)
  tag N TEXT                   set the tag
  attach N PATH...             queue files for upload
  paste N MIME PATH            paste clipboard content saved to PATH
  unattach N saved|pending I   drop an attachment
  media N                      list attachments
  delete N                     delete the note
  save                         save pending edits now
  status                       show save state
  reload                       save, then reload notes from the server
  quit                         save and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    List,
    New,
    Set {
        position: usize,
        field: DraftField,
        value: String,
    },
    Attach {
        position: usize,
        paths: Vec<PathBuf>,
    },
    Paste {
        position: usize,
        mime_type: String,
        path: PathBuf,
    },
    Unattach {
        position: usize,
        source: MediaSource,
    },
    Media {
        position: usize,
    },
    Delete {
        position: usize,
    },
    Save,
    Status,
    Reload,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CliError> {
        let line = line.trim();
        let Some((verb, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "new" | "add" => Self::New,
            "title" | "desc" | "description" | "tag" => {
                let field = verb.parse::<DraftField>()?;
                let (position, value) = position_and_rest(verb, rest)?;
                Self::Set {
                    position,
                    field,
                    value: value.replace("\\n", "\n"),
                }
            }
            "attach" => {
                let (position, rest) = position_and_rest(verb, rest)?;
                let paths = rest
                    .split_whitespace()
                    .map(PathBuf::from)
                    .collect::<Vec<_>>();
                if paths.is_empty() {
                    return Err(usage("attach N PATH..."));
                }
                Self::Attach { position, paths }
            }
            "paste" => {
                let (position, rest) = position_and_rest(verb, rest)?;
                let (mime_type, path) = split_word(rest).ok_or_else(|| usage("paste N MIME PATH"))?;
                if path.is_empty() || !mime_type.contains('/') {
                    return Err(usage("paste N MIME PATH"));
                }
                Self::Paste {
                    position,
                    mime_type: mime_type.to_ascii_lowercase(),
                    path: PathBuf::from(path),
                }
            }
            "unattach" | "rm-media" => {
                let (position, rest) = position_and_rest(verb, rest)?;
                let mut words = rest.split_whitespace();
                let (Some(kind), Some(index), None) = (words.next(), words.next(), words.next())
                else {
                    return Err(usage("unattach N saved|pending I"));
                };
                let index = zero_based(parse_position(index)?)?;
                let source = match kind {
                    "saved" => MediaSource::Saved(index),
                    "pending" => MediaSource::Pending(index),
                    _ => return Err(usage("unattach N saved|pending I")),
                };
                Self::Unattach { position, source }
            }
            "media" => Self::Media {
                position: single_position(verb, rest)?,
            },
            "delete" | "rm" => Self::Delete {
                position: single_position(verb, rest)?,
            },
            "save" => Self::Save,
            "status" => Self::Status,
            "reload" => Self::Reload,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => {
                return Err(CliError::InvalidArgument(format!(
                    "unknown command '{other}', try `help`"
                )))
            }
        };

        Ok(Some(command))
    }
}

fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    Some(match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    })
}

fn parse_position(raw: &str) -> Result<usize, CliError> {
    raw.parse::<usize>()
        .map_err(|_| CliError::InvalidArgument(format!("'{raw}' is not a position")))
}

fn position_and_rest<'a>(verb: &str, rest: &'a str) -> Result<(usize, &'a str), CliError> {
    let (raw, rest) =
        split_word(rest).ok_or_else(|| CliError::InvalidArgument(format!("{verb}: missing N")))?;
    Ok((parse_position(raw)?, rest))
}

fn single_position(verb: &str, rest: &str) -> Result<usize, CliError> {
    let (position, rest) = position_and_rest(verb, rest)?;
    if !rest.is_empty() {
        return Err(usage(&format!("{verb} N")));
    }
    Ok(position)
}

fn usage(form: &str) -> CliError {
    CliError::InvalidArgument(format!("usage: {form}"))
}

/// Run the session until `quit` or end of input.
pub async fn run_session<S, R, W>(
    context: &ClientContext<S>,
    input: R,
    output: &mut W,
) -> Result<(), CliError>
where
    S: TokenStore,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let workspace = context.open_workspace().await?;
    writeln!(
        output,
        "Loaded {} notes for profile '{}'. Type `help` for commands.",
        workspace.drafts().len(),
        context.profile_name
    )?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(SessionCommand::Quit)) => break,
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                writeln!(output, "{error}")?;
                continue;
            }
        };

        if let Err(error) = execute(&workspace, command, output).await {
            writeln!(output, "Error: {error}")?;
        }
    }

    workspace.flush().await;
    let unsaved = workspace
        .drafts()
        .iter()
        .filter(|draft| draft.is_dirty() && !draft.is_skippable())
        .count();
    if unsaved > 0 {
        writeln!(output, "{unsaved} note(s) could not be saved.")?;
    }
    Ok(())
}

async fn execute<S: TokenStore, W: Write>(
    workspace: &CliWorkspace<S>,
    command: SessionCommand,
    output: &mut W,
) -> Result<(), CliError> {
    match command {
        SessionCommand::List => {
            writeln!(output, "[{}]", workspace.save_state())?;
            let drafts = workspace.drafts();
            for (position, (draft, line)) in drafts
                .iter()
                .zip(format_note_lines(&drafts))
                .enumerate()
            {
                let marker = if draft.is_dirty() { '*' } else { ' ' };
                writeln!(output, "{:>3}{marker} {line}", position + 1)?;
            }
        }
        SessionCommand::New => {
            workspace.add_empty();
            writeln!(output, "New note at position 1")?;
        }
        SessionCommand::Set {
            position,
            field,
            value,
        } => {
            let key = key_at(workspace, position)?;
            workspace.set_field(key, field, value)?;
        }
        SessionCommand::Attach { position, paths } => {
            let key = key_at(workspace, position)?;
            let files = read_attachments(&paths)?;
            let added = workspace.add_files(key, files)?;
            writeln!(output, "Attached {added} file(s)")?;
        }
        SessionCommand::Paste {
            position,
            mime_type,
            path,
        } => {
            let key = key_at(workspace, position)?;
            let item = read_clipboard_item(&mime_type, &path)?;
            if workspace.paste(key, &[item])? == 0 {
                writeln!(output, "Only images can be pasted")?;
            } else {
                writeln!(output, "Pasted 1 image")?;
            }
        }
        SessionCommand::Unattach { position, source } => {
            let key = key_at(workspace, position)?;
            let removed = match source {
                MediaSource::Saved(index) => workspace.remove_saved_media(key, index)?.is_some(),
                MediaSource::Pending(index) => {
                    workspace.remove_pending_media(key, index)?.is_some()
                }
            };
            if !removed {
                writeln!(output, "No such attachment")?;
            }
        }
        SessionCommand::Media { position } => {
            let key = key_at(workspace, position)?;
            let media = workspace.display_media(key)?;
            if media.is_empty() {
                writeln!(output, "No attachments")?;
            }
            if let Some(draft) = workspace.draft(key) {
                for line in format_media_lines(&draft, &media) {
                    writeln!(output, "{line}")?;
                }
            }
        }
        SessionCommand::Delete { position } => {
            let key = key_at(workspace, position)?;
            workspace.delete(key).await?;
            writeln!(output, "Deleted")?;
        }
        SessionCommand::Save => {
            workspace.flush().await;
            writeln!(output, "[{}]", workspace.save_state())?;
        }
        SessionCommand::Status => {
            writeln!(output, "[{}]", workspace.save_state())?;
        }
        SessionCommand::Reload => {
            workspace.flush().await;
            let count = workspace.load().await?;
            writeln!(output, "Loaded {count} notes")?;
        }
        SessionCommand::Help => writeln!(output, "{HELP}")?,
        SessionCommand::Quit => {}
    }
    Ok(())
}

fn key_at<S: TokenStore>(workspace: &CliWorkspace<S>, position: usize) -> Result<DraftKey, CliError> {
    let index = zero_based(position)?;
    workspace
        .drafts()
        .get(index)
        .map(inkfusion_core::NoteDraft::key)
        .ok_or_else(|| CliError::InvalidArgument(format!("no note at position {position}")))
}
