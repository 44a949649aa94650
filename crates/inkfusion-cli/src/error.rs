use std::io;

use inkfusion_core::{ApiError, AuthError, SessionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] inkfusion_core::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Nothing to save: give the note a title, description, or attachment")]
    EmptyNote,
    #[error("No changes given")]
    NoChanges,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Note was not saved; check the log output for the server error")]
    SaveFailed,
    #[error("Profile '{0}' is not signed in. Run `inkfusion auth login` first.")]
    NotSignedIn(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
