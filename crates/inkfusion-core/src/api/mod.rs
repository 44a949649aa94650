//! Notes API client.
//!
//! [`NotesApi`] is the seam the autosave coordinator and the workspace talk
//! to; [`HttpNotesApi`] implements it against the REST backend.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{normalize_base_url, ClientConfig};
use crate::models::{NoteId, SavePayload, ServerNote};
use crate::session::{Session, SessionError, TokenStore};
use crate::util::compact_text;

pub(crate) const AUTH_HEADER: &str = "auth-token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to encode request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response payload: {0}")]
    InvalidPayload(String),
    #[error("Session expired or invalid; sign in again")]
    Unauthorized,
    #[error("Notes API error: {message} ({status})")]
    Status { status: u16, message: String },
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error(transparent)]
    Session(SessionError),
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotSignedIn => Self::NotAuthenticated,
            other => Self::Session(other),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Remote note storage.
pub trait NotesApi: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = ApiResult<Vec<ServerNote>>> + Send;

    fn create(&self, payload: SavePayload) -> impl Future<Output = ApiResult<ServerNote>> + Send;

    fn update(
        &self,
        id: &NoteId,
        payload: SavePayload,
    ) -> impl Future<Output = ApiResult<ServerNote>> + Send;

    fn delete(&self, id: &NoteId) -> impl Future<Output = ApiResult<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpNotesApi<S: TokenStore> {
    base_url: String,
    client: Client,
    session: Session<S>,
}

impl<S: TokenStore> HttpNotesApi<S> {
    pub fn new(config: &ClientConfig, session: Session<S>) -> ApiResult<Self> {
        let base_url = normalize_base_url(&config.api_base_url)
            .map_err(|error| ApiError::InvalidConfiguration(error.to_string()))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url,
            client,
            session,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn session(&self) -> &Session<S> {
        &self.session
    }

    fn authorized(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.session.require_token()?;
        Ok(request.header(AUTH_HEADER, token.expose()))
    }

    fn note_url(&self, action: &str, id: &NoteId) -> String {
        format!(
            "{}/api/notes/{action}/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }
}

impl<S: TokenStore> NotesApi for HttpNotesApi<S> {
    async fn fetch_all(&self) -> ApiResult<Vec<ServerNote>> {
        let request =
            self.authorized(self.client.get(format!("{}/api/notes/fetchallnotes", self.base_url)))?;
        let notes: Vec<ServerNote> = read_json(request.send().await?).await?;
        tracing::debug!("Fetched {} notes", notes.len());
        Ok(notes)
    }

    async fn create(&self, payload: SavePayload) -> ApiResult<ServerNote> {
        let form = multipart_form(payload)?;
        let request = self.authorized(
            self.client
                .post(format!("{}/api/notes/addnote", self.base_url))
                .multipart(form),
        )?;
        read_json(request.send().await?).await
    }

    async fn update(&self, id: &NoteId, payload: SavePayload) -> ApiResult<ServerNote> {
        let form = multipart_form(payload)?;
        let request = self.authorized(
            self.client
                .put(self.note_url("updatenote", id))
                .multipart(form),
        )?;
        read_json(request.send().await?).await
    }

    async fn delete(&self, id: &NoteId) -> ApiResult<()> {
        let request = self.authorized(self.client.delete(self.note_url("deletenote", id)))?;
        let response = request.send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Multipart body shared by create and update.
///
/// Part order follows the backend's expectations: text fields, then one
/// `files` part per pending attachment, then `existingMultimedia`.
fn multipart_form(payload: SavePayload) -> ApiResult<Form> {
    let existing = payload.existing_multimedia_json()?;
    let mut form = Form::new()
        .text("title", payload.title)
        .text("description", payload.description)
        .text("tag", payload.tag);

    for file in payload.files {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.mime_type())?;
        form = form.part("files", part);
    }

    Ok(form.text("existingMultimedia", existing))
}

async fn ensure_success(response: Response) -> ApiResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }
    Ok(body)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = ensure_success(response).await?;
    serde_json::from_str(&body).map_err(|error| {
        ApiError::InvalidPayload(format!("{error}; body: {}", compact_text(&body)))
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    #[serde(default)]
    errors: Vec<ValidationError>,
}

#[derive(Debug, Deserialize)]
struct ValidationError {
    msg: Option<String>,
}

pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorResponse>(body) {
        let first_validation = payload.errors.into_iter().find_map(|error| error.msg);
        if let Some(message) = payload
            .error
            .or(payload.message)
            .or(payload.msg)
            .or(first_validation)
        {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
    } else {
        trimmed
    }
}
