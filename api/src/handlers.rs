use axum::{
    body::Body,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use doc_chat::{Error, VideoReference};
use futures::TryStreamExt;

use crate::chat_payload::ChatPayload;
use crate::error::AppError;
use crate::state::AppState;
use crate::text_response::{HealthResponse, TextResponse};
use crate::youtube_payload::YoutubePayload;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        chat_enabled: state.chat.is_configured(),
    })
}

pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TextResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| AppError::missing("No file uploaded"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some("file") {
            continue;
        }

        // A part without a filename is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(AppError::missing("No file selected"));
        }

        let document = field.bytes().await.map_err(upload_error)?;

        log::info!("Received PDF '{}' ({} bytes)", file_name, document.len());
        let text = state.documents.extract(document).await?;
        return Ok(Json(TextResponse { text }));
    }

    Err(AppError::missing("No file uploaded"))
}

fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError(Error::PayloadTooLarge(
            "Uploaded file exceeds the size limit".to_string(),
        ))
    } else {
        AppError::missing(&format!("Invalid upload: {}", err.body_text()))
    }
}

pub async fn process_youtube(
    State(state): State<AppState>,
    payload: Result<Json<YoutubePayload>, JsonRejection>,
) -> Result<Json<TextResponse>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let url = payload
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::missing("No URL provided"))?;

    let video = VideoReference::parse(&url)
        .ok_or_else(|| Error::InvalidReference("Invalid YouTube URL".to_string()))?;

    log::info!("Fetching transcript for video {}", video);
    let text = state.transcripts.fetch(&video).await?;
    Ok(Json(TextResponse { text }))
}

/// Streams the model's answer as a chunked `text/plain` body, one fragment per chunk.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let message = payload.message.unwrap_or_default();
    let context = payload.context.unwrap_or_default();

    let fragments = state.chat.converse(&message, &context).await?;

    // A failure after the first byte cannot change the status; the body is cut short instead.
    let body = Body::from_stream(
        fragments.inspect_err(|e| log::error!("Chat stream interrupted: {}", e)),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
