use anyhow::Result;
use doc_chat::{ChatProxy, DocumentProcessor, TranscriptFetcher, YouTubeTranscriptClient};
use std::sync::Arc;

use crate::config::AppConfig;

/// Collaborators shared by every handler. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentProcessor,
    pub transcripts: Arc<TranscriptFetcher>,
    pub chat: Arc<ChatProxy>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let youtube = Arc::new(YouTubeTranscriptClient::new()?);
        let transcripts = TranscriptFetcher::new(youtube, config.transcript_languages.clone());
        let chat = ChatProxy::from_config(&config.chat)?;

        Ok(Self {
            documents: DocumentProcessor::new(),
            transcripts: Arc::new(transcripts),
            chat: Arc::new(chat),
        })
    }
}
