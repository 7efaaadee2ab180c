pub mod chat_proxy;
pub mod document_processor;
pub mod error;
pub mod gemini_service;
pub mod models;
pub mod transcript_service;
pub mod video_id;

pub use chat_proxy::{ChatConfig, ChatProxy, FragmentStream, StreamingChatClient};
pub use document_processor::DocumentProcessor;
pub use error::{Error, Result};
pub use gemini_service::GeminiService;
pub use models::*;
pub use transcript_service::{TranscriptFetcher, TranscriptSource, YouTubeTranscriptClient};
pub use video_id::VideoReference;
