use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One caption track offered for a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
    pub base_url: String,
}

/// A caption unit delivered as a typed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A caption unit as handed over by a transcript source.
///
/// Sources either produce typed snippets or loosely keyed records; both carry
/// a `text` field and are flattened the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionSegment {
    Snippet(TranscriptSnippet),
    Record(Map<String, Value>),
}

impl CaptionSegment {
    pub fn into_text(self) -> Result<String> {
        match self {
            CaptionSegment::Snippet(snippet) => Ok(snippet.text),
            CaptionSegment::Record(mut record) => match record.remove("text") {
                Some(Value::String(text)) => Ok(text),
                Some(other) => Err(Error::TranscriptUnavailable(format!(
                    "caption segment text is not a string: {}",
                    other
                ))),
                None => Err(Error::TranscriptUnavailable(
                    "caption segment has no text field".to_string(),
                )),
            },
        }
    }
}

impl From<TranscriptSnippet> for CaptionSegment {
    fn from(snippet: TranscriptSnippet) -> Self {
        CaptionSegment::Snippet(snippet)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

/// One server-sent chunk of a streamed generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GeminiError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

impl GeminiRequest {
    /// A single-turn request carrying one text prompt.
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        }
    }
}

impl GeminiResponse {
    /// Text of the first candidate, all parts joined.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
