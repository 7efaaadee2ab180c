use crate::error::{Error, Result};
use crate::models::{CaptionSegment, CaptionTrack, TranscriptSnippet};
use crate::video_id::VideoReference;
use async_trait::async_trait;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";
const ANDROID_CLIENT_VERSION: &str = "20.10.38";

/// Where caption tracks come from.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// All caption tracks for the video, in the order the upstream lists them.
    async fn list_tracks(&self, video: &VideoReference) -> Result<Vec<CaptionTrack>>;

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>>;

    /// Fetches the best track among `languages`, tried in priority order.
    async fn fetch_preferred(
        &self,
        video: &VideoReference,
        languages: &[String],
    ) -> Result<Vec<CaptionSegment>> {
        let tracks = self.list_tracks(video).await?;
        let track = select_preferred(&tracks, languages).ok_or_else(|| {
            let available = tracks
                .iter()
                .map(|t| t.language_code.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Error::TranscriptUnavailable(format!(
                "no transcript in any of [{}] (available: [{}])",
                languages.join(", "),
                available
            ))
        })?;
        self.fetch_track(track).await
    }
}

/// Picks the first language in `languages` that has a track, preferring a
/// manually created track over a generated one for the same language.
pub fn select_preferred<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let mut matching = tracks.iter().filter(|t| &t.language_code == lang);
        let first = matching.next()?;
        if !first.is_generated {
            return Some(first);
        }
        matching.find(|t| !t.is_generated).or(Some(first))
    })
}

/// Fetches a transcript and flattens it to one string.
pub struct TranscriptFetcher {
    source: Arc<dyn TranscriptSource>,
    languages: Vec<String>,
}

impl TranscriptFetcher {
    pub fn new(source: Arc<dyn TranscriptSource>, languages: Vec<String>) -> Self {
        Self { source, languages }
    }

    pub async fn fetch(&self, video: &VideoReference) -> Result<String> {
        let segments = match self.source.fetch_preferred(video, &self.languages).await {
            Ok(segments) => {
                log::info!("Fetched preferred-language transcript for {}", video);
                segments
            }
            Err(preferred_err) => {
                log::warn!(
                    "Preferred transcript for {} unavailable ({}), falling back to first listed track",
                    video,
                    preferred_err
                );
                self.fetch_first_available(video)
                    .await
                    .map_err(|fallback_err| {
                        Error::TranscriptUnavailable(format!(
                            "{}; fallback failed: {}",
                            detail(&preferred_err),
                            detail(&fallback_err)
                        ))
                    })?
            }
        };

        flatten_segments(segments)
    }

    async fn fetch_first_available(&self, video: &VideoReference) -> Result<Vec<CaptionSegment>> {
        let tracks = self.source.list_tracks(video).await?;
        let track = tracks.first().ok_or_else(|| {
            Error::TranscriptUnavailable(format!("no transcripts available for video {}", video))
        })?;

        log::info!(
            "Using fallback transcript track '{}' ({}) for {}",
            track.language,
            track.language_code,
            video
        );
        self.source.fetch_track(track).await
    }
}

/// Joins segment texts in order, separated by a single space.
pub fn flatten_segments(segments: Vec<CaptionSegment>) -> Result<String> {
    let parts = segments
        .into_iter()
        .map(CaptionSegment::into_text)
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" "))
}

fn detail(err: &Error) -> String {
    match err {
        Error::TranscriptUnavailable(detail) => detail.clone(),
        other => other.to_string(),
    }
}

/// Reads caption tracks straight from YouTube.
pub struct YouTubeTranscriptClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<PlayerCaptions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerCaptions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<CaptionTracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklist {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    runs: Option<Vec<TrackNameRun>>,
}

#[derive(Debug, Deserialize)]
struct TrackNameRun {
    text: String,
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        let language = raw
            .name
            .and_then(|name| {
                name.simple_text.or_else(|| {
                    name.runs
                        .map(|runs| runs.into_iter().map(|r| r.text).collect::<String>())
                })
            })
            .unwrap_or_else(|| raw.language_code.clone());

        CaptionTrack {
            language_code: raw.language_code,
            language,
            is_generated: raw.kind.as_deref() == Some("asr"),
            base_url: raw.base_url.replace("&fmt=srv3", ""),
        }
    }
}

impl YouTubeTranscriptClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::TranscriptUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn innertube_api_key(&self, video: &VideoReference) -> Result<String> {
        let html = self
            .client
            .get(format!("{}{}", WATCH_URL, video))
            .header("Accept-Language", "en-US")
            .header("Cookie", "CONSENT=YES+cb")
            .send()
            .await
            .map_err(upstream)?
            .text()
            .await
            .map_err(upstream)?;

        if html.contains("class=\"g-recaptcha\"") {
            return Err(Error::TranscriptUnavailable(
                "YouTube is blocking requests from this IP".to_string(),
            ));
        }

        static KEY_RE: OnceLock<Regex> = OnceLock::new();
        let re = KEY_RE.get_or_init(|| {
            Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("key pattern is valid")
        });

        re.captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                Error::TranscriptUnavailable(format!("could not read player data for video {}", video))
            })
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscriptClient {
    async fn list_tracks(&self, video: &VideoReference) -> Result<Vec<CaptionTrack>> {
        let api_key = self.innertube_api_key(video).await?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": ANDROID_CLIENT_VERSION,
                }
            },
            "videoId": video.as_str(),
        });

        let response = self
            .client
            .post(format!("{}{}", PLAYER_URL, api_key))
            .json(&body)
            .send()
            .await
            .map_err(upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::TranscriptUnavailable(format!(
                "player request for {} failed: HTTP {}",
                video, status
            )));
        }

        let player: PlayerResponse = response.json().await.map_err(upstream)?;

        if let Some(playability) = &player.playability_status {
            if playability.status.as_deref().is_some_and(|s| s != "OK") {
                return Err(Error::TranscriptUnavailable(format!(
                    "video {} is unplayable: {}",
                    video,
                    playability
                        .reason
                        .as_deref()
                        .unwrap_or("no reason given")
                )));
            }
        }

        let tracks: Vec<CaptionTrack> = player
            .captions
            .and_then(|c| c.tracklist)
            .map(|t| t.caption_tracks.into_iter().map(CaptionTrack::from).collect())
            .unwrap_or_default();

        if tracks.is_empty() {
            return Err(Error::TranscriptUnavailable(format!(
                "subtitles are disabled for video {}",
                video
            )));
        }

        log::debug!("Video {} has {} caption tracks", video, tracks.len());
        Ok(tracks)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>> {
        let response = self
            .client
            .get(&track.base_url)
            .header("Accept-Language", "en-US")
            .send()
            .await
            .map_err(upstream)?;

        if !response.status().is_success() {
            return Err(Error::TranscriptUnavailable(format!(
                "caption download for '{}' failed: HTTP {}",
                track.language_code,
                response.status()
            )));
        }

        let xml = response.text().await.map_err(upstream)?;
        Ok(parse_timedtext(&xml)?
            .into_iter()
            .map(CaptionSegment::from)
            .collect())
    }
}

fn upstream(err: reqwest::Error) -> Error {
    Error::TranscriptUnavailable(err.to_string())
}

/// Parses a timed-text XML document into caption snippets, one per `<text>`
/// element in document order. Empty elements become empty snippets.
pub fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSnippet>> {
    let mut reader = Reader::from_str(xml);
    let mut snippets = Vec::new();
    let mut current: Option<TranscriptSnippet> = None;

    loop {
        match reader.read_event().map_err(malformed_captions)? {
            Event::Start(e) if e.local_name().as_ref() == b"text" => {
                current = Some(snippet_from(&e)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"text" => {
                snippets.push(snippet_from(&e)?);
            }
            Event::Text(e) => {
                if let Some(snippet) = current.as_mut() {
                    snippet
                        .text
                        .push_str(&e.unescape().map_err(malformed_captions)?);
                }
            }
            Event::CData(e) => {
                if let Some(snippet) = current.as_mut() {
                    snippet.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"text" => {
                if let Some(mut snippet) = current.take() {
                    snippet.text = clean_caption(&snippet.text);
                    snippets.push(snippet);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(snippets)
}

fn snippet_from(element: &BytesStart) -> Result<TranscriptSnippet> {
    let seconds = |key: &str| -> Result<f64> {
        match element.try_get_attribute(key).map_err(malformed_captions)? {
            Some(attr) => attr
                .unescape_value()
                .map_err(malformed_captions)?
                .trim()
                .parse()
                .map_err(malformed_captions),
            None => Ok(0.0),
        }
    };

    Ok(TranscriptSnippet {
        text: String::new(),
        start: seconds("start")?,
        duration: seconds("dur")?,
    })
}

/// Strips inline markup from XML-decoded caption text, then resolves the
/// HTML entities the captions carry.
fn clean_caption(text: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

    let stripped = tag_re.replace_all(text, "");
    unescape_with(&stripped, html_entity)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| stripped.to_string())
}

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        _ => None,
    }
}

fn malformed_captions(err: impl std::fmt::Display) -> Error {
    Error::TranscriptUnavailable(format!("malformed caption data: {}", err))
}
