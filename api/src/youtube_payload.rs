use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct YoutubePayload {
    #[serde(default)]
    pub url: Option<String>,
}
