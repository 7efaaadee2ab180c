use serde::Deserialize;

/// Body of `POST /chat`. Fields are optional so a missing one is a 400, not a 422.
#[derive(Debug, Default, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}
