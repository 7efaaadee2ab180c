use crate::error::{Error, Result};
use crate::gemini_service::GeminiService;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Longest context, in characters, ever embedded in a prompt.
pub const MAX_CONTEXT_CHARS: usize = 30_000;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Answer fragments in arrival order. Single pass; ends when the model finishes.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A generative model that can stream its answer to a prompt.
#[async_trait]
pub trait StreamingChatClient: Send + Sync {
    /// Starts a generation. Every call is a fresh upstream request.
    async fn stream_generate(&self, prompt: String) -> Result<FragmentStream>;
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model credential; `None` leaves chat disabled.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Longest wait for the next fragment before the answer is abandoned.
    pub idle_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Builds the prompt for a question about a document and relays the streamed answer.
pub struct ChatProxy {
    client: Option<Arc<dyn StreamingChatClient>>,
}

impl ChatProxy {
    /// Wires the Gemini client when a credential is configured.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let client = match config.api_key {
            Some(_) => Some(Arc::new(GeminiService::new(config)?) as Arc<dyn StreamingChatClient>),
            None => None,
        };
        Ok(Self { client })
    }

    pub fn with_client(client: Arc<dyn StreamingChatClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Asks the model `message` about `context` and returns the answer as it streams.
    pub async fn converse(&self, message: &str, context: &str) -> Result<FragmentStream> {
        if message.is_empty() || context.is_empty() {
            return Err(Error::MissingInput("Missing message or context".to_string()));
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Misconfigured("Server API Key not configured".to_string()))?;

        let prompt = build_prompt(message, context);
        log::info!(
            "Starting chat stream ({} prompt characters)",
            prompt.chars().count()
        );
        client.stream_generate(prompt).await
    }
}

/// The first `MAX_CONTEXT_CHARS` characters of `context`.
pub fn truncate_context(context: &str) -> &str {
    match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((end, _)) => &context[..end],
        None => context,
    }
}

pub fn build_prompt(message: &str, context: &str) -> String {
    let context = truncate_context(context);
    format!(
        r#"You are an expert analyst. Use the following context to answer the user's question.
If the answer is not in the context, say so, but try to be helpful.

Context:
{context}

User Question:
{message}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use std::sync::Mutex;

    /// Records prompts and replays canned fragments.
    struct FakeModel {
        fragments: Vec<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn new(fragments: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                fragments,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StreamingChatClient for FakeModel {
        async fn stream_generate(&self, prompt: String) -> Result<FragmentStream> {
            self.prompts.lock().unwrap().push(prompt);
            let items: Vec<Result<String>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl StreamingChatClient for BrokenModel {
        async fn stream_generate(&self, _prompt: String) -> Result<FragmentStream> {
            let items = vec![
                Ok("partial ".to_string()),
                Err(Error::ChatUnavailable("connection reset".to_string())),
            ];
            Ok(Box::pin(stream::iter(items)))
        }
    }

    #[test]
    fn short_context_is_untouched() {
        assert_eq!(truncate_context("abc"), "abc");
    }

    #[test]
    fn long_context_is_clipped_to_limit() {
        let context = "x".repeat(MAX_CONTEXT_CHARS + 500);
        assert_eq!(truncate_context(&context).chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn clipping_counts_characters_not_bytes() {
        let context = "é".repeat(MAX_CONTEXT_CHARS + 1);
        let clipped = truncate_context(&context);
        assert_eq!(clipped.chars().count(), MAX_CONTEXT_CHARS);
        assert_eq!(clipped.len(), MAX_CONTEXT_CHARS * 2);
    }

    #[test]
    fn prompt_embeds_exactly_the_clipped_context_and_message() {
        let head = "a".repeat(MAX_CONTEXT_CHARS);
        let context = format!("{}TAIL-MARKER", head);
        let prompt = build_prompt("What is it about?", &context);

        assert!(prompt.starts_with("You are an expert analyst."));
        assert!(prompt.contains(&head));
        assert!(!prompt.contains("TAIL-MARKER"));
        assert!(prompt.contains("User Question:\nWhat is it about?"));
    }

    #[tokio::test]
    async fn fragments_are_relayed_in_order() {
        let model = FakeModel::new(vec!["The ", "answer", "."]);
        let proxy = ChatProxy::with_client(model.clone());

        let fragments: Vec<String> = proxy
            .converse("question", "context")
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["The ", "answer", "."]);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn every_conversation_is_a_fresh_upstream_call() {
        let model = FakeModel::new(vec!["one"]);
        let proxy = ChatProxy::with_client(model.clone());

        let first = proxy.converse("q", "ctx").await.unwrap();
        let second = proxy.converse("q", "ctx").await.unwrap();

        assert_eq!(model.calls(), 2);
        assert_eq!(first.collect::<Vec<_>>().await.len(), 1);
        assert_eq!(second.collect::<Vec<_>>().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_input_is_rejected_before_upstream() {
        let model = FakeModel::new(vec!["unused"]);
        let proxy = ChatProxy::with_client(model.clone());

        let err = proxy.converse("", "context").await.err().unwrap();
        assert!(matches!(err, Error::MissingInput(_)));
        let err = proxy.converse("question", "").await.err().unwrap();
        assert!(matches!(err, Error::MissingInput(_)));

        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn unconfigured_proxy_is_misconfigured() {
        let proxy = ChatProxy::from_config(&ChatConfig::default()).unwrap();

        assert!(!proxy.is_configured());
        let err = proxy.converse("question", "context").await.err().unwrap();
        assert!(matches!(err, Error::Misconfigured(_)));
    }

    #[tokio::test]
    async fn missing_input_wins_over_missing_credential() {
        let proxy = ChatProxy::unconfigured();

        let err = proxy.converse("", "").await.err().unwrap();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[tokio::test]
    async fn fragments_before_a_failure_are_kept() {
        let proxy = ChatProxy::with_client(Arc::new(BrokenModel));

        let items: Vec<Result<String>> = proxy
            .converse("q", "ctx")
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial ");
        assert!(matches!(items[1], Err(Error::ChatUnavailable(_))));
    }

    #[test]
    fn configured_proxy_reports_configured() {
        let config = ChatConfig {
            api_key: Some("test-key".to_string()),
            ..ChatConfig::default()
        };

        assert!(ChatProxy::from_config(&config).unwrap().is_configured());
    }
}
