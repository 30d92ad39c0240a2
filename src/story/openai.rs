//! OpenAI chat-completion story generator.

use super::StoryGenerator;
use crate::error::Result;
use crate::openai::create_client;
use crate::retry::ProviderFailure;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Story generator backed by the OpenAI chat API.
pub struct OpenAIStoryGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIStoryGenerator {
    /// Create a generator with the default model.
    pub fn new() -> Result<Self> {
        Self::with_config("gpt-3.5-turbo", 0.8)
    }

    /// Create a generator with a custom model and temperature.
    pub fn with_config(model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature,
        })
    }

    /// Wrap an already configured client.
    pub fn with_client(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        model: &str,
        temperature: f32,
    ) -> Self {
        Self { client, model: model.to_string(), temperature }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// API error types the service uses for throttling and overload.
const TRANSIENT_ERROR_TYPES: [&str; 4] = ["server_error", "requests", "tokens", "engine_overloaded"];

/// Map an OpenAI client error onto the retry classification.
fn classify_error(err: OpenAIError) -> ProviderFailure {
    match err {
        OpenAIError::Reqwest(e) => ProviderFailure::from_reqwest(&e),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let code = api.code.clone().unwrap_or_default();
            let message = format!("OpenAI API error: {}", api.message);
            if kind == "insufficient_quota" {
                ProviderFailure::fatal(message)
            } else if TRANSIENT_ERROR_TYPES.contains(&kind.as_str()) || code == "rate_limit_exceeded" {
                ProviderFailure::transient(message)
            } else {
                ProviderFailure::fatal(message)
            }
        }
        // Non-JSON bodies come from gateways and proxies (502/503 pages).
        OpenAIError::JSONDeserialize(e) => {
            ProviderFailure::transient(format!("OpenAI returned an unreadable response: {}", e))
        }
        other => ProviderFailure::fatal(format!("OpenAI error: {}", other)),
    }
}

#[async_trait]
impl StoryGenerator for OpenAIStoryGenerator {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> std::result::Result<String, ProviderFailure> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| ProviderFailure::fatal(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| ProviderFailure::fatal(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| ProviderFailure::fatal(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(classify_error)?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        debug!("Generated {} characters of story text", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelError;
    use crate::openai::create_client_with_config;
    use crate::retry::{retry, RetryPolicy};
    use async_openai::config::OpenAIConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve the same raw HTTP response to every connection, counting hits.
    async fn canned_server(status: &'static str, content_type: &'static str, body: &'static str) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request_complete(&request) {
                        break;
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/v1", addr), hits)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else { return false };
        let length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + length
    }

    fn generator(api_base: &str) -> OpenAIStoryGenerator {
        let config = OpenAIConfig::new().with_api_base(api_base).with_api_key("sk-test");
        let client = create_client_with_config(config, Duration::from_secs(5)).unwrap();
        OpenAIStoryGenerator::with_client(client, "gpt-3.5-turbo", 0.8)
    }

    async fn generate_with_retries(generator: &OpenAIStoryGenerator, attempts: u32) -> crate::error::Result<String> {
        let policy = RetryPolicy::immediate(attempts);
        retry(&policy, "story generation", |_| generator.generate("system", "user")).await
    }

    #[tokio::test]
    async fn test_gateway_html_error_is_retried() {
        let (base, hits) = canned_server("502 Bad Gateway", "text/html", "<html>bad gateway</html>").await;
        let generator = generator(&base);

        let err = generate_with_retries(&generator, 3).await.unwrap_err();
        assert!(matches!(err, ReelError::Provider(ref m) if m.contains("after 3 attempt(s)")));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_follows_configured_attempts() {
        let (base, hits) = canned_server(
            "429 Too Many Requests",
            "application/json",
            r#"{"error":{"message":"Rate limit reached","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#,
        )
        .await;
        let generator = generator(&base);

        let result = tokio::time::timeout(Duration::from_secs(5), generate_with_retries(&generator, 2))
            .await
            .expect("rate limited call should return without waiting");
        assert!(matches!(result, Err(ReelError::Provider(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_key_is_not_retried() {
        let (base, hits) = canned_server(
            "401 Unauthorized",
            "application/json",
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","param":null,"code":"invalid_api_key"}}"#,
        )
        .await;
        let generator = generator(&base);

        assert!(generate_with_retries(&generator, 3).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generated_text_is_trimmed() {
        let (base, hits) = canned_server(
            "200 OK",
            "application/json",
            r#"{"id":"chatcmpl-1","object":"chat.completion","created":1700000000,"model":"gpt-3.5-turbo","choices":[{"index":0,"message":{"role":"assistant","content":"  The tide came in at midnight.  "},"finish_reason":"stop","logprobs":null}],"usage":{"prompt_tokens":12,"completion_tokens":8,"total_tokens":20}}"#,
        )
        .await;
        let generator = generator(&base);

        let text = generate_with_retries(&generator, 3).await.unwrap();
        assert_eq!(text, "The tide came in at midnight.");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_quota_exhaustion_is_fatal() {
        let api = async_openai::error::ApiError {
            message: "You exceeded your current quota".into(),
            r#type: Some("insufficient_quota".into()),
            param: None,
            code: Some("insufficient_quota".into()),
        };
        assert!(!classify_error(OpenAIError::ApiError(api)).transient);
    }
}
