use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pulsefit_core::ai::AiTask;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ModelClient, ModelError};
use crate::config::LlmConfig;

/// Client for any endpoint speaking the OpenAI `chat/completions` protocol.
///
/// Sends a system message and one user message per call. The session
/// identifier travels in the `user` field so the provider can group calls.
pub struct OpenAiClient {
    http: Client,
    config: LlmConfig,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        tracing::info!(
            base_url = %config.base_url,
            model = %config.model,
            api_key_configured = config.api_key.is_some(),
            "Model client configured"
        );
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, task: &'a AiTask) -> ChatCompletionRequest<'a> {
        let user_content = match &task.image_base64 {
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text { text: &task.prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url(image),
                    },
                },
            ]),
            None => MessageContent::Text(&task.prompt),
        };

        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(task.system_message),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            user: &task.session_id,
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn send(&self, task: &AiTask) -> Result<String, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey)?;

        tracing::debug!(
            task = task.kind.as_str(),
            session_id = %task.session_id,
            prompt_len = task.prompt.len(),
            has_image = task.image_base64.is_some(),
            "Sending prompt to model"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_request(task))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::status(status, &body));
        }

        let completion: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::Decode(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::EmptyCompletion)?;

        tracing::debug!(
            task = task.kind.as_str(),
            completion_len = content.len(),
            "Received model completion"
        );

        Ok(content)
    }
}

/// `data:` URL for a base64 image, with the MIME type sniffed from its
/// leading bytes. Unknown formats are sent as JPEG.
fn image_data_url(image_base64: &str) -> String {
    format!("data:{};base64,{}", sniff_image_mime(image_base64), image_base64)
}

fn sniff_image_mime(image_base64: &str) -> &'static str {
    // 16 base64 chars decode to the first 12 bytes, enough for every signature below.
    let head = image_base64.get(..16).unwrap_or(image_base64);
    let bytes = STANDARD.decode(head).unwrap_or_default();

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsefit_core::prompts;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";

    fn config(base_url: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            model: "gpt-test".to_string(),
        }
    }

    #[test]
    fn sniffs_common_image_formats() {
        assert_eq!(sniff_image_mime(PNG_B64), "image/png");
        assert_eq!(sniff_image_mime(&STANDARD.encode(b"GIF89a......")), "image/gif");
        assert_eq!(sniff_image_mime(&STANDARD.encode(b"RIFF\0\0\0\0WEBPVP8 ")), "image/webp");
        assert_eq!(sniff_image_mime(&STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])), "image/jpeg");
        assert_eq!(sniff_image_mime("%%%"), "image/jpeg");
    }

    #[test]
    fn text_prompt_is_sent_as_plain_content() {
        let client = OpenAiClient::new(config("http://localhost", Some("k")));
        let task = prompts::form_check("Squat", PNG_B64.to_string());
        let mut text_task = task.clone();
        text_task.image_base64 = None;

        let body = serde_json::to_value(client.build_request(&text_task))
            .expect("request should serialize");
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["user"], "form_check");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"].is_string());

        let body = serde_json::to_value(client.build_request(&task))
            .expect("request should serialize");
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            format!("data:image/png;base64,{PNG_B64}")
        );
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-test", "user": "form_check"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"score\": 7}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri(), Some("sk-test")));
        let text = client
            .send(&prompts::form_check("Squat", PNG_B64.to_string()))
            .await
            .expect("completion should succeed");

        assert_eq!(text, "{\"score\": 7}");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri(), Some("sk-test")));
        let err = client
            .send(&prompts::form_check("Squat", PNG_B64.to_string()))
            .await
            .expect_err("429 must fail");

        assert!(matches!(err, ModelError::Status { status: 429, .. }));
        assert_eq!(err.to_string(), "model endpoint returned 429: rate limited");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri(), Some("sk-test")));
        let err = client
            .send(&prompts::form_check("Squat", PNG_B64.to_string()))
            .await
            .expect_err("empty choices must fail");
        assert!(matches!(err, ModelError::EmptyCompletion));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_out() {
        let client = OpenAiClient::new(config("http://127.0.0.1:9", None));
        let err = client
            .send(&prompts::form_check("Squat", PNG_B64.to_string()))
            .await
            .expect_err("missing key must fail");
        assert!(matches!(err, ModelError::MissingApiKey));
    }
}
