use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::review::{
    ReviewBackend, ReviewMode, SYSTEM_PROMPT, Verdict, build_prompt, parse_prefixed_verdict,
};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for the OpenAI chat-completions API.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchema,
}

#[derive(Debug, Serialize)]
pub struct JsonSchema {
    pub name: String,
    pub strict: bool,
    pub schema: Schema,
}

#[derive(Debug, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: SchemaProperties,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Debug, Serialize)]
pub struct SchemaProperties {
    pub passed: SchemaProperty,
    pub review: SchemaProperty,
    pub improvements: SchemaProperty,
}

#[derive(Debug, Serialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub property_type: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Shape of the schema-constrained review answer.
#[derive(Debug, Deserialize)]
struct StructuredReview {
    passed: bool,
    review: String,
    improvements: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("emojigate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
        }
    }

    /// Response format constraining the model to the verdict schema.
    pub fn create_response_format() -> ResponseFormat {
        ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchema {
                name: "cheerfulness_review".to_string(),
                strict: true,
                schema: Schema {
                    schema_type: "object".to_string(),
                    properties: SchemaProperties {
                        passed: SchemaProperty {
                            property_type: serde_json::json!("boolean"),
                        },
                        review: SchemaProperty {
                            property_type: serde_json::json!("string"),
                        },
                        // Nullable rather than omittable: strict schemas
                        // require every property to be listed in `required`.
                        improvements: SchemaProperty {
                            property_type: serde_json::json!(["string", "null"]),
                        },
                    },
                    required: vec![
                        "passed".to_string(),
                        "review".to_string(),
                        "improvements".to_string(),
                    ],
                    additional_properties: false,
                },
            },
        }
    }

    async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            return Err(anyhow!("OpenAI API error: {} - {}", status, error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat completion response contained no message content"))
    }

    fn build_request(&self, mode: ReviewMode, diff: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(diff),
                },
            ],
            response_format: match mode {
                ReviewMode::FreeText => None,
                ReviewMode::Structured => Some(Self::create_response_format()),
            },
        }
    }
}

#[async_trait]
impl ReviewBackend for OpenAiClient {
    async fn request_review(&self, mode: ReviewMode, diff: &str) -> Result<Verdict> {
        let request = self.build_request(mode, diff);
        let content = self.chat_completion(&request).await?;
        info!("LLM response: {content}");

        match mode {
            ReviewMode::FreeText => Ok(parse_prefixed_verdict(&content)),
            ReviewMode::Structured => {
                let review: StructuredReview = serde_json::from_str(&content)
                    .context("Failed to parse structured review response")?;
                Ok(Verdict {
                    passed: review.passed,
                    message: review.review,
                    improvements: review.improvements.filter(|text| !text.is_empty()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_format_schema_consistency() {
        // Property names in the schema must match the required array.
        let response_format = OpenAiClient::create_response_format();
        let schema = response_format.json_schema.schema;

        let schema_json = serde_json::to_value(&schema).expect("Failed to serialize schema");
        let properties = schema_json["properties"]
            .as_object()
            .expect("Properties should be an object");

        for required_field in &schema.required {
            assert!(
                properties.contains_key(required_field),
                "Required field '{}' not found in properties. Available properties: {:?}",
                required_field,
                properties.keys().collect::<Vec<_>>()
            );
        }

        assert_eq!(schema_json["additionalProperties"], false);
        assert_eq!(schema_json["properties"]["passed"]["type"], "boolean");
        assert_eq!(
            schema_json["properties"]["improvements"]["type"],
            serde_json::json!(["string", "null"])
        );
    }

    #[test]
    fn free_text_request_has_no_response_format() {
        let client = OpenAiClient::new("sk-test".to_string(), "gpt-4o".to_string());
        let request = client.build_request(ReviewMode::FreeText, "+code");
        assert!(request.response_format.is_none());

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn structured_request_constrains_the_response() {
        let client = OpenAiClient::new("sk-test".to_string(), "gpt-4o".to_string());
        let request = client.build_request(ReviewMode::Structured, "+code");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn structured_review_deserializes_with_and_without_improvements() {
        let with: StructuredReview =
            serde_json::from_str(r#"{"passed":false,"review":"...","improvements":"add 🎉"}"#)
                .unwrap();
        assert!(!with.passed);
        assert_eq!(with.improvements.as_deref(), Some("add 🎉"));

        let without: StructuredReview =
            serde_json::from_str(r#"{"passed":true,"review":"Great job!","improvements":null}"#)
                .unwrap();
        assert!(without.passed);
        assert!(without.improvements.is_none());
    }
}
