//! OpenAI-compatible model backend.
//!
//! Works with any endpoint exposing `/chat/completions`: OpenAI,
//! OpenRouter, vLLM, Ollama, and friends. Operations are advertised as
//! function tools; the first tool call in a reply becomes the proposed
//! action, a plain text reply becomes the final answer.

use async_trait::async_trait;
use foliant_core::model::{Decision, ModelBackend, ModelRequest};
use foliant_core::operation::OperationDescriptor;
use foliant_core::turn::Turn;
use foliant_core::ModelError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A model backend over an OpenAI-compatible chat endpoint.
pub struct OpenAiCompatModel {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Convert conversation turns to the chat wire format.
    fn to_api_messages(system_prompt: &str, turns: &[Turn]) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage {
            role: "system".into(),
            content: Some(system_prompt.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];

        for turn in turns {
            match turn {
                Turn::User { content, .. } => messages.push(ApiMessage {
                    role: "user".into(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
                Turn::Action {
                    call_id,
                    operation,
                    arguments,
                    ..
                } => messages.push(ApiMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![ApiToolCall {
                        id: call_id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: operation.clone(),
                            arguments: arguments.to_string(),
                        },
                    }]),
                    tool_call_id: None,
                }),
                Turn::Observation {
                    call_id, output, ..
                } => messages.push(ApiMessage {
                    role: "tool".into(),
                    content: Some(output.clone()),
                    tool_calls: None,
                    tool_call_id: Some(call_id.clone()),
                }),
                Turn::Answer { content, .. } => messages.push(ApiMessage {
                    role: "assistant".into(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
            }
        }

        messages
    }

    /// Convert operation descriptors to function-tool definitions.
    fn to_api_tools(operations: &[OperationDescriptor]) -> Vec<ApiToolDefinition> {
        operations
            .iter()
            .map(|op| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: op.name.clone(),
                    description: op.description.clone(),
                    parameters: op.parameters.clone(),
                },
            })
            .collect()
    }

    /// Extract the proposed decision from a completed API response.
    fn decision_from_response(response: ApiResponse) -> Result<Decision, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Malformed("no choices in response".into()))?;

        if let Some(tool_calls) = choice.message.tool_calls
            && let Some(call) = tool_calls.into_iter().next()
        {
            let arguments = serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::json!({}));
            return Ok(Decision::Act {
                operation: call.function.name,
                arguments,
            });
        }

        Ok(Decision::Answer {
            text: choice.message.content.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatModel {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn propose(&self, request: ModelRequest) -> Result<Decision, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.system_prompt, &request.turns),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.operations.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.operations));
        }

        debug!(model = %self.model, turns = request.turns.len(), "Proposing next step");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(ModelError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model endpoint returned error");
            return Err(ModelError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            ModelError::Malformed(format!("failed to parse response: {e}"))
        })?;

        Self::decision_from_response(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
