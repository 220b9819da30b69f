// kubeintent-core/src/api.rs

//! Handles interactions with OpenAI-compatible chat-completion APIs.

use anyhow::{anyhow, Context, Result};
use reqwest::{header, Client, Url};
use serde_json::{json, Map, Value};
use tokio::time::Duration;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::models::chat::{ApiResponse, ChatMessage};

const INITIAL_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);
const BACKOFF_FACTOR: f64 = 2.0;

/// Posts `messages` to `endpoint_str` and parses the first response.
///
/// Network errors, HTTP 429 and 5xx responses are retried up to
/// `max_retries` times with exponential backoff; a `retry-after` header (in
/// seconds) overrides the computed delay. Any other non-success status fails
/// immediately.
pub async fn call_chat_completion_api(
    http_client: &Client,
    endpoint_str: &str,
    api_key: &str,
    model_name: &str,
    messages: Vec<ChatMessage>,
    parameters: Option<&toml::Value>,
    max_retries: u32,
) -> Result<ApiResponse> {
    trace!(
        endpoint = %endpoint_str,
        model = %model_name,
        num_messages = messages.len(),
        "Entering call_chat_completion_api"
    );

    let endpoint = Url::parse(endpoint_str)
        .with_context(|| format!("Failed to parse endpoint URL: {}", endpoint_str))?;
    if api_key.is_empty() {
        debug!("API key is empty. API call might fail if endpoint requires authentication.");
    }

    let payload = build_request_payload(model_name, messages, parameters)?;
    if tracing::enabled!(tracing::Level::TRACE) {
        trace!(payload = %serde_json::to_string_pretty(&payload)?, "Full request payload");
    }

    let mut retries = 0;
    let mut current_delay = INITIAL_DELAY;

    loop {
        let mut request = http_client
            .post(endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json");
        if !api_key.is_empty() {
            request = request.bearer_auth(api_key);
        }

        let response = match request.json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if retries < max_retries {
                    retries += 1;
                    warn!(
                        "Network error sending request: {}. Retrying in {:?} (attempt {}/{})",
                        e, current_delay, retries, max_retries
                    );
                    tokio::time::sleep(current_delay).await;
                    current_delay = next_delay(current_delay);
                    continue;
                }
                error!(error = %e, endpoint = %endpoint.as_str(), "Request failed after retries");
                return Err(anyhow!(e)).context(format!(
                    "Network error after {} retries for endpoint: {}",
                    max_retries,
                    endpoint.as_str()
                ));
            }
        };

        let status = response.status();

        if (status.as_u16() == 429 || status.is_server_error()) && retries < max_retries {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            let wait_time = retry_after.unwrap_or(current_delay);
            retries += 1;
            warn!(
                "API request failed with status {}. Retrying in {:?} (attempt {}/{})",
                status, wait_time, retries, max_retries
            );
            tokio::time::sleep(wait_time).await;
            current_delay = next_delay(current_delay);
            continue;
        }

        let response_text = response
            .text()
            .await
            .context("Failed to read API response body")?;

        if !status.is_success() {
            error!(status = %status, response_body = %response_text, "API request failed");
            return Err(anyhow!("API error: {} - {}", status, response_text));
        }

        return parse_response(&response_text);
    }
}

fn next_delay(current: Duration) -> Duration {
    std::cmp::min(
        Duration::from_secs_f64(current.as_secs_f64() * BACKOFF_FACTOR),
        MAX_DELAY,
    )
}

fn build_request_payload(
    model_name: &str,
    messages: Vec<ChatMessage>,
    parameters: Option<&toml::Value>,
) -> Result<Value> {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model_name));
    payload.insert("messages".to_string(), json!(messages));

    if let Some(params_table) = parameters.and_then(|p| p.as_table()) {
        for (key, value) in params_table {
            let json_value: Value = value
                .clone()
                .try_into()
                .with_context(|| format!("Failed to convert TOML parameter '{}' to JSON", key))?;
            payload.insert(key.clone(), json_value);
        }
    }
    Ok(Value::Object(payload))
}

/// Some OpenAI-compatible servers omit `id`; one is generated so the body
/// still deserializes.
fn parse_response(response_text: &str) -> Result<ApiResponse> {
    let response_value: Value =
        serde_json::from_str(response_text).context("Failed to parse API response as JSON")?;

    let mut response_obj = match response_value {
        Value::Object(map) => map,
        other => return Err(anyhow!("API response was not a JSON object: {:?}", other)),
    };

    if !response_obj.contains_key("id") {
        let new_id = format!("chatcmpl-{}", Uuid::new_v4());
        debug!(id = %new_id, "Added missing 'id' field to API response");
        response_obj.insert("id".to_string(), json!(new_id));
    }

    let api_response: ApiResponse = serde_json::from_value(Value::Object(response_obj))
        .context("Failed to deserialize API response")?;
    if api_response.choices.is_empty() {
        warn!("API response contained no choices");
    }
    Ok(api_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You translate requests into kubectl commands."),
            ChatMessage::user("list pods"),
        ]
    }

    #[test]
    fn test_build_request_payload_with_parameters() {
        let mut params = toml::value::Table::new();
        params.insert("temperature".to_string(), toml::Value::Float(0.5));
        let value =
            build_request_payload("gpt-params", messages(), Some(&toml::Value::Table(params)))
                .unwrap();
        assert_eq!(value["model"], json!("gpt-params"));
        assert_eq!(value["messages"], json!(messages()));
        assert_eq!(value["temperature"], json!(0.5));
    }

    #[test]
    fn test_parse_response_adds_missing_id() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"hi"}}]}"#;
        let response = parse_response(body).unwrap();
        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.first_content(), Some("hi"));
    }

    #[tokio::test]
    async fn test_call_chat_completion_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body(json!({"model": "test-model", "messages": messages()}));
                then.status(200).json_body(json!({
                    "id": "chatcmpl-123",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "COMMAND: kubectl get pods -A"},
                        "finish_reason": "stop"
                    }]
                }));
            })
            .await;

        let client = Client::new();
        let result = call_chat_completion_api(
            &client,
            &server.url("/v1/chat/completions"),
            "test-key",
            "test-model",
            messages(),
            None,
            0,
        )
        .await;
        mock.assert_async().await;
        let response = result.unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.first_content(), Some("COMMAND: kubectl get pods -A"));
    }

    #[tokio::test]
    async fn test_call_without_key_sends_no_auth_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions").matches(|req| {
                    !req.headers
                        .as_ref()
                        .map(|h| h.iter().any(|(k, _)| k.eq_ignore_ascii_case("authorization")))
                        .unwrap_or(false)
                });
                then.status(200).json_body(json!({
                    "id": "local",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}}]
                }));
            })
            .await;

        let result = call_chat_completion_api(
            &Client::new(),
            &server.url("/v1/chat/completions"),
            "",
            "llama3",
            messages(),
            None,
            0,
        )
        .await;
        mock.assert_async().await;
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_fails() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503).header("retry-after", "0").body("overloaded");
            })
            .await;

        let result = call_chat_completion_api(
            &Client::new(),
            &server.url("/v1/chat/completions"),
            "k",
            "m",
            messages(),
            None,
            2,
        )
        .await;
        assert_eq!(mock.hits_async().await, 3);
        let err = result.err().unwrap().to_string();
        assert!(err.contains("API error: 503"), "{}", err);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("bad key");
            })
            .await;

        let result = call_chat_completion_api(
            &Client::new(),
            &server.url("/v1/chat/completions"),
            "k",
            "m",
            messages(),
            None,
            3,
        )
        .await;
        assert_eq!(mock.hits_async().await, 1);
        assert!(result.err().unwrap().to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_an_error() {
        let result = call_chat_completion_api(
            &Client::new(),
            "not a url",
            "k",
            "m",
            messages(),
            None,
            0,
        )
        .await;
        assert!(result.is_err());
    }
}
