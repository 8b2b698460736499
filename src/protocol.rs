//! Wire types shared by the client and the proxy.
//!
//! The client posts a [`ChatRequest`] to the proxy and reads back either a
//! chunked token stream or a single [`ChatResponse`] JSON body. The proxy
//! forwards a [`GenerateRequest`] to the inference backend and reads back
//! newline-delimited [`GenerateRecord`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::conversation::Message;

/// A chat turn request, client to proxy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,

    /// Prior turns, in order. Empty when tracking is disabled.
    #[serde(default)]
    pub conversation_history: Vec<Message>,

    /// Optional system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Optional role the assistant should act as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The model identifier. Validated against the supported set on both
    /// sides of the wire.
    pub model: String,

    /// Generation parameters forwarded to the backend.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub model_parameters: Map<String, Value>,
}

/// The non-streaming reply shape some proxy deployments return.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The complete reply text.
    pub response: String,
}

/// A generation request, proxy to backend.
///
/// Serializes as `{"model", "prompt", ...parameters, "stream"}` with the
/// generation parameters spread beside the fixed fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model identifier.
    pub model: String,

    /// The fully assembled prompt.
    pub prompt: String,

    /// Generation parameters, spread into the top-level object.
    #[serde(flatten)]
    pub parameters: Map<String, Value>,

    /// Always true; the proxy only speaks the streaming protocol.
    pub stream: bool,
}

/// One newline-delimited progress record from the backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateRecord {
    /// The token fragment carried by this record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// True on the final record of a generation.
    #[serde(default)]
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use serde_json::json;

    #[test]
    fn chat_request_omits_empty_optionals() {
        let request = ChatRequest {
            message: "Hello".to_string(),
            conversation_history: Vec::new(),
            system_prompt: None,
            role: None,
            model: "qwen:1.8b".to_string(),
            model_parameters: Map::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "Hello",
                "conversation_history": [],
                "model": "qwen:1.8b",
            })
        );
    }

    #[test]
    fn chat_request_carries_history_and_options() {
        let request = ChatRequest {
            message: "And now?".to_string(),
            conversation_history: vec![
                Message::new(Role::User, "Hello"),
                Message::new(Role::Assistant, "Hi there"),
            ],
            system_prompt: Some("Be terse".to_string()),
            role: Some("comedian".to_string()),
            model: "gemma2:2b".to_string(),
            model_parameters: Map::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["conversation_history"][0]["role"], "user");
        assert_eq!(value["conversation_history"][1]["content"], "Hi there");
        assert_eq!(value["system_prompt"], "Be terse");
        assert_eq!(value["role"], "comedian");
    }

    #[test]
    fn chat_request_defaults_on_minimal_body() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","model":"qwen:1.8b"}"#).unwrap();
        assert!(request.conversation_history.is_empty());
        assert!(request.system_prompt.is_none());
        assert!(request.role.is_none());
        assert!(request.model_parameters.is_empty());
    }

    #[test]
    fn generate_request_spreads_parameters() {
        let mut parameters = Map::new();
        parameters.insert("temperature".to_string(), json!(0.7));
        let request = GenerateRequest {
            model: "qwen:1.8b".to_string(),
            prompt: "User: hi\n".to_string(),
            parameters,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "qwen:1.8b",
                "prompt": "User: hi\n",
                "temperature": 0.7,
                "stream": true,
            })
        );
    }

    #[test]
    fn generate_record_tolerates_missing_fields() {
        let record: GenerateRecord = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(record.response.is_none());
        assert!(record.done);

        let record: GenerateRecord = serde_json::from_str(r#"{"response":"He"}"#).unwrap();
        assert_eq!(record.response.as_deref(), Some("He"));
        assert!(!record.done);
    }
}
