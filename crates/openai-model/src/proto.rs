use moodreel_model::ModelRequest;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

/// A streamed event, only the types the provider acts on are decoded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { delta: String },
    #[serde(rename = "response.completed")]
    Completed,
    #[serde(rename = "response.incomplete")]
    Incomplete,
    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: FailedResponse,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FailedResponse {
    pub error: Option<ApiError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// The object the model is asked for in structured output mode.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StructuredAnswer {
    pub title: String,
    pub description: String,
}

impl StructuredAnswer {
    /// Renders the answer as plain text.
    #[inline]
    pub fn flatten(&self) -> String {
        format!("{}\n\n{}", self.title.trim(), self.description.trim())
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputMessage {
    role: &'static str,
    content: String,
}

/// A single message travels as a bare string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Input {
    Text(String),
    Messages(Vec<InputMessage>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TextFormat {
    JsonSchema {
        name: &'static str,
        strict: bool,
        schema: Value,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct TextOptions {
    format: TextFormat,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponsesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    input: Input,
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ResponsesRequest {
    let input = match req.messages.as_slice() {
        [msg] => Input::Text(msg.content().to_owned()),
        messages => Input::Messages(
            messages
                .iter()
                .map(|msg| InputMessage {
                    role: msg.role(),
                    content: msg.content().to_owned(),
                })
                .collect(),
        ),
    };
    ResponsesRequest {
        model: config.model.clone(),
        instructions: req.instructions.clone(),
        input,
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        text: config.structured_output.then(structured_text_options),
        stream: true,
    }
}

fn structured_text_options() -> TextOptions {
    let mut schema = schema_for!(StructuredAnswer).to_value();
    if let Value::Object(map) = &mut schema {
        // The endpoint rejects meta keywords in strict schemas.
        map.remove("$schema");
        map.remove("title");
    }
    TextOptions {
        format: TextFormat::JsonSchema {
            name: "answer_object",
            strict: true,
            schema,
        },
    }
}

#[cfg(test)]
mod tests {
    use moodreel_model::ModelMessage;
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    fn request(messages: Vec<ModelMessage>) -> ModelRequest {
        ModelRequest {
            instructions: Some("You are a film curator.".to_owned()),
            messages,
        }
    }

    #[test]
    fn test_single_message_is_a_bare_string() {
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let req = request(vec![ModelMessage::User("Hello".to_owned())]);
        let body = serde_json::to_value(create_request(&req, &config)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "custom",
                "instructions": "You are a film curator.",
                "input": "Hello",
                "temperature": 0.7f32,
                "max_output_tokens": 512,
                "stream": true,
            })
        );
    }

    #[test]
    fn test_history_is_a_message_list() {
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let req = request(vec![
            ModelMessage::Assistant("Hi!".to_owned()),
            ModelMessage::User("Jazz".to_owned()),
        ]);
        let body = serde_json::to_value(create_request(&req, &config)).unwrap();
        assert_eq!(
            body["input"],
            json!([
                { "role": "assistant", "content": "Hi!" },
                { "role": "user", "content": "Jazz" },
            ])
        );
        assert!(body.get("text").is_none());
    }

    #[test]
    fn test_structured_output_schema() {
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_structured_output(true)
            .build();
        let req = request(vec![ModelMessage::User("Hello".to_owned())]);
        let body = serde_json::to_value(create_request(&req, &config)).unwrap();
        let format = &body["text"]["format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["name"], "answer_object");
        assert_eq!(format["strict"], true);
        assert_eq!(format["schema"]["additionalProperties"], false);
        let required = format["schema"]["required"].as_array().unwrap();
        assert!(required.contains(&json!("title")));
        assert!(required.contains(&json!("description")));
        assert!(format["schema"].get("$schema").is_none());
    }

    #[test]
    fn test_decode_stream_events() {
        let decode = |s: &str| serde_json::from_str::<StreamEvent>(s).unwrap();
        assert_eq!(
            decode(r#"{"type":"response.output_text.delta","item_id":"x","delta":"Hi"}"#),
            StreamEvent::OutputTextDelta {
                delta: "Hi".to_owned()
            }
        );
        assert_eq!(
            decode(r#"{"type":"response.completed","response":{"id":"r"}}"#),
            StreamEvent::Completed
        );
        assert_eq!(
            decode(r#"{"type":"response.in_progress","sequence_number":1}"#),
            StreamEvent::Unknown
        );
        assert_eq!(
            decode(r#"{"type":"error","code":"x","message":"boom"}"#),
            StreamEvent::Error {
                message: "boom".to_owned()
            }
        );
    }
}
