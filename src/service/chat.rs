//! AI scene generation
//!
//! The chat endpoint takes `{messages, model, max_tokens}` and answers
//! `{type: "success", content}` or `{type: "error", error}`. The scene is
//! pulled out of the free-form `content` with [`extract_scene`].

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::configuration::config::SceneConfig;
use crate::error::{ChatError, ConfigError};

/// Environment variable holding the chat endpoint URL
pub const CHAT_URL_VAR: &str = "PHYSIM_CHAT_URL";

pub const CHAT_MODEL: &str = "gpt-5-mini";
const MAX_TOKENS: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Messages for a new scene, or for an edit of `existing`
pub fn scene_request(prompt: &str, existing: Option<&SceneConfig>) -> Result<Vec<ChatMessage>, ConfigError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(scene) = existing {
        messages.push(ChatMessage::user(format!(
            "I want to edit this simulation. Current JSON: {}",
            scene.to_json_pretty()?
        )));
    }
    messages.push(ChatMessage::user(prompt));
    Ok(messages)
}

pub trait ChatClient {
    /// Send the conversation, return the assistant's text
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ChatReply {
    Success { content: String },
    Error { error: String },
}

pub struct HttpChatClient {
    url: String,
    agent: ureq::Agent,
}

impl HttpChatClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: ureq::Agent::new(),
        }
    }

    /// Endpoint from `PHYSIM_CHAT_URL`
    pub fn from_env() -> Result<Self, ChatError> {
        let url = std::env::var(CHAT_URL_VAR).map_err(|_| ChatError::MissingEndpoint(CHAT_URL_VAR))?;
        Ok(Self::new(url))
    }
}

impl ChatClient for HttpChatClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        info!("chat request to {} ({} messages)", self.url, messages.len());
        let reply: ChatReply = self
            .agent
            .post(&self.url)
            .send_json(json!({
                "messages": messages,
                "model": CHAT_MODEL,
                "max_tokens": MAX_TOKENS,
            }))
            .map_err(Box::new)?
            .into_json()?;
        match reply {
            ChatReply::Success { content } => Ok(content),
            ChatReply::Error { error } => Err(ChatError::Remote(error)),
        }
    }
}

/// The scene object embedded in free text: everything from the first `{`
/// to the last `}`, which must carry `title` and `objects`
pub fn extract_scene(text: &str) -> Result<SceneConfig, ConfigError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ConfigError::NotAScene);
    };
    if end < start {
        return Err(ConfigError::NotAScene);
    }
    let candidate = &text[start..=end];
    let value: Value = serde_json::from_str(candidate)?;
    if value.get("title").is_none() || value.get("objects").is_none() {
        return Err(ConfigError::NotAScene);
    }
    debug!("extracted {} bytes of scene JSON", candidate.len());
    SceneConfig::from_json_str(candidate)
}

/// Ask `client` for a scene and parse the answer
pub fn generate_scene(
    client: &dyn ChatClient,
    prompt: &str,
    existing: Option<&SceneConfig>,
) -> Result<SceneConfig, ChatError> {
    let messages = scene_request(prompt, existing)?;
    let reply = client.complete(&messages)?;
    Ok(extract_scene(&reply)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl ChatClient for Canned {
        fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ChatError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn scene_is_found_inside_prose() {
        let text = r#"Sure! Here it is: {"title": "Drop", "objects": []} Enjoy."#;
        assert_eq!(extract_scene(text).unwrap().title, "Drop");
    }

    #[test]
    fn json_without_scene_fields_is_rejected() {
        assert!(matches!(extract_scene(r#"{"foo": 1}"#), Err(ConfigError::NotAScene)));
        assert!(matches!(extract_scene("no braces here"), Err(ConfigError::NotAScene)));
        assert!(matches!(extract_scene("} backwards {"), Err(ConfigError::NotAScene)));
    }

    #[test]
    fn edit_requests_carry_the_current_scene() {
        let scene = SceneConfig::new("Drop");
        let messages = scene_request("make it bouncier", Some(&scene)).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("\"title\": \"Drop\""));
        assert_eq!(messages[1].content, "make it bouncier");
    }

    #[test]
    fn generate_parses_the_reply() {
        let client = Canned(r#"```json
{"title": "Ramp", "objects": []}
```"#);
        assert_eq!(generate_scene(&client, "a ramp", None).unwrap().title, "Ramp");
    }
}
