use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{ChatDefaults, Config};
use crate::error::{ProviderError, RelayError};
use crate::profile::{Profile, Tone};
use crate::provider::{self, LlmProvider};
use crate::types::Message;
use crate::util::preview;

pub const BASE_INSTRUCTION: &str = "You are a helpful AI assistant for Instarep.ly, an AI keyboard that helps creators reply to messages.";

pub const NO_EMOJI_INSTRUCTION: &str = "IMPORTANT: Do NOT use any emojis in your response. Keep all responses text-only without any emoji characters.";

pub const EMOJI_INSTRUCTION: &str = "Feel free to use emojis to make your responses more engaging and expressive.";

pub const EMOJI_DEMO_RESPONSE: &str = "Great question! 😊 I'd be happy to help you with that. Let me provide a comprehensive response that addresses your query. ✨ This is a demo response showing how the emoji toggle works! 🎉";

pub const PLAIN_DEMO_RESPONSE: &str = "Great question! I would be happy to help you with that. Let me provide a comprehensive response that addresses your query. This is a demo response showing how the emoji toggle works when emojis are disabled.";

pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I couldn't generate a response.";

/// Instruction clause for a tone.
pub fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Respond in a professional and business-appropriate manner.",
        Tone::Friendly => "Respond in a warm, friendly, and approachable manner.",
        Tone::Casual => "Respond in a casual and relaxed manner.",
        Tone::Formal => "Respond in a formal and respectful manner.",
    }
}

/// Profile fields as sent by a client.
///
/// Loosely typed: an unknown tone or a non-boolean emoji flag still yields a
/// prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_emojis: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ProfileSnapshot {
    /// Only an explicit `false` turns emojis off.
    pub fn emojis_disabled(&self) -> bool {
        matches!(self.include_emojis, Some(serde_json::Value::Bool(false)))
    }

    /// Loose truthiness of the emoji flag: absent, `null`, `false`, `0` and
    /// `""` are all off.
    pub fn emojis_enabled(&self) -> bool {
        use serde_json::Value;
        match &self.include_emojis {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_) | Value::Object(_)) => true,
        }
    }
}

impl From<&Profile> for ProfileSnapshot {
    fn from(p: &Profile) -> Self {
        Self {
            id: Some(p.id.clone()),
            name: Some(p.name.clone()),
            include_emojis: Some(serde_json::Value::Bool(p.include_emojis)),
            tone: p.tone.map(|t| t.to_string()),
            language: p.language.clone(),
        }
    }
}

/// Build the system instruction for a profile.
pub fn build_system_prompt(profile: Option<&ProfileSnapshot>) -> String {
    let tone = profile
        .and_then(|p| p.tone.as_deref())
        .and_then(Tone::parse_lenient)
        .unwrap_or_default();
    let emoji_clause = if profile.is_some_and(ProfileSnapshot::emojis_disabled) {
        NO_EMOJI_INSTRUCTION
    } else {
        EMOJI_INSTRUCTION
    };
    format!("{} {} {}", BASE_INSTRUCTION, tone_instruction(tone), emoji_clause)
}

/// Canned reply used when no provider credential is configured. Unlike the
/// prompt, the emoji variant needs a truthy flag.
pub fn demo_response(profile: Option<&ProfileSnapshot>) -> &'static str {
    if profile.is_some_and(ProfileSnapshot::emojis_enabled) {
        EMOJI_DEMO_RESPONSE
    } else {
        PLAIN_DEMO_RESPONSE
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub profile: Option<ProfileSnapshot>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, profile: Option<ProfileSnapshot>) -> Self {
        Self {
            message: Some(message.into()),
            profile,
        }
    }
}

/// Settings the reply was generated with, echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub include_emojis: serde_json::Value,
    pub tone: String,
}

impl ProfileSettings {
    fn from_snapshot(profile: Option<&ProfileSnapshot>) -> Self {
        Self {
            include_emojis: profile
                .and_then(|p| p.include_emojis.clone())
                .unwrap_or(serde_json::Value::Bool(true)),
            tone: profile
                .and_then(|p| p.tone.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| Tone::default().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub is_demo: bool,
    pub profile_settings: ProfileSettings,
}

/// Forwards a chat message plus profile-derived instruction to the
/// completion provider, or answers from the demo script without one.
pub struct ChatRelay {
    provider: Option<Arc<dyn LlmProvider>>,
    params: ChatDefaults,
}

impl ChatRelay {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, params: ChatDefaults) -> Self {
        Self { provider, params }
    }

    pub fn from_config(config: &Config) -> Self {
        let provider = config.openai_api_key().map(|key| {
            Arc::from(provider::create_provider(
                key,
                config.providers.openai.api_base.as_deref(),
            )) as Arc<dyn LlmProvider>
        });
        Self::new(provider, config.chat.clone())
    }

    /// True when replies come from the demo script.
    pub fn is_demo(&self) -> bool {
        self.provider.is_none()
    }

    pub async fn handle(&self, req: ChatRequest) -> Result<ChatResponse, RelayError> {
        let message = match req.message {
            Some(m) if !m.is_empty() => m,
            _ => return Err(RelayError::Validation("Message is required".to_string())),
        };
        let profile = req.profile.as_ref();

        info!("Chat request: message={}", preview(&message, 80));

        let system_prompt = build_system_prompt(profile);
        let profile_settings = ProfileSettings::from_snapshot(profile);

        let Some(provider) = &self.provider else {
            debug!("No completion credential configured, answering in demo mode");
            return Ok(ChatResponse {
                response: demo_response(profile).to_string(),
                is_demo: true,
                profile_settings,
            });
        };

        let messages = [Message::system(system_prompt), Message::user(message)];
        let completion = provider
            .chat(
                &messages,
                &self.params.model,
                self.params.max_tokens,
                self.params.temperature,
            )
            .await
            .map_err(|e| match e {
                ProviderError::Api { status, message } => {
                    error!("Completion API error ({}): {}", status, message);
                    RelayError::Upstream {
                        status: 500,
                        message: "Failed to generate response".to_string(),
                    }
                }
                other => {
                    error!("Error in chat relay: {}", other);
                    RelayError::Internal("Internal server error".to_string())
                }
            })?;

        debug!(
            "Completion finished: {:?}, {} tokens",
            completion.finish_reason, completion.usage.total_tokens
        );

        let response = completion
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string());

        Ok(ChatResponse {
            response,
            is_demo: false,
            profile_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionResponse, FinishReason, Role, TokenUsage};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    enum Reply {
        Content(Option<String>),
        Status(u16),
        Malformed,
    }

    /// Provider double that records every request it receives.
    struct FakeProvider {
        reply: Reply,
        seen: Mutex<Vec<(Vec<Message>, String, u32, f64)>>,
    }

    impl FakeProvider {
        fn with(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn replying(content: Option<&str>) -> Arc<Self> {
            Self::with(Reply::Content(content.map(|s| s.to_string())))
        }

        fn failing(status: u16) -> Arc<Self> {
            Self::with(Reply::Status(status))
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        async fn chat(
            &self,
            messages: &[Message],
            model: &str,
            max_tokens: u32,
            temperature: f64,
        ) -> Result<CompletionResponse, ProviderError> {
            self.seen.lock().unwrap().push((
                messages.to_vec(),
                model.to_string(),
                max_tokens,
                temperature,
            ));
            match &self.reply {
                Reply::Content(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    finish_reason: FinishReason::Stop,
                    usage: TokenUsage::default(),
                }),
                Reply::Status(status) => Err(ProviderError::Api {
                    status: *status,
                    message: "quota exceeded".to_string(),
                }),
                Reply::Malformed => Err(ProviderError::Parse("No choices in response".to_string())),
            }
        }
    }

    fn snapshot(value: serde_json::Value) -> ProfileSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn demo_relay() -> ChatRelay {
        ChatRelay::new(None, ChatDefaults::default())
    }

    #[test]
    fn test_emoji_clause_only_off_for_explicit_false() {
        let off = build_system_prompt(Some(&snapshot(json!({"includeEmojis": false}))));
        assert!(off.contains(NO_EMOJI_INSTRUCTION));
        assert!(!off.contains(EMOJI_INSTRUCTION));

        for value in [json!({"includeEmojis": true}), json!({}), json!({"includeEmojis": "no"}), json!({"includeEmojis": 0})] {
            let prompt = build_system_prompt(Some(&snapshot(value)));
            assert!(prompt.contains(EMOJI_INSTRUCTION));
            assert!(!prompt.contains(NO_EMOJI_INSTRUCTION));
        }

        let absent = build_system_prompt(None);
        assert!(absent.contains(EMOJI_INSTRUCTION));
    }

    #[test]
    fn test_tone_clause_selection() {
        for tone in Tone::ALL {
            let prompt = build_system_prompt(Some(&snapshot(json!({"tone": tone.as_str()}))));
            assert!(prompt.contains(tone_instruction(tone)));
        }

        let friendly = tone_instruction(Tone::Friendly);
        for value in [json!({"tone": "sarcastic"}), json!({}), json!({"tone": ""})] {
            assert!(build_system_prompt(Some(&snapshot(value))).contains(friendly));
        }
        assert!(build_system_prompt(None).contains(friendly));
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_system_prompt(Some(&snapshot(json!({"tone": "formal", "includeEmojis": false}))));
        assert_eq!(
            prompt,
            format!(
                "{} {} {}",
                BASE_INSTRUCTION,
                "Respond in a formal and respectful manner.",
                NO_EMOJI_INSTRUCTION
            )
        );
    }

    #[test]
    fn test_snapshot_from_profile() {
        let snap = ProfileSnapshot::from(&Profile::default_profile());
        assert_eq!(snap.include_emojis, Some(json!(true)));
        assert_eq!(snap.tone.as_deref(), Some("friendly"));
        assert!(!snap.emojis_disabled());
    }

    #[tokio::test]
    async fn test_missing_message_is_validation_error() {
        let relay = demo_relay();
        let err = relay.handle(ChatRequest::default()).await.unwrap_err();
        assert_eq!(err, RelayError::Validation("Message is required".to_string()));

        let err = relay.handle(ChatRequest::new("", None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_demo_mode_with_emojis() {
        let relay = demo_relay();
        assert!(relay.is_demo());
        let resp = relay
            .handle(ChatRequest::new("hi", Some(snapshot(json!({"includeEmojis": true})))))
            .await
            .unwrap();
        assert_eq!(resp.response, EMOJI_DEMO_RESPONSE);
        assert!(resp.is_demo);
        assert_eq!(resp.profile_settings.include_emojis, json!(true));
        assert_eq!(resp.profile_settings.tone, "friendly");
    }

    #[test]
    fn test_demo_variant_needs_truthy_flag() {
        assert_eq!(demo_response(None), PLAIN_DEMO_RESPONSE);
        for value in [
            json!({}),
            json!({"includeEmojis": null}),
            json!({"includeEmojis": 0}),
            json!({"includeEmojis": ""}),
            json!({"includeEmojis": false}),
        ] {
            assert_eq!(demo_response(Some(&snapshot(value))), PLAIN_DEMO_RESPONSE);
        }
        for value in [
            json!({"includeEmojis": true}),
            json!({"includeEmojis": 1}),
            json!({"includeEmojis": "no"}),
        ] {
            assert_eq!(demo_response(Some(&snapshot(value))), EMOJI_DEMO_RESPONSE);
        }
    }

    #[tokio::test]
    async fn test_demo_mode_without_profile() {
        let resp = demo_relay().handle(ChatRequest::new("hi", None)).await.unwrap();
        assert_eq!(resp.response, PLAIN_DEMO_RESPONSE);
        assert!(resp.is_demo);
        assert_eq!(resp.profile_settings.include_emojis, json!(true));
        assert_eq!(resp.profile_settings.tone, "friendly");
    }

    #[tokio::test]
    async fn test_demo_mode_without_emojis() {
        let resp = demo_relay()
            .handle(ChatRequest::new(
                "hi",
                Some(snapshot(json!({"includeEmojis": false, "tone": "casual"}))),
            ))
            .await
            .unwrap();
        assert_eq!(resp.response, PLAIN_DEMO_RESPONSE);
        assert_eq!(resp.profile_settings.include_emojis, json!(false));
        assert_eq!(resp.profile_settings.tone, "casual");
    }

    #[tokio::test]
    async fn test_provider_receives_prompt_and_fixed_parameters() {
        let provider = FakeProvider::replying(Some("Sure thing"));
        let relay = ChatRelay::new(Some(provider.clone()), ChatDefaults::default());

        let resp = relay
            .handle(ChatRequest::new(
                "Reply to my fan",
                Some(snapshot(json!({"tone": "professional", "includeEmojis": false}))),
            ))
            .await
            .unwrap();
        assert_eq!(resp.response, "Sure thing");
        assert!(!resp.is_demo);

        let seen = provider.seen.lock().unwrap();
        let (messages, model, max_tokens, temperature) = &seen[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains(tone_instruction(Tone::Professional)));
        assert!(messages[0].content.contains(NO_EMOJI_INSTRUCTION));
        assert_eq!(messages[1], Message::user("Reply to my fan"));
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(*max_tokens, 500);
        assert_eq!(*temperature, 0.7);
    }

    #[tokio::test]
    async fn test_empty_provider_reply_uses_fallback() {
        let relay = ChatRelay::new(Some(FakeProvider::replying(None)), ChatDefaults::default());
        let resp = relay.handle(ChatRequest::new("hi", None)).await.unwrap();
        assert_eq!(resp.response, EMPTY_REPLY_FALLBACK);

        let relay = ChatRelay::new(Some(FakeProvider::replying(Some(""))), ChatDefaults::default());
        let resp = relay.handle(ChatRequest::new("hi", None)).await.unwrap();
        assert_eq!(resp.response, EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream_error() {
        let provider = FakeProvider::failing(429);
        let relay = ChatRelay::new(Some(provider.clone()), ChatDefaults::default());
        let err = relay.handle(ChatRequest::new("hi", None)).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Failed to generate response");
        assert!(!err.message().contains("quota"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_provider_reply_is_internal_error() {
        let provider = FakeProvider::with(Reply::Malformed);
        let relay = ChatRelay::new(Some(provider.clone()), ChatDefaults::default());
        let err = relay.handle(ChatRequest::new("hi", None)).await.unwrap_err();
        assert_eq!(err, RelayError::Internal("Internal server error".to_string()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_provider_call() {
        let provider = FakeProvider::replying(Some("unused"));
        let relay = ChatRelay::new(Some(provider.clone()), ChatDefaults::default());
        assert!(relay.handle(ChatRequest::default()).await.is_err());
        assert_eq!(provider.calls(), 0);
    }
}
