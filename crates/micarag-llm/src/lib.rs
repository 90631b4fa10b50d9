//! Answer generation: a two-turn chat completion against a local backend.

use anyhow::Result;
use std::sync::Arc;

use micarag_core::config::{LlmProvider, RagSettings};
use micarag_core::traits::ChatModel;
use micarag_core::types::ChatMessage;

pub mod ollama;

pub use ollama::OllamaChat;

/// Send `system` and `user` as exactly two messages and return the reply text.
pub async fn generate(model: &dyn ChatModel, system: &str, user: &str) -> micarag_core::Result<String> {
    let messages = [ChatMessage::system(system), ChatMessage::user(user)];
    model.chat(&messages).await
}

/// Chat backend selected by `llm_provider`.
pub fn build_chat_model(settings: &RagSettings) -> Result<Arc<dyn ChatModel>> {
    match settings.provider()? {
        LlmProvider::Ollama => Ok(Arc::new(OllamaChat::new(
            &settings.ollama_url,
            &settings.ollama_model,
            settings.generation_timeout(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use micarag_core::types::ChatRole;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ChatMessage>>);

    #[async_trait]
    impl ChatModel for Recorder {
        async fn chat(&self, messages: &[ChatMessage]) -> micarag_core::Result<String> {
            self.0.lock().unwrap().extend_from_slice(messages);
            Ok("risposta".into())
        }
    }

    #[tokio::test]
    async fn generate_sends_system_then_user() {
        let model = Recorder::default();
        let out = generate(&model, "rules", "Domanda: x").await.unwrap();
        assert_eq!(out, "risposta");
        let sent = model.0.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, ChatRole::System);
        assert_eq!(sent[0].content, "rules");
        assert_eq!(sent[1].role, ChatRole::User);
        assert_eq!(sent[1].content, "Domanda: x");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = RagSettings { llm_provider: "openai".into(), ..RagSettings::default() };
        assert!(build_chat_model(&settings).is_err());
    }
}
