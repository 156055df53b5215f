//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the answer-generating LLM.
//! It implements the `AnswerGeneration` port from the `core` crate.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

use docchat_core::ports::{AnswerGeneration, PortError, PortResult};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the provided context to answer \
the user's question. If the context does not contain the answer, say so instead of inventing one.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerGeneration` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`. Every call is bounded by `timeout`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

fn build_user_message(question: &str, context: &str) -> String {
    if context.trim().is_empty() {
        format!("No context documents were retrieved.\n\nQuestion: {question}\n\nAnswer:")
    } else {
        format!("Context:\n{context}\n\nQuestion: {question}\n\nAnswer:")
    }
}

//=========================================================================================
// `AnswerGeneration` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerGeneration for OpenAiChatAdapter {
    /// Answers a user's question based on the retrieved context.
    async fn generate(&self, question: &str, context: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_message(question, context))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API under a deadline and manually map the error if it
        // occurs, which respects the orphan rule.
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Timeout(format!(
                    "Chat completion did not finish within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e: OpenAIError| PortError::Dependency(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Dependency(
                    "Generation provider response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Dependency(
                "Generation provider returned no choices in its response.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_embeds_context_and_question() {
        let msg = build_user_message("what is rust?", "Rust is a language.");
        assert!(msg.contains("Context:\nRust is a language."));
        assert!(msg.contains("Question: what is rust?"));
    }

    #[test]
    fn user_message_notes_missing_context() {
        let msg = build_user_message("what is rust?", "   ");
        assert!(msg.starts_with("No context documents were retrieved."));
    }
}
