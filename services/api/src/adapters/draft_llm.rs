//! services/api/src/adapters/draft_llm.rs
//!
//! This module contains the adapter for AI draft answers. It implements the
//! `DraftAnswerService` port from the `core` crate on top of the OpenAI
//! chat-completions streaming API.

const SYSTEM_PROMPT: &str = "You are a helpful assistant that provides informative responses in markdown format. \
Use appropriate markdown syntax for headings, lists, code blocks, and emphasis where necessary. \
For code blocks, use short-form smaller case language identifiers (e.g., 'js' for JavaScript, \
'py' for Python, 'ts' for TypeScript, 'html' for HTML, 'css' for CSS, etc.).";

const USER_PROMPT_TEMPLATE: &str = r#"Generate a markdown-formatted response to the following question: "{question}".

Consider the provided context:
**Context:** {content}

Also, prioritize and incorporate the user's answer when formulating your response:
**User's Answer:** {user_answer}

Prioritize the user's answer only if it's correct. If it's incomplete or incorrect,
improve or correct it while keeping the response concise and to the point.
Provide the final answer in markdown format."#;

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;

use devstack_core::ports::{DraftAnswerService, DraftStream, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DraftAnswerService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiDraftAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    idle_timeout: Duration,
}

impl OpenAiDraftAdapter {
    /// Creates a new `OpenAiDraftAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, idle_timeout: Duration) -> Self {
        Self {
            client,
            model,
            idle_timeout,
        }
    }
}

//=========================================================================================
// `DraftAnswerService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DraftAnswerService for OpenAiDraftAdapter {
    /// Streams a markdown draft answer for the given question.
    async fn draft_answer(
        &self,
        question: &str,
        content: &str,
        user_answer: Option<&str>,
    ) -> PortResult<DraftStream> {
        let user_prompt = USER_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{content}", content)
            .replace("{user_answer}", user_answer.unwrap_or("(none provided)"));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            ])
            .max_tokens(1024u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Apply a bounded idle timeout between chunks; a stalled upstream
        // surfaces as a timeout error and ends the stream.
        let idle_timeout = self.idle_timeout;
        let stream = async_stream::stream! {
            loop {
                match tokio::time::timeout(idle_timeout, upstream.next()).await {
                    Err(_) => {
                        yield Err(PortError::Unexpected(
                            "Draft generation timed out".to_string(),
                        ));
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        break;
                    }
                    Ok(Some(Ok(chunk))) => {
                        if let Some(delta) = chunk
                            .choices
                            .first()
                            .and_then(|choice| choice.delta.content.clone())
                        {
                            if !delta.is_empty() {
                                yield Ok(delta);
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
