//! Reasoning layer: wraps an LLM provider with tool calling support.
//!
//! Provides `respond_with_tools()`, which the agent conversation loop calls
//! once per turn.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, CompletionRequest, LlmProvider, ToolCall, ToolCompletionRequest, ToolDefinition,
};

/// Context for a reasoning operation.
pub struct ReasoningContext {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub metadata: HashMap<String, String>,
}

impl ReasoningContext {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            tools: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Default for ReasoningContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Token usage from one or more LLM calls.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Fold another call's usage into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// Estimated cost given (input, output) per-token prices.
    pub fn cost(&self, (input, output): (Decimal, Decimal)) -> Decimal {
        input * Decimal::from(self.input_tokens) + output * Decimal::from(self.output_tokens)
    }
}

/// Result of a reasoning call: either text or tool calls.
pub enum RespondResult {
    /// The model responded with text.
    Text(String),
    /// The model wants to call tools.
    ToolCalls {
        tool_calls: Vec<ToolCall>,
        /// Optional text content alongside tool calls.
        content: Option<String>,
    },
}

/// Output from a respond_with_tools call.
pub struct RespondOutput {
    pub result: RespondResult,
    pub usage: TokenUsage,
}

/// Reasoning layer that wraps an LLM provider.
pub struct Reasoning {
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
}

impl Reasoning {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Call the LLM with tool definitions, returning either text or tool calls.
    pub async fn respond_with_tools(
        &self,
        context: &ReasoningContext,
    ) -> Result<RespondOutput, LlmError> {
        let mut messages = Vec::new();

        if let Some(ref prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(context.messages.clone());

        // No tools: plain completion
        if context.tools.is_empty() {
            let mut request = CompletionRequest::new(messages);
            request.metadata = context.metadata.clone();
            let response = self.llm.complete(request).await?;
            return Ok(RespondOutput {
                result: RespondResult::Text(response.content),
                usage: TokenUsage {
                    input_tokens: response.input_tokens,
                    output_tokens: response.output_tokens,
                },
            });
        }

        let mut request = ToolCompletionRequest::new(messages, context.tools.clone());
        request.metadata = context.metadata.clone();

        let response = self.llm.complete_with_tools(request).await?;

        let usage = TokenUsage {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        };

        if response.tool_calls.is_empty() {
            Ok(RespondOutput {
                result: RespondResult::Text(response.content.unwrap_or_default()),
                usage,
            })
        } else {
            Ok(RespondOutput {
                result: RespondResult::ToolCalls {
                    tool_calls: response.tool_calls,
                    content: response.content,
                },
                usage,
            })
        }
    }
}
