//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.
//!
//! System messages become the rig preamble, the last message is the prompt
//! and everything in between is chat history. Tool results travel back as
//! user-side `tool_result` content keyed by the originating call id.

use async_trait::async_trait;
use rig::OneOrMany;
use rig::completion::{AssistantContent, CompletionModel, Message};
use rig::message::{ToolResultContent, UserContent};
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
    ToolCall, ToolCompletionRequest, ToolCompletionResponse, ToolDefinition,
};

const PROVIDER: &str = "rig";

/// Wraps any rig completion model as an [`LlmProvider`].
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<ModelTurn, LlmError> {
        let prepared = prepare_messages(messages)?;

        let mut builder = self
            .model
            .completion_request(prepared.prompt)
            .messages(prepared.history);
        if let Some(preamble) = prepared.preamble {
            builder = builder.preamble(preamble);
        }
        if !tools.is_empty() {
            builder = builder.tools(tools.iter().map(to_rig_tool).collect());
        }
        if let Some(temperature) = temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        let mut turn = collect_choice(&response.choice);
        turn.input_tokens = saturating_u32(response.usage.input_tokens);
        turn.output_tokens = saturating_u32(response.usage.output_tokens);
        Ok(turn)
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        // Self-hosted proxies do not bill per token.
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let turn = self
            .send(
                &request.messages,
                &[],
                request.max_tokens,
                request.temperature,
            )
            .await?;

        Ok(CompletionResponse {
            content: turn.text.unwrap_or_default(),
            input_tokens: turn.input_tokens,
            output_tokens: turn.output_tokens,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        tracing::debug!(
            model = %self.model_name,
            agent = request.metadata.get("agent").map(String::as_str).unwrap_or(""),
            run = request.metadata.get("run_id").map(String::as_str).unwrap_or(""),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending tool completion request"
        );

        let turn = self
            .send(
                &request.messages,
                &request.tools,
                request.max_tokens,
                request.temperature,
            )
            .await?;

        let finish_reason = if turn.tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolUse
        };
        Ok(ToolCompletionResponse {
            content: turn.text,
            tool_calls: turn.tool_calls,
            input_tokens: turn.input_tokens,
            output_tokens: turn.output_tokens,
            finish_reason,
            response_id: None,
        })
    }
}

/// Our conversation split into rig's request shape.
struct PreparedMessages {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: Message,
}

/// One model reply, flattened.
#[derive(Debug, Default)]
struct ModelTurn {
    text: Option<String>,
    tool_calls: Vec<ToolCall>,
    input_tokens: u32,
    output_tokens: u32,
}

fn prepare_messages(messages: &[ChatMessage]) -> Result<PreparedMessages, LlmError> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

    let mut history = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(to_rig_message)
        .collect::<Result<Vec<_>, _>>()?;

    let prompt = history.pop().ok_or_else(|| LlmError::InvalidResponse {
        provider: PROVIDER.to_string(),
        reason: "request has no user or tool messages".to_string(),
    })?;

    Ok(PreparedMessages {
        preamble,
        history,
        prompt,
    })
}

fn to_rig_message(message: &ChatMessage) -> Result<Message, LlmError> {
    match message.role {
        Role::Tool => {
            let call_id = message.tool_call_id.clone().unwrap_or_default();
            Ok(Message::User {
                content: OneOrMany::one(UserContent::tool_result(
                    call_id,
                    OneOrMany::one(ToolResultContent::text(message.content.clone())),
                )),
            })
        }
        Role::Assistant if !message.tool_calls.is_empty() => {
            let mut content = Vec::with_capacity(message.tool_calls.len() + 1);
            if !message.content.is_empty() {
                content.push(AssistantContent::text(message.content.clone()));
            }
            content.extend(message.tool_calls.iter().map(|tc| {
                AssistantContent::tool_call(tc.id.clone(), tc.name.clone(), tc.arguments.clone())
            }));
            let content = OneOrMany::many(content).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Message::Assistant { id: None, content })
        }
        Role::Assistant => Ok(Message::assistant(message.content.clone())),
        Role::User | Role::System => Ok(Message::user(message.content.clone())),
    }
}

fn to_rig_tool(tool: &ToolDefinition) -> rig::completion::ToolDefinition {
    rig::completion::ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    }
}

fn collect_choice(choice: &OneOrMany<AssistantContent>) -> ModelTurn {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();
    for content in choice.iter() {
        match content {
            AssistantContent::Text(t) => text.push(t.text.clone()),
            AssistantContent::ToolCall(tc) => tool_calls.push(ToolCall {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: tc.function.arguments.clone(),
            }),
            _ => {}
        }
    }
    ModelTurn {
        text: (!text.is_empty()).then(|| text.join("")),
        tool_calls,
        ..ModelTurn::default()
    }
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_messages_become_preamble_and_last_message_is_prompt() {
        let messages = vec![
            ChatMessage::system("You verify users."),
            ChatMessage::user("Verify user 4."),
            ChatMessage::assistant_with_tool_calls(
                None,
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "verify_user_trust".into(),
                    arguments: json!({"user_id": 4}),
                }],
            ),
            ChatMessage::tool_result("call_1", "verify_user_trust", r#"{"status":"VERIFIED"}"#),
        ];

        let prepared = prepare_messages(&messages).unwrap();
        assert_eq!(prepared.preamble.as_deref(), Some("You verify users."));
        assert_eq!(prepared.history.len(), 2);
        assert!(matches!(prepared.history[1], Message::Assistant { .. }));
        assert!(matches!(prepared.prompt, Message::User { .. }));
    }

    #[test]
    fn empty_conversation_is_rejected() {
        let result = prepare_messages(&[ChatMessage::system("only a preamble")]);
        assert!(matches!(result, Err(LlmError::InvalidResponse { .. })));
    }

    #[test]
    fn reply_text_and_tool_calls_are_split() {
        let choice = OneOrMany::many(vec![
            AssistantContent::text("Checking. "),
            AssistantContent::tool_call(
                "call_9",
                "find_potential_mentors",
                json!({"skill_name": "Rust"}),
            ),
        ])
        .unwrap();

        let turn = collect_choice(&choice);
        assert_eq!(turn.text.as_deref(), Some("Checking. "));
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].id, "call_9");
        assert_eq!(turn.tool_calls[0].name, "find_potential_mentors");
        assert_eq!(turn.tool_calls[0].arguments["skill_name"], "Rust");
    }

    #[test]
    fn text_only_reply_has_no_tool_calls() {
        let turn = collect_choice(&OneOrMany::one(AssistantContent::text("VERIFIED")));
        assert_eq!(turn.text.as_deref(), Some("VERIFIED"));
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn token_counts_saturate() {
        assert_eq!(saturating_u32(12), 12);
        assert_eq!(saturating_u32(u64::MAX), u32::MAX);
    }
}
