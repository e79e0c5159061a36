//! One agent conversation: a directive, a scoped tool set and a tool loop.
//!
//! The model is prompted with the directive and may call the tools it was
//! granted any number of times. The conversation ends at the first reply
//! without tool calls, whose text is the final message.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::personas::AgentPersona;
use crate::context::RunContext;
use crate::error::LlmError;
use crate::llm::{
    ChatMessage, LlmProvider, Reasoning, ReasoningContext, RespondResult, TokenUsage,
};
use crate::tools::ToolSet;

/// A tool call made during a conversation and what it returned.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
    /// Serialized tool output, or the error text fed back to the model.
    pub output: Result<String, String>,
}

/// Everything a finished conversation produced.
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    /// Text of the agent's last reply. Empty when the turn limit was hit.
    pub final_message: String,
    pub messages: Vec<ChatMessage>,
    pub tool_invocations: Vec<ToolInvocation>,
    pub usage: TokenUsage,
}

impl ConversationOutcome {
    /// Successful outputs of every call to `tool`, in call order.
    pub fn outputs_of<'a>(&'a self, tool: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tool_invocations
            .iter()
            .filter(move |inv| inv.name == tool)
            .filter_map(|inv| inv.output.as_deref().ok())
    }
}

/// Drives a single persona through its tool loop.
pub struct AgentConversation {
    reasoning: Reasoning,
    tools: ToolSet,
    ctx: RunContext,
    max_turns: usize,
}

impl AgentConversation {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        persona: &AgentPersona,
        tools: ToolSet,
        max_turns: usize,
    ) -> Self {
        Self {
            reasoning: Reasoning::new(llm).with_system_prompt(persona.system_prompt),
            tools,
            ctx: RunContext::new(persona.name),
            max_turns: max_turns.max(1),
        }
    }

    /// Bind the conversation to one mentorship session. Tools that act on a
    /// session only accept this id.
    pub fn with_session(mut self, session_id: i64) -> Self {
        self.ctx = self.ctx.with_session(session_id);
        self
    }

    fn request_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::from([
            ("agent".to_string(), self.ctx.agent.clone()),
            ("run_id".to_string(), self.ctx.run_id.to_string()),
        ]);
        if let Some(session_id) = self.ctx.session_id {
            metadata.insert("session_id".to_string(), session_id.to_string());
        }
        metadata
    }

    fn finish(
        &self,
        final_message: String,
        messages: Vec<ChatMessage>,
        tool_invocations: Vec<ToolInvocation>,
        usage: TokenUsage,
    ) -> ConversationOutcome {
        let cost = usage.cost(self.reasoning.llm().cost_per_token());
        tracing::debug!(
            run = %self.ctx.run_id,
            agent = %self.ctx.agent,
            tokens = usage.total(),
            %cost,
            "Conversation finished"
        );
        ConversationOutcome {
            final_message,
            messages,
            tool_invocations,
            usage,
        }
    }

    /// Run the conversation to its final message.
    ///
    /// Tool failures are reported back to the model, not returned. Only
    /// oracle errors end the conversation early.
    pub async fn run(&self, directive: &str) -> Result<ConversationOutcome, LlmError> {
        let mut messages = vec![ChatMessage::user(directive)];
        let mut tool_invocations = Vec::new();
        let mut usage = TokenUsage::default();
        let definitions = self.tools.definitions();
        let metadata = self.request_metadata();
        tracing::debug!(
            run = %self.ctx.run_id,
            agent = %self.ctx.agent,
            tools = ?self.tools.names(),
            "Conversation started"
        );

        for turn in 1..=self.max_turns {
            let reason_ctx = ReasoningContext::new()
                .with_messages(messages.clone())
                .with_tools(definitions.clone())
                .with_metadata(metadata.clone());

            let output = self.reasoning.respond_with_tools(&reason_ctx).await?;
            usage.add(&output.usage);

            match output.result {
                RespondResult::Text(text) => {
                    tracing::debug!(
                        run = %self.ctx.run_id,
                        agent = %self.ctx.agent,
                        turn,
                        "Agent replied"
                    );
                    messages.push(ChatMessage::assistant(&text));
                    return Ok(self.finish(text, messages, tool_invocations, usage));
                }
                RespondResult::ToolCalls {
                    tool_calls,
                    content,
                } => {
                    tracing::debug!(
                        run = %self.ctx.run_id,
                        agent = %self.ctx.agent,
                        turn,
                        calls = tool_calls.len(),
                        "Agent requested tools"
                    );
                    messages.push(ChatMessage::assistant_with_tool_calls(
                        content,
                        tool_calls.clone(),
                    ));

                    for tc in tool_calls {
                        let result = self
                            .tools
                            .execute(&tc.name, &tc.arguments, &self.ctx)
                            .await
                            .map_err(|e| e.to_string());

                        let content = match &result {
                            Ok(output) => output.clone(),
                            Err(e) => {
                                tracing::warn!(
                                    agent = %self.ctx.agent,
                                    tool = %tc.name,
                                    "Tool call failed: {e}"
                                );
                                format!("Error: {e}")
                            }
                        };
                        messages.push(ChatMessage::tool_result(&tc.id, &tc.name, content));
                        tool_invocations.push(ToolInvocation {
                            name: tc.name,
                            arguments: tc.arguments,
                            output: result,
                        });
                    }
                }
            }
        }

        tracing::warn!(
            run = %self.ctx.run_id,
            agent = %self.ctx.agent,
            max_turns = self.max_turns,
            "Agent did not finish within the turn limit"
        );
        Ok(self.finish(String::new(), messages, tool_invocations, usage))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::llm::{
        CompletionRequest, CompletionResponse, FinishReason, ToolCall, ToolCompletionRequest,
        ToolCompletionResponse,
    };
    use crate::tools::{Tool, ToolError, ToolOutput, ToolRegistry};

    /// One scripted model reply.
    pub(crate) enum Scripted {
        Text(String),
        Call(&'static str, serde_json::Value),
        Fail,
    }

    /// Provider that replays a fixed script and records what it was sent.
    pub(crate) struct ScriptedLlm {
        script: Mutex<VecDeque<Scripted>>,
        pub(crate) requests: Mutex<Vec<ToolCompletionRequest>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn next(&self) -> Option<Scripted> {
            self.script.lock().unwrap().pop_front()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match self.next() {
                Some(Scripted::Text(content)) => Ok(CompletionResponse {
                    content,
                    input_tokens: 1,
                    output_tokens: 1,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                _ => Err(LlmError::RequestFailed {
                    provider: "scripted".into(),
                    reason: "script exhausted".into(),
                }),
            }
        }

        async fn complete_with_tools(
            &self,
            request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            let turn = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request);
                requests.len()
            };
            match self.next() {
                Some(Scripted::Text(content)) => Ok(ToolCompletionResponse {
                    content: Some(content),
                    tool_calls: vec![],
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Some(Scripted::Call(name, arguments)) => Ok(ToolCompletionResponse {
                    content: None,
                    tool_calls: vec![ToolCall {
                        id: format!("call_{turn}"),
                        name: name.to_string(),
                        arguments,
                    }],
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::ToolUse,
                    response_id: None,
                }),
                Some(Scripted::Fail) | None => Err(LlmError::RequestFailed {
                    provider: "scripted".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(
            &self,
            params: serde_json::Value,
            _ctx: &RunContext,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(params, Duration::from_millis(1)))
        }
    }

    const ECHO_AGENT: AgentPersona = AgentPersona {
        name: "echo_agent",
        system_prompt: "Use echo.",
        tools: &["echo"],
    };

    async fn echo_tools() -> ToolSet {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;
        registry.scoped(ECHO_AGENT.tools).await
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_before_final_reply() {
        let llm = ScriptedLlm::new(vec![
            Scripted::Call("echo", serde_json::json!({"x": 1})),
            Scripted::Text("done".into()),
        ]);
        let conversation = AgentConversation::new(llm.clone(), &ECHO_AGENT, echo_tools().await, 4);

        let outcome = conversation.run("go").await.unwrap();
        assert_eq!(outcome.final_message, "done");
        assert_eq!(outcome.tool_invocations.len(), 1);
        assert_eq!(outcome.outputs_of("echo").collect::<Vec<_>>(), vec![r#"{"x":1}"#]);
        assert_eq!(outcome.usage.total(), 30);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        // system, user, assistant tool call, tool result
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].messages[3].content, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn out_of_scope_tool_is_reported_not_executed() {
        let llm = ScriptedLlm::new(vec![
            Scripted::Call("find_potential_mentors", serde_json::json!({"skill_name": "x"})),
            Scripted::Text("gave up".into()),
        ]);
        let conversation = AgentConversation::new(llm, &ECHO_AGENT, echo_tools().await, 4);

        let outcome = conversation.run("go").await.unwrap();
        let inv = &outcome.tool_invocations[0];
        assert!(inv.output.as_ref().unwrap_err().contains("not available"));
        assert_eq!(outcome.outputs_of("find_potential_mentors").count(), 0);
    }

    #[tokio::test]
    async fn turn_limit_yields_empty_final_message() {
        let llm = ScriptedLlm::new(vec![
            Scripted::Call("echo", serde_json::json!({})),
            Scripted::Call("echo", serde_json::json!({})),
            Scripted::Text("too late".into()),
        ]);
        let conversation = AgentConversation::new(llm, &ECHO_AGENT, echo_tools().await, 2);

        let outcome = conversation.run("go").await.unwrap();
        assert!(outcome.final_message.is_empty());
        assert_eq!(outcome.tool_invocations.len(), 2);
    }

    #[tokio::test]
    async fn bound_session_reaches_tools_and_request_metadata() {
        struct SessionEcho;

        #[async_trait]
        impl Tool for SessionEcho {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "reports the bound session"
            }
            fn parameters_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object"})
            }
            async fn execute(
                &self,
                _params: serde_json::Value,
                ctx: &RunContext,
            ) -> Result<ToolOutput, ToolError> {
                Ok(ToolOutput::success(
                    serde_json::json!(ctx.session_id),
                    Duration::from_millis(1),
                ))
            }
        }

        let registry = ToolRegistry::new();
        registry.register(Arc::new(SessionEcho)).await;
        let tools = registry.scoped(ECHO_AGENT.tools).await;

        let llm = ScriptedLlm::new(vec![
            Scripted::Call("echo", serde_json::json!({})),
            Scripted::Text("done".into()),
        ]);
        let conversation =
            AgentConversation::new(llm.clone(), &ECHO_AGENT, tools, 4).with_session(42);

        let outcome = conversation.run("go").await.unwrap();
        assert_eq!(outcome.outputs_of("echo").collect::<Vec<_>>(), vec!["42"]);

        let requests = llm.requests.lock().unwrap();
        let metadata = &requests[0].metadata;
        assert_eq!(metadata.get("agent").map(String::as_str), Some("echo_agent"));
        assert_eq!(metadata.get("session_id").map(String::as_str), Some("42"));
        assert!(metadata.contains_key("run_id"));
    }

    #[tokio::test]
    async fn oracle_error_propagates() {
        let llm = ScriptedLlm::new(vec![Scripted::Fail]);
        let conversation = AgentConversation::new(llm, &ECHO_AGENT, echo_tools().await, 2);
        assert!(conversation.run("go").await.is_err());
    }
}
