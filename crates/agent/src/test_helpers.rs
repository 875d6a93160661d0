//! Shared test doubles for the agent loop.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dayloop_core::capability::{
    BoundArguments, CapabilitySession, RemoteResult, SessionConnector, ToolDescriptor,
};
use dayloop_core::error::{CapabilityError, ProviderError};
use dayloop_core::message::Message;
use dayloop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde_json::{Value, json};

/// A provider that answers with a fixed script of replies, in order.
///
/// Every prompt it receives is recorded. Running out of replies is an
/// `ApiError`, so a test that under-scripts fails instead of hanging.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the recorded prompts.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().pop_front().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: "script exhausted".into(),
        })?;

        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A decision reply calling `function` with `parameters`.
pub fn call(function: &str, parameters: Value) -> String {
    json!({
        "final_iteration": "False",
        "your_comment": "",
        "function_name": function,
        "parameters": parameters,
    })
    .to_string()
}

/// A final decision reply.
pub fn answer(comment: &str) -> String {
    json!({
        "final_iteration": "True",
        "your_comment": comment,
        "function_name": "",
        "parameters": [],
    })
    .to_string()
}

pub fn tool(name: &str, description: &str, schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.into(),
        description: description.into(),
        input_schema: schema,
    }
}

/// The todo server's tools: a date lookup and a todo creator taking one
/// nested `input` structure.
pub fn planner_tools() -> Vec<ToolDescriptor> {
    vec![
        tool("get_current_date", "Get the current date", json!({"properties": {}})),
        tool(
            "create_todo",
            "Create a todo for a date",
            json!({
                "properties": {"input": {"$ref": "#/$defs/CreateTodoInput"}},
                "required": ["input"],
                "$defs": {"CreateTodoInput": {
                    "properties": {
                        "date": {"type": "string"},
                        "content": {"type": "string"}
                    },
                    "required": ["date", "content"]
                }}
            }),
        ),
    ]
}

/// Wrap text the way MCP servers return it.
pub fn text_result(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}], "isError": false})
}

/// Calls observed by a [`MockSession`]: capability name and wire arguments.
pub type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

/// In-memory capability session with canned responses.
pub struct MockSession {
    tools: Result<Vec<ToolDescriptor>, String>,
    responses: HashMap<String, Value>,
    failures: HashMap<String, String>,
    calls: CallLog,
    closed: Arc<Mutex<bool>>,
}

impl MockSession {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools: Ok(tools),
            responses: HashMap::new(),
            failures: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(false)),
        }
    }

    /// Answer every call to `name` with `result`.
    pub fn with_response(mut self, name: &str, result: Value) -> Self {
        self.responses.insert(name.into(), result);
        self
    }

    /// Fail every call to `name` as a transport error.
    pub fn failing(mut self, name: &str, reason: &str) -> Self {
        self.failures.insert(name.into(), reason.into());
        self
    }

    /// Make `tools/list` fail.
    pub fn failing_discovery(mut self, reason: &str) -> Self {
        self.tools = Err(reason.into());
        self
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    pub fn closed(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.closed)
    }

    fn share(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            responses: self.responses.clone(),
            failures: self.failures.clone(),
            calls: Arc::clone(&self.calls),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait]
impl CapabilitySession for MockSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, CapabilityError> {
        self.tools.clone().map_err(CapabilityError::Discovery)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: &BoundArguments,
    ) -> Result<RemoteResult, CapabilityError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.to_json()));

        if let Some(reason) = self.failures.get(name) {
            return Err(CapabilityError::RemoteExecution {
                capability: name.into(),
                reason: reason.clone(),
            });
        }
        Ok(RemoteResult(
            self.responses
                .get(name)
                .cloned()
                .unwrap_or_else(|| text_result("ok")),
        ))
    }

    async fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Hands out sessions that share one call log and closed flag.
pub struct MockConnector {
    template: Option<MockSession>,
    connects: Arc<Mutex<usize>>,
}

impl MockConnector {
    pub fn new(session: MockSession) -> Self {
        Self {
            template: Some(session),
            connects: Arc::new(Mutex::new(0)),
        }
    }

    /// A connector whose server never starts.
    pub fn unreachable() -> Self {
        Self {
            template: None,
            connects: Arc::new(Mutex::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn CapabilitySession>, CapabilityError> {
        *self.connects.lock().unwrap() += 1;
        match &self.template {
            Some(session) => {
                // Each run starts with the closed flag down.
                *session.closed.lock().unwrap() = false;
                Ok(Box::new(session.share()))
            }
            None => Err(CapabilityError::Connect("failed to start 'python': not found".into())),
        }
    }
}
