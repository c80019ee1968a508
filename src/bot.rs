pub mod request;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info, info_span, warn};

use crate::config::Config;
use crate::tools::{self, ToolError};
use request::{ChatCompletion, ChatMessage, ChatRequest, ToolCall, ToolDefinition};

/// Printed when the model answers without calling any tool.
pub const NO_FUNCTION_CALL: &str = "No function call";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoFunctionCall,
    Answer(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::NoFunctionCall => f.write_str(NO_FUNCTION_CALL),
            Outcome::Answer(text) => f.write_str(text),
        }
    }
}

/// Where a conversation stands after a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundState {
    AwaitingToolResolution { tool_calls: Vec<ToolCall> },
    Completed(Outcome),
}

/// Resolves every call, in order. The first failure stops resolution so that
/// no partial set of results ever reaches the model.
pub fn resolve_tool_calls(tool_calls: &[ToolCall]) -> Result<Vec<ChatMessage>, ToolError> {
    tool_calls
        .iter()
        .map(|call| tools::resolve(call).map(ChatMessage::from))
        .collect()
}

pub struct Bot<C> {
    client: C,
    model: String,
    seed: i64,
    tools: Vec<ToolDefinition>,
    messages: Vec<ChatMessage>,
    round: u32,
}

impl<C: ChatCompletion> Bot<C> {
    pub fn new(client: C, config: &Config) -> Self {
        Self {
            client,
            model: config.openai_model.clone(),
            seed: config.seed,
            tools: tools::definitions(),
            messages: vec![],
            round: 0,
        }
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn rounds(&self) -> u32 {
        self.round
    }

    /// Runs one user exchange: a first round trip offering the tools and, if
    /// the model called any, a second one carrying their results.
    pub fn ask(&mut self, user_input: &str) -> Result<Outcome> {
        self.messages.push(ChatMessage::user(user_input));

        let reply = self.round_trip()?;
        let mut state = Self::classify_first_reply(&reply);
        self.messages.push(reply);

        loop {
            state = match state {
                RoundState::AwaitingToolResolution { tool_calls } => self.resolve_and_answer(&tool_calls)?,
                RoundState::Completed(outcome) => return Ok(outcome),
            };
        }
    }

    fn classify_first_reply(reply: &ChatMessage) -> RoundState {
        let tool_calls = reply.tool_calls();
        if tool_calls.is_empty() {
            info!("model answered without calling a tool");
            RoundState::Completed(Outcome::NoFunctionCall)
        } else {
            info!(count = tool_calls.len(), "model requested tool calls");
            RoundState::AwaitingToolResolution {
                tool_calls: tool_calls.to_vec(),
            }
        }
    }

    fn resolve_and_answer(&mut self, tool_calls: &[ToolCall]) -> Result<RoundState> {
        let results = resolve_tool_calls(tool_calls).wrap_err("Failed to resolve tool calls")?;
        debug_assert_eq!(results.len(), tool_calls.len());
        self.messages.extend(results);

        let reply = self.round_trip()?;
        if !reply.tool_calls().is_empty() {
            warn!(count = reply.tool_calls().len(), "ignoring tool calls in final reply");
        }
        let answer = reply.content.clone().unwrap_or_default();
        self.messages.push(reply);

        Ok(RoundState::Completed(Outcome::Answer(answer)))
    }

    fn round_trip(&mut self) -> Result<ChatMessage> {
        self.round += 1;
        let _span = info_span!("round_trip", round = self.round).entered();

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.messages.clone(),
            tools: self.tools.clone(),
            seed: Some(self.seed),
        };
        info!(model = self.model.as_str(), messages = request.messages.len(), "sending chat request");

        let reply = self
            .client
            .complete(&request)
            .wrap_err_with(|| format!("Chat request for round {} failed", self.round))?
            .into_message()?;
        debug!(content = ?reply.content, tool_calls = reply.tool_calls().len(), "received reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::request::{ChatResponse, Choice, FunctionCall, Role};
    use color_eyre::eyre::eyre;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned replies and records every request it receives.
    struct ScriptedClient {
        replies: RefCell<VecDeque<ChatMessage>>,
        requests: RefCell<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<ChatMessage>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                requests: RefCell::new(vec![]),
            }
        }
    }

    impl ChatCompletion for &ScriptedClient {
        fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.borrow_mut().push(request.clone());
            let message = self
                .replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| eyre!("unexpected request"))?;
            Ok(ChatResponse {
                choices: vec![Choice { message }],
            })
        }
    }

    fn assistant(content: Option<&str>, tool_calls: Vec<ToolCall>) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: content.map(str::to_string),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_no_tool_calls_stops_after_one_request() {
        let client = ScriptedClient::new(vec![assistant(Some("Hello there"), vec![])]);
        let mut bot = Bot::new(&client, &Config::default());

        let outcome = bot.ask("hi").unwrap();

        assert_eq!(outcome, Outcome::NoFunctionCall);
        assert_eq!(outcome.to_string(), "No function call");
        assert_eq!(client.requests.borrow().len(), 1);
        assert_eq!(bot.rounds(), 1);
    }

    #[test]
    fn test_first_request_carries_tools_seed_and_model() {
        let client = ScriptedClient::new(vec![assistant(Some("ok"), vec![])]);
        let config = Config {
            openai_model: "test-model".to_string(),
            seed: 7,
            ..Config::default()
        };
        let mut bot = Bot::new(&client, &config);

        bot.ask("What's the weather in Delhi?").unwrap();

        let requests = client.requests.borrow();
        let request = &requests[0];
        assert_eq!(request.model, "test-model");
        assert_eq!(request.seed, Some(7));
        assert_eq!(request.messages, vec![ChatMessage::user("What's the weather in Delhi?")]);
        let names: Vec<&str> = request.tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, ["get_weather", "get_humidity"]);
    }

    #[test]
    fn test_tool_calls_are_resolved_before_second_request() {
        let calls = vec![
            call("call_a", "get_weather", r#"{"location":"Patiala"}"#),
            call("call_b", "get_humidity", r#"{"location":"NAINITAL"}"#),
            call("call_c", "get_weather", r#"{"location":"Paris"}"#),
        ];
        let client = ScriptedClient::new(vec![
            assistant(None, calls.clone()),
            assistant(Some("Patiala is 10°C and Nainital is at 70% humidity."), vec![]),
        ]);
        let mut bot = Bot::new(&client, &Config::default());

        let outcome = bot.ask("weather in patiala, humidity in nainital, weather in paris").unwrap();

        assert_eq!(
            outcome,
            Outcome::Answer("Patiala is 10°C and Nainital is at 70% humidity.".to_string())
        );

        let requests = client.requests.borrow();
        assert_eq!(requests.len(), 2);

        let second = &requests[1].messages;
        assert_eq!(second.len(), 2 + calls.len());
        assert_eq!(second[0].role, Role::User);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[1].tool_calls(), calls.as_slice());
        assert_eq!(
            &second[2..],
            &[
                ChatMessage::tool("10°C", "call_a"),
                ChatMessage::tool("70%", "call_b"),
                ChatMessage::tool("Unknown", "call_c"),
            ]
        );
        assert_eq!(requests[1].tools.len(), 2);

        assert_eq!(bot.conversation().len(), second.len() + 1);
        assert_eq!(bot.rounds(), 2);
    }

    #[test]
    fn test_missing_final_content_is_empty_answer() {
        let client = ScriptedClient::new(vec![
            assistant(None, vec![call("call_1", "get_weather", r#"{"location":"Delhi"}"#)]),
            assistant(None, vec![]),
        ]);
        let mut bot = Bot::new(&client, &Config::default());

        assert_eq!(bot.ask("delhi?").unwrap(), Outcome::Answer(String::new()));
    }

    #[test]
    fn test_malformed_arguments_skip_second_request() {
        for arguments in ["not json", r#"{"city":"Delhi"}"#] {
            let client = ScriptedClient::new(vec![
                assistant(None, vec![
                    call("call_ok", "get_weather", r#"{"location":"Delhi"}"#),
                    call("call_bad", "get_weather", arguments),
                ]),
                assistant(Some("never sent"), vec![]),
            ]);
            let mut bot = Bot::new(&client, &Config::default());

            let err = bot.ask("delhi?").unwrap_err();

            assert!(err.downcast_ref::<ToolError>().is_some(), "{arguments}: {err:?}");
            assert_eq!(client.requests.borrow().len(), 1);
        }
    }

    #[test]
    fn test_unknown_tool_skips_second_request() {
        let client = ScriptedClient::new(vec![assistant(
            None,
            vec![call("call_1", "get_wind", r#"{"location":"Delhi"}"#)],
        )]);
        let mut bot = Bot::new(&client, &Config::default());

        assert!(bot.ask("wind?").is_err());
        assert_eq!(client.requests.borrow().len(), 1);
    }

    #[test]
    fn test_client_failure_propagates() {
        let client = ScriptedClient::new(vec![]);
        let mut bot = Bot::new(&client, &Config::default());

        assert!(bot.ask("hi").is_err());
    }

    #[test]
    fn test_resolve_tool_calls_keeps_order_and_ids() {
        let calls = vec![
            call("1", "get_humidity", r#"{"location":"delhi"}"#),
            call("2", "get_weather", r#"{"location":"Dehradun"}"#),
        ];

        let messages = resolve_tool_calls(&calls).unwrap();

        assert_eq!(
            messages,
            vec![ChatMessage::tool("55%", "1"), ChatMessage::tool("12°C", "2")]
        );
    }
}
