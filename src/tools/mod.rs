pub mod weather;

use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info_span};

use crate::bot::request::{ChatMessage, FunctionDefinition, ToolCall, ToolDefinition};
use weather::LookupKind;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("arguments for tool call {call_id} are not valid JSON: {source}")]
    InvalidArguments {
        call_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool call {call_id} has no string \"location\" argument: {source}")]
    MissingLocation {
        call_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool call {call_id} names unknown tool {name:?}")]
    UnknownTool { call_id: String, name: String },
}

/// Arguments shared by every tool the model may call.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LocationArgs {
    /// City name, e.g. Delhi
    pub location: String,
}

/// The fixed set of callable tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    GetWeather,
    GetHumidity,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::GetWeather, Tool::GetHumidity];

    pub fn name(self) -> &'static str {
        match self {
            Tool::GetWeather => "get_weather",
            Tool::GetHumidity => "get_humidity",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::GetWeather => "Get weather at the given location",
            Tool::GetHumidity => "Get humidity for a city",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn kind(self) -> LookupKind {
        match self {
            Tool::GetWeather => LookupKind::Weather,
            Tool::GetHumidity => LookupKind::Humidity,
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: location_schema(),
            },
        }
    }
}

/// Definitions for every tool, in declaration order.
pub fn definitions() -> Vec<ToolDefinition> {
    Tool::ALL.into_iter().map(Tool::definition).collect()
}

fn location_schema() -> serde_json::Value {
    let mut schema = schemars::schema_for!(LocationArgs).to_value();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object.remove("description");
    }
    schema
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
}

impl From<ToolResult> for ChatMessage {
    fn from(result: ToolResult) -> Self {
        ChatMessage::tool(result.content, result.tool_call_id)
    }
}

pub fn decode_arguments(call: &ToolCall) -> Result<LocationArgs, ToolError> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&call.function.arguments)
        .map_err(|source| ToolError::InvalidArguments {
            call_id: call.id.clone(),
            source,
        })?;
    serde_json::from_value(serde_json::Value::Object(object)).map_err(|source| ToolError::MissingLocation {
        call_id: call.id.clone(),
        source,
    })
}

/// Runs a single tool call against the lookup table.
pub fn resolve(call: &ToolCall) -> Result<ToolResult, ToolError> {
    let _span = info_span!("tool", tool = call.function.name.as_str(), id = call.id.as_str()).entered();

    let tool = Tool::from_name(&call.function.name).ok_or_else(|| ToolError::UnknownTool {
        call_id: call.id.clone(),
        name: call.function.name.clone(),
    })?;
    let args = decode_arguments(call)?;
    let content = weather::lookup(tool.kind(), &args.location);
    debug!(location = args.location.as_str(), result = content, "tool resolved");

    Ok(ToolResult {
        tool_call_id: call.id.clone(),
        content: content.to_string(),
    })
}
