use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    User,
    Assistant,
    Other(String),
}

impl From<String> for MessageRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Other(role),
        }
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => "user".to_string(),
            MessageRole::Assistant => "assistant".to_string(),
            MessageRole::Other(role) => role,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Other(role) => write!(f, "{role}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: TextContent,
    },
    #[serde(rename = "image_file", alias = "image")]
    Image {
        image_file: ImageFile,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeInterpreterOutput {
    Logs {
        logs: String,
    },
    Image {
        image: ImageFile,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInterpreterCall {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub outputs: Vec<CodeInterpreterOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    Function {
        #[serde(default)]
        id: String,
        function: FunctionCall,
    },
    CodeInterpreter {
        #[serde(default)]
        id: String,
        code_interpreter: CodeInterpreterCall,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation<'a> {
    pub name: &'a str,
    pub arguments: &'a str,
    pub output: Cow<'a, str>,
}

impl ToolCall {
    pub fn invocation(&self) -> Option<ToolInvocation<'_>> {
        match self {
            Self::Function { function, .. } => Some(ToolInvocation {
                name: &function.name,
                arguments: &function.arguments,
                output: Cow::Borrowed(function.output.as_deref().unwrap_or_default()),
            }),
            Self::CodeInterpreter {
                code_interpreter, ..
            } => {
                let logs = code_interpreter
                    .outputs
                    .iter()
                    .filter_map(|output| match output {
                        CodeInterpreterOutput::Logs { logs } => Some(logs.as_str()),
                        CodeInterpreterOutput::Image { .. } | CodeInterpreterOutput::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                Some(ToolInvocation {
                    name: "code_interpreter",
                    arguments: &code_interpreter.input,
                    output: Cow::Owned(logs),
                })
            }
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDetails {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStep {
    pub id: String,
    #[serde(default)]
    pub step_details: StepDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunStepList {
    pub steps: Vec<RunStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Assistant {
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreadAggregate {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub run_steps: BTreeMap<String, RunStepList>,
    pub assistants: BTreeMap<String, Assistant>,
}

impl ThreadAggregate {
    pub fn run_steps_for(&self, message: &Message) -> Option<&RunStepList> {
        message
            .run_id
            .as_deref()
            .and_then(|run_id| self.run_steps.get(run_id))
    }

    pub fn assistant_for(&self, message: &Message) -> Option<&Assistant> {
        message
            .assistant_id
            .as_deref()
            .and_then(|assistant_id| self.assistants.get(assistant_id))
    }
}
