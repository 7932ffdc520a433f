use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::model::{ContentPart, Message, MessageRole, RunStepList, ThreadAggregate, ToolCall};

const HAMMER: &str = "🔨";
const ROBOT: &str = "🤖";
const HUMAN: &str = "👤";
const WHITE_SQUARE: &str = "🔲";
const SEPARATOR: &str = "\n---\n";
const UNSUPPORTED_CONTENT: &str = "Unsupported message type";

pub fn render_thread_markdown(aggregate: &ThreadAggregate) -> String {
    let mut fragments = Vec::new();

    for message in &aggregate.messages {
        if let Some(run_steps) = aggregate.run_steps_for(message) {
            fragments.extend(render_run_steps(run_steps));
        }
        fragments.push(Cow::Owned(format!(
            "{} **{}**: {}\n",
            role_marker(&message.role),
            role_label(message, aggregate),
            render_content(&message.content),
        )));
        fragments.push(Cow::Borrowed(SEPARATOR));
    }

    fragments.concat()
}

fn render_run_steps(run_steps: &RunStepList) -> impl Iterator<Item = Cow<'static, str>> + '_ {
    run_steps
        .steps
        .iter()
        .flat_map(|step| &step.step_details.tool_calls)
        .filter_map(render_tool_call)
        .map(Cow::Owned)
}

fn render_tool_call(tool_call: &ToolCall) -> Option<String> {
    let invocation = tool_call.invocation()?;
    Some(format!(
        "{HAMMER} **{}(**{}**)**\n\nReturned: {}\n\n",
        invocation.name,
        render_text_maybe_json(invocation.arguments),
        render_text_maybe_json(&invocation.output),
    ))
}

fn render_content(content: &[ContentPart]) -> String {
    content
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => render_text_maybe_json(&text.value),
            ContentPart::Image { image_file } => Cow::Borrowed(image_file.file_id.as_str()),
            ContentPart::Unsupported => Cow::Borrowed(UNSUPPORTED_CONTENT),
        })
        .collect()
}

// Objects and the literal `null` are fenced; arrays and other scalars pass
// through untouched.
pub fn render_text_maybe_json(value: &str) -> Cow<'_, str> {
    let Ok(object) = serde_json::from_str::<Option<Map<String, Value>>>(value) else {
        return Cow::Borrowed(value);
    };
    match serde_json::to_string_pretty(&object) {
        Ok(pretty) => Cow::Owned(format!("\n```json\n{pretty}\n```\n")),
        Err(_) => Cow::Borrowed(value),
    }
}

fn role_marker(role: &MessageRole) -> &'static str {
    match role {
        MessageRole::User => HUMAN,
        MessageRole::Assistant => ROBOT,
        MessageRole::Other(_) => WHITE_SQUARE,
    }
}

fn role_label<'a>(message: &'a Message, aggregate: &'a ThreadAggregate) -> Cow<'a, str> {
    match &message.role {
        MessageRole::User => Cow::Borrowed("User"),
        MessageRole::Assistant => aggregate
            .assistant_for(message)
            .and_then(|assistant| assistant.display_name())
            .map_or(Cow::Borrowed("Assistant"), |name| {
                Cow::Owned(format!("Assistant ({name})"))
            }),
        MessageRole::Other(role) => Cow::Borrowed(role.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Value;

    use super::{render_text_maybe_json, render_thread_markdown};
    use crate::model::{
        Assistant, CodeInterpreterCall, CodeInterpreterOutput, ContentPart, FunctionCall,
        ImageFile, Message, MessageRole, RunStep, RunStepList, StepDetails, TextContent,
        ThreadAggregate, ToolCall,
    };

    fn text(value: &str) -> ContentPart {
        ContentPart::Text {
            text: TextContent {
                value: value.to_string(),
            },
        }
    }

    fn message(id: &str, role: &str, content: Vec<ContentPart>) -> Message {
        Message {
            id: id.to_string(),
            created_at: 0,
            role: MessageRole::from(role.to_string()),
            content,
            run_id: None,
            assistant_id: None,
        }
    }

    fn function_step(name: &str, arguments: &str, output: Option<&str>) -> RunStep {
        RunStep {
            id: format!("step_{name}"),
            step_details: StepDetails {
                tool_calls: vec![ToolCall::Function {
                    id: format!("call_{name}"),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                        output: output.map(str::to_string),
                    },
                }],
            },
        }
    }

    fn thread(messages: Vec<Message>) -> ThreadAggregate {
        ThreadAggregate {
            thread_id: "thread_abc".to_string(),
            messages,
            ..ThreadAggregate::default()
        }
    }

    #[test]
    fn renders_tool_calls_before_named_assistant_reply() {
        let mut reply = message("msg_2", "assistant", vec![text("The answer is y.")]);
        reply.run_id = Some("r1".to_string());
        reply.assistant_id = Some("a1".to_string());

        let mut aggregate = thread(vec![message("msg_1", "user", vec![text("Hello")]), reply]);
        aggregate.run_steps = BTreeMap::from([(
            "r1".to_string(),
            RunStepList {
                steps: vec![function_step("lookup", r#"{"q":"x"}"#, Some(r#"{"result":"y"}"#))],
            },
        )]);
        aggregate.assistants = BTreeMap::from([(
            "a1".to_string(),
            Assistant {
                id: "a1".to_string(),
                name: Some("Helper".to_string()),
            },
        )]);

        let output = render_thread_markdown(&aggregate);

        let expected = concat!(
            "👤 **User**: Hello\n",
            "\n---\n",
            "🔨 **lookup(**\n```json\n{\n  \"q\": \"x\"\n}\n```\n**)**\n\n",
            "Returned: \n```json\n{\n  \"result\": \"y\"\n}\n```\n\n\n",
            "🤖 **Assistant (Helper)**: The answer is y.\n",
            "\n---\n",
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn missing_run_renders_without_tool_block() {
        let mut reply = message("msg_1", "assistant", vec![text("done")]);
        reply.run_id = Some("run_unknown".to_string());
        reply.assistant_id = Some("asst_unknown".to_string());

        let output = render_thread_markdown(&thread(vec![reply]));
        assert_eq!(output, "🤖 **Assistant**: done\n\n---\n");
    }

    #[test]
    fn unnamed_assistant_uses_generic_label() {
        let mut reply = message("msg_1", "assistant", vec![text("hi")]);
        reply.assistant_id = Some("a1".to_string());
        let mut aggregate = thread(vec![reply]);
        aggregate.assistants = BTreeMap::from([(
            "a1".to_string(),
            Assistant {
                id: "a1".to_string(),
                name: Some(String::new()),
            },
        )]);

        assert!(render_thread_markdown(&aggregate).starts_with("🤖 **Assistant**: hi"));
    }

    #[test]
    fn other_roles_use_generic_marker_and_raw_label() {
        let output = render_thread_markdown(&thread(vec![message(
            "msg_1",
            "system",
            vec![text("be nice")],
        )]));
        assert_eq!(output, "🔲 **system**: be nice\n\n---\n");
    }

    #[test]
    fn image_renders_file_reference_and_unknown_parts_placeholder() {
        let output = render_thread_markdown(&thread(vec![message(
            "msg_1",
            "user",
            vec![
                ContentPart::Image {
                    image_file: ImageFile {
                        file_id: "file_123".to_string(),
                    },
                },
                ContentPart::Unsupported,
            ],
        )]));
        assert_eq!(
            output,
            "👤 **User**: file_123Unsupported message type\n\n---\n"
        );
    }

    #[test]
    fn preserves_message_order() {
        let output = render_thread_markdown(&thread(vec![
            message("msg_1", "user", vec![text("first")]),
            message("msg_2", "assistant", vec![text("second")]),
            message("msg_3", "user", vec![text("third")]),
        ]));

        let first = output.find("first").expect("first");
        let second = output.find("second").expect("second");
        let third = output.find("third").expect("third");
        assert!(first < second && second < third);
        assert_eq!(output.matches("\n---\n").count(), 3);
    }

    #[test]
    fn empty_thread_renders_nothing() {
        assert_eq!(render_thread_markdown(&thread(Vec::new())), "");
    }

    #[test]
    fn json_object_round_trips_through_fence() {
        let raw = r#"{"b":[1,2],"a":{"nested":true},"c":null}"#;
        let rendered = render_text_maybe_json(raw);

        let body = rendered
            .strip_prefix("\n```json\n")
            .and_then(|rest| rest.strip_suffix("\n```\n"))
            .expect("fenced json block");
        let reparsed = serde_json::from_str::<Value>(body).expect("parse fenced body");
        let original = serde_json::from_str::<Value>(raw).expect("parse original");
        assert_eq!(reparsed, original);
    }

    #[test]
    fn non_object_text_is_left_verbatim() {
        for raw in ["plain text", "[1, 2, 3]", "42", "\"quoted\"", "true", "{not json", ""] {
            assert_eq!(render_text_maybe_json(raw), raw);
        }
    }

    #[test]
    fn null_text_is_fenced() {
        assert_eq!(render_text_maybe_json("null"), "\n```json\nnull\n```\n");
        assert_eq!(render_text_maybe_json(" null "), "\n```json\nnull\n```\n");
    }

    #[test]
    fn code_interpreter_calls_render_input_and_logs() {
        let mut reply = message("msg_1", "assistant", vec![text("ok")]);
        reply.run_id = Some("r1".to_string());
        let mut aggregate = thread(vec![reply]);
        aggregate.run_steps = BTreeMap::from([(
            "r1".to_string(),
            RunStepList {
                steps: vec![RunStep {
                    id: "step_1".to_string(),
                    step_details: StepDetails {
                        tool_calls: vec![
                            ToolCall::CodeInterpreter {
                                id: "call_1".to_string(),
                                code_interpreter: CodeInterpreterCall {
                                    input: "print(2 + 2)".to_string(),
                                    outputs: vec![CodeInterpreterOutput::Logs {
                                        logs: "4".to_string(),
                                    }],
                                },
                            },
                            ToolCall::Other,
                        ],
                    },
                }],
            },
        )]);

        let output = render_thread_markdown(&aggregate);
        assert!(output.starts_with("🔨 **code_interpreter(**print(2 + 2)**)**\n\nReturned: 4\n\n"));
        assert_eq!(output.matches("🔨").count(), 1);
    }
}
