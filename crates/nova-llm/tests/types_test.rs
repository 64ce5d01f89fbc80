use nova_llm::{ChatOptions, ChatRequest, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("rules").role(), "system");
    assert_eq!(Message::user("hello").role(), "user");
    assert_eq!(Message::assistant("hi").role(), "assistant");
    assert_eq!(Message::tool_result("call_1", "42").role(), "tool");
}

#[test]
fn test_message_serialization() {
    let json = serde_json::to_value(Message::user("How did I sleep?")).unwrap();
    assert_eq!(json, json!({"role": "user", "content": "How did I sleep?"}));

    let json = serde_json::to_value(Message::assistant("Pretty well")).unwrap();
    assert_eq!(json["role"], "assistant");
    assert!(json.get("tool_calls").is_none());
}

#[test]
fn test_assistant_message_with_tool_calls_deserializes() {
    let raw = json!({
        "role": "assistant",
        "content": null,
        "tool_calls": [{
            "id": "call_9",
            "type": "function",
            "function": {"name": "name_conversation", "arguments": "{\"title\":\"Sleep\"}"}
        }]
    });
    let msg: Message = serde_json::from_value(raw).unwrap();
    match msg {
        Message::Assistant { content, tool_calls } => {
            assert!(content.is_none());
            assert_eq!(tool_calls.unwrap()[0].function.name, "name_conversation");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_tool_choice_serialization() {
    assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!("auto"));
    assert_eq!(serde_json::to_value(ToolChoice::Required).unwrap(), json!("required"));
    assert_eq!(
        serde_json::to_value(ToolChoice::force("name_conversation")).unwrap(),
        json!({"type": "function", "function": {"name": "name_conversation"}})
    );
}

#[test]
fn test_tool_call_parse_arguments() {
    let call = ToolCall {
        id: "call_1".to_string(),
        tool_type: "function".to_string(),
        function: nova_llm::FunctionCall {
            name: "name_conversation".to_string(),
            arguments: r#"{"title":"Evening routine"}"#.to_string(),
        },
    };
    let args: serde_json::Value = call.parse_arguments().unwrap();
    assert_eq!(args["title"], "Evening routine");
}

#[test]
fn test_chat_request_builder() {
    let tool = Tool::function("noop", "Does nothing", json!({"type": "object"}));
    let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")]).with_options(
        ChatOptions::new()
            .temperature(0.2)
            .max_tokens(64)
            .tools(vec![tool])
            .tool_choice(ToolChoice::Auto),
    );

    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.options.temperature, Some(0.2));
    assert_eq!(request.options.max_tokens, Some(64));
    assert_eq!(request.options.tools.as_ref().map(Vec::len), Some(1));
    assert_eq!(request.options.tool_choice, Some(ToolChoice::Auto));
}
