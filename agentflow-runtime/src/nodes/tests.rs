use super::*;
use crate::providers::StaticProvider;
use agentflow_context::{ConversationStore, MachineStateStore};
use agentflow_core::{
    CanvasNode, Connection, DebugSlot, NodeContext, NodeError, NodeExecutor, NodeOutput,
    RunOptions, Scenario,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A node fed by one upstream message per entry of `inputs`.
struct Fixture {
    nodes: Vec<CanvasNode>,
    connections: Vec<Connection>,
    outputs: HashMap<String, NodeOutput>,
}

impl Fixture {
    fn new(node: CanvasNode, inputs: &[&str]) -> Self {
        let mut nodes = Vec::new();
        let mut connections = Vec::new();
        let mut outputs = HashMap::new();
        for (i, text) in inputs.iter().enumerate() {
            let id = format!("up{i}");
            nodes.push(CanvasNode::new(&id, "message"));
            connections.push(Connection::new(format!("e{i}"), &id, &node.id));
            outputs.insert(id, NodeOutput::text(*text));
        }
        nodes.push(node);
        Self {
            nodes,
            connections,
            outputs,
        }
    }

    fn node(&self) -> &CanvasNode {
        &self.nodes[self.nodes.len() - 1]
    }

    fn context(&self) -> NodeContext<'_> {
        NodeContext::new(&self.nodes, &self.connections, &self.outputs, self.node())
    }

    async fn run(&self, executor: &dyn NodeExecutor) -> Result<NodeOutput, NodeError> {
        executor.execute(self.context()).await
    }
}

fn node(kind: &str, data: Value) -> CanvasNode {
    CanvasNode::new("n", "node").with_subtype(kind).with_data(data)
}

#[tokio::test]
async fn test_if_else_operators() {
    let cases = [
        (json!({ "value": "HELLO" }), "hello there", "true"),
        (json!({ "value": "HELLO", "caseSensitive": true }), "hello there", "false"),
        (json!({ "operator": "equals", "value": "yes" }), " Yes ", "true"),
        (json!({ "operator": "not-contains", "condition": "spam" }), "ham", "true"),
        (json!({ "operator": "starts-with", "value": "order" }), "Order #12", "true"),
        (json!({ "operator": "ends-with", "value": "?" }), "really?", "true"),
        (json!({ "operator": "regex", "value": "^\\d+$" }), "12345", "true"),
        (json!({ "operator": "is-empty" }), "   ", "true"),
        (json!({ "operator": "not-empty" }), "x", "true"),
    ];

    for (data, input, expected) in cases {
        let fixture = Fixture::new(node("if-else", data.clone()), &[input]);
        let output = fixture.run(&IfElseExecutor).await.unwrap();
        assert_eq!(output, NodeOutput::text(expected), "data: {data}, input: {input:?}");
    }
}

#[tokio::test]
async fn test_if_else_rejects_bad_config() {
    let bad_operator = node("if-else", json!({ "operator": "greater-than" }));
    let bad_regex = node("if-else", json!({ "operator": "regex", "value": "(" }));
    assert!(!IfElseExecutor.validate(&bad_operator));
    assert!(!IfElseExecutor.validate(&bad_regex));

    let fixture = Fixture::new(bad_regex, &["x"]);
    assert!(matches!(
        fixture.run(&IfElseExecutor).await,
        Err(NodeError::InvalidPattern { .. })
    ));
}

#[tokio::test]
async fn test_decision_tree_defaults() {
    let data = json!({
        "rules": [{ "pattern": "urgent", "branch": "escalate" }],
        "defaultBranch": "queue"
    });
    let fixture = Fixture::new(node("decision-tree", data), &["URGENT: server down"]);
    assert_eq!(
        fixture.run(&DecisionTreeExecutor).await.unwrap(),
        NodeOutput::text("escalate")
    );

    let fixture = Fixture::new(
        node("decision-tree", json!({ "rules": [{ "pattern": "urgent", "branch": "escalate" }] })),
        &["hello"],
    );
    assert_eq!(
        fixture.run(&DecisionTreeExecutor).await.unwrap(),
        NodeOutput::text("default")
    );
}

#[tokio::test]
async fn test_state_machine_transitions_persist() {
    let states = MachineStateStore::new();
    let executor = StateMachineExecutor::new(states.clone());
    let data = json!({
        "initialState": "idle",
        "transitions": [
            { "from": "idle", "to": "active", "on": "start" },
            { "from": "active", "to": "done", "on": "finish|stop" }
        ]
    });

    let first = Fixture::new(node("state-machine", data.clone()), &["please START"]);
    let output = first.run(&executor).await.unwrap();
    assert_eq!(output.field("state"), Some(&json!("active")));
    assert_eq!(output.field("previous"), Some(&json!("idle")));
    assert_eq!(output.field("transitioned"), Some(&json!(true)));

    let second = Fixture::new(node("state-machine", data.clone()), &["nothing"]);
    let output = second.run(&executor).await.unwrap();
    assert_eq!(output.field("output"), Some(&json!("active")));
    assert_eq!(output.field("transitioned"), Some(&json!(false)));

    let third = Fixture::new(node("state-machine", data), &["stop now"]);
    let output = third.run(&executor).await.unwrap();
    assert_eq!(output.field("state"), Some(&json!("done")));
    assert_eq!(states.get("n").await.as_deref(), Some("done"));
}

#[tokio::test]
async fn test_knowledge_base_ranks_by_overlap() {
    let data = json!({
        "topK": 2,
        "documents": [
            { "title": "Shipping", "content": "Orders ship within two days" },
            { "content": "Refunds are issued for damaged orders within thirty days" },
            { "title": "Careers", "content": "We are hiring engineers" }
        ]
    });
    let fixture = Fixture::new(
        node("knowledge-base", data),
        &["How long do refunds for damaged orders take?"],
    );

    let output = fixture.run(&KnowledgeBaseExecutor).await.unwrap();

    assert_eq!(
        output.field("matches"),
        Some(&json!([
            { "title": "Document 2", "score": 4 },
            { "title": "Shipping", "score": 1 }
        ]))
    );
    assert_eq!(
        output.field("output"),
        Some(&json!(
            "Refunds are issued for damaged orders within thirty days\n\nOrders ship within two days"
        ))
    );
}

#[tokio::test]
async fn test_knowledge_base_without_match() {
    let data = json!({ "documents": [{ "content": "alpha beta" }] });
    let fixture = Fixture::new(node("knowledge-base", data), &["gamma"]);
    let output = fixture.run(&KnowledgeBaseExecutor).await.unwrap();
    assert_eq!(output.field("output"), Some(&json!("")));
    assert_eq!(output.field("matches"), Some(&json!([])));
}

#[tokio::test]
async fn test_message_template_and_fallbacks() {
    let templated = node(
        "message",
        json!({ "template": "Dear {{name}}: {{input}}", "variables": { "name": "Ada" } }),
    );
    let fixture = Fixture::new(templated, &["first", "second"]);
    assert_eq!(
        fixture.run(&MessageExecutor).await.unwrap(),
        NodeOutput::text("Dear Ada: first\n\nsecond")
    );

    let fixed = Fixture::new(node("message", json!({ "content": "static" })), &["ignored"]);
    assert_eq!(fixed.run(&MessageExecutor).await.unwrap(), NodeOutput::text("static"));

    let passthrough = Fixture::new(node("message", json!({})), &["relay"]);
    assert_eq!(passthrough.run(&MessageExecutor).await.unwrap(), NodeOutput::text("relay"));
}

#[tokio::test]
async fn test_prompt_template_placeholders() {
    let data = json!({
        "template": "[{{scenario.timezone}}] {{inputs.1}} / {{inputs.0}} for {{team}}{{unknown}}",
        "variables": { "team": "support", "limit": 3 }
    });
    let fixture = Fixture::new(node("prompt-template", data), &["one", "two"]);
    let options = RunOptions {
        scenario: Some(Scenario {
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }),
    };
    let ctx = fixture.context().with_run_options(Some(&options));

    let output = PromptTemplateExecutor::default().execute(ctx).await.unwrap();

    assert_eq!(output.field("prompt"), Some(&json!("[UTC] two / one for support")));
    assert_eq!(output.field("output"), output.field("prompt"));
}

#[tokio::test]
async fn test_conversation_flow_context_rules() {
    let store = ConversationStore::new();
    let executor = ConversationFlowExecutor::new(store.clone());
    let data = json!({
        "historyLength": 3,
        "contextRules": [
            { "pattern": "refund", "context": "billing" },
            { "pattern": "password", "context": "account" }
        ]
    });

    let fixture = Fixture::new(node("conversation-flow", data.clone()), &["I want a REFUND"]);
    let output = fixture.run(&executor).await.unwrap();
    assert_eq!(output.field("history"), Some(&json!(["I want a REFUND"])));
    assert_eq!(output.field("context"), Some(&json!(["billing"])));

    let silent = Fixture::new(node("conversation-flow", data), &[]);
    let output = silent.run(&executor).await.unwrap();
    assert_eq!(output.field("history"), Some(&json!(["I want a REFUND"])));

    store.clear().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_conversation_flow_invalid_pattern() {
    let store = ConversationStore::new();
    let executor = ConversationFlowExecutor::new(store.clone());
    let bad = node(
        "conversation-flow",
        json!({ "contextRules": [{ "pattern": "[unclosed", "context": "x" }] }),
    );
    assert!(!executor.validate(&bad));

    let fixture = Fixture::new(bad, &["hello"]);
    assert!(matches!(
        fixture.run(&executor).await,
        Err(NodeError::InvalidPattern { .. })
    ));
    assert!(store.get("n").await.is_none());
}

#[tokio::test]
async fn test_agent_records_debug_info() {
    let executor = AgentExecutor::new("agent", Some(Arc::new(StaticProvider::echo())));
    let fixture = Fixture::new(
        node("agent", json!({ "systemPrompt": "You are helpful." })),
        &["Hi"],
    );
    let slot = DebugSlot::default();
    let ctx = fixture.context().with_debug(&slot);

    let output = executor.execute(ctx).await.unwrap();

    assert_eq!(output.field("output"), Some(&json!("You are helpful.\n\nHi")));
    assert!(output.field("llm").is_some());
    let debug = slot.take().unwrap();
    assert_eq!(debug.prompt.as_deref(), Some("You are helpful.\n\nHi"));
    assert!(debug.response_raw.is_some());
}

#[tokio::test]
async fn test_tool_agent_selects_named_tool() {
    let provider = Arc::new(StaticProvider::reply("I will use the Search tool."));
    let executor = ToolAgentExecutor::new(Some(provider));
    let data = json!({
        "tools": [
            { "name": "calculator", "description": "Does math" },
            { "name": "search", "description": "Looks things up" }
        ]
    });
    let fixture = Fixture::new(node("tool-agent", data), &["find rust docs"]);

    let output = fixture.run(&executor).await.unwrap();

    assert_eq!(output.field("selectedTool"), Some(&json!("search")));
    assert_eq!(output.field("output"), Some(&json!("I will use the Search tool.")));
}

#[tokio::test]
async fn test_tool_agent_prompt_lists_tools() {
    let executor = ToolAgentExecutor::new(Some(Arc::new(StaticProvider::echo())));
    let data = json!({
        "rules": "Pick a tool.",
        "tools": [{ "name": "calculator", "description": "Does math" }]
    });
    let fixture = Fixture::new(node("tool-agent", data), &["2+2"]);

    let output = fixture.run(&executor).await.unwrap();

    assert_eq!(
        output.field("output"),
        Some(&json!("Pick a tool.\n\nAvailable tools:\n- calculator: Does math\n\n2+2"))
    );
    assert_eq!(output.field("selectedTool"), Some(&json!("calculator")));
}
