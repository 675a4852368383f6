use agentflow_core::NodeOutput;
use agentflow_runtime::{NodeEvent, StaticProvider};
use agentflow_yaml::{DocumentRunner, WorkflowLoader};
use serde_json::json;
use std::sync::{Arc, Mutex};

const TRIAGE: &str = r#"
name: Triage
nodes:
  - id: inbox
    type: message
    data:
      content: "I need a refund for order 42"
  - id: router
    type: logic
    subtype: decision-tree
    data:
      rules:
        - pattern: refund|invoice
          branch: billing
        - pattern: password
          branch: account
  - id: billing
    type: agent
    data:
      systemPrompt: You handle billing questions.
  - id: account
    type: message
    data:
      content: account team
connections:
  - id: c1
    sourceNode: inbox
    targetNode: router
  - id: c2
    sourceNode: router
    sourceOutput: billing
    targetNode: billing
  - id: c3
    sourceNode: router
    sourceOutput: account
    targetNode: account
options:
  scenario:
    description: Online shop support
  provider:
    kind: static
    reply: Refund approved.
"#;

#[tokio::test]
async fn test_yaml_document_runs_offline() {
    let doc = WorkflowLoader::from_yaml_str(TRIAGE).unwrap();
    WorkflowLoader::validate(&doc).unwrap();
    let runner = DocumentRunner::new(doc).unwrap();

    let events = Mutex::new(Vec::new());
    let sink = |event: NodeEvent| events.lock().unwrap().push(event.node_id);
    let report = runner.run(Some(&sink)).await;

    assert!(report.is_success());
    assert_eq!(report.outputs.get("router"), Some(&NodeOutput::text("billing")));
    assert_eq!(
        report.outputs.get("billing").and_then(|o| o.field("output")),
        Some(&json!("Refund approved."))
    );
    assert!(!report.outputs.contains_key("account"));
    assert_eq!(*events.lock().unwrap(), vec!["inbox", "router", "billing"]);
}

#[tokio::test]
async fn test_scenario_reaches_agent_prompt() {
    let doc = WorkflowLoader::from_yaml_str(TRIAGE).unwrap();
    let runner = DocumentRunner::with_provider(doc, Some(Arc::new(StaticProvider::echo())));

    let outputs = runner.run_outputs().await;

    let prompt = outputs
        .get("billing")
        .and_then(|o| o.field("output"))
        .and_then(|v| v.as_str())
        .unwrap();
    assert!(prompt.starts_with("You handle billing questions."));
    assert!(prompt.contains("Scenario Context:\nDescription: Online shop support"));
}

#[tokio::test]
async fn test_start_override_pins_the_run() {
    let doc = WorkflowLoader::from_yaml_str(TRIAGE).unwrap();
    let runner = DocumentRunner::with_provider(doc, None).with_start_node("account");

    let outputs = runner.run_outputs().await;

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs.get("account"), Some(&NodeOutput::text("account team")));
}

#[tokio::test]
async fn test_runner_keeps_conversation_history() {
    let doc = WorkflowLoader::from_json_str(
        r#"{
            "nodes": [
                { "id": "say", "type": "message", "data": { "content": "a" } },
                { "id": "conv", "type": "memory", "subtype": "conversation-flow",
                  "data": { "historyLength": 2 } }
            ],
            "edges": [{ "id": "e1", "sourceNode": "say", "targetNode": "conv" }]
        }"#,
    )
    .unwrap();
    let mut runner = DocumentRunner::with_provider(doc, None);

    for text in ["a", "b", "c"] {
        runner.document_mut().nodes[0].data = json!({ "content": text });
        runner.run_outputs().await;
    }

    assert_eq!(
        runner.conversations().get("conv").await,
        Some(vec!["b".to_string(), "c".to_string()])
    );
}

#[test]
fn test_documents_survive_a_file_round_trip() {
    let doc = WorkflowLoader::from_yaml_str(TRIAGE).unwrap();
    let dir = std::env::temp_dir().join(format!("agentflow-yaml-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let yaml_path = dir.join("triage.yaml");
    let json_path = dir.join("triage.json");
    WorkflowLoader::save_to_yaml(&doc, &yaml_path).unwrap();
    WorkflowLoader::save_to_json(&doc, &json_path).unwrap();

    assert_eq!(WorkflowLoader::from_file(&yaml_path).unwrap(), doc);
    assert_eq!(WorkflowLoader::from_file(&json_path).unwrap(), doc);
    std::fs::remove_dir_all(&dir).unwrap();
}
