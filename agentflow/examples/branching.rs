use agentflow::prelude::*;
use agentflow::runtime::{to_timeline, TRUE_PATH, FALSE_PATH};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn graph(question: &str) -> (Vec<CanvasNode>, Vec<Connection>) {
    let nodes = vec![
        CanvasNode::new("question", "message").with_data(json!({ "content": question })),
        CanvasNode::new("is_refund", "logic")
            .with_subtype("if-else")
            .with_data(json!({ "operator": "contains", "value": "refund" })),
        CanvasNode::new("billing", "agent")
            .with_data(json!({ "systemPrompt": "You are the billing desk." })),
        CanvasNode::new("faq", "knowledge-base").with_data(json!({
            "documents": [
                { "title": "Shipping", "content": "Orders ship within two business days." },
                { "title": "Returns", "content": "Items can be returned within thirty days." }
            ]
        })),
    ];
    let connections = vec![
        Connection::new("c1", "question", "is_refund"),
        Connection::new("c2", "is_refund", "billing").with_source_output(TRUE_PATH),
        Connection::new("c3", "is_refund", "faq").with_source_output(FALSE_PATH),
        Connection::new("c4", "question", "faq"),
    ];
    (nodes, connections)
}

#[tokio::main]
async fn main() {
    println!("=== AgentFlow Branching Demo ===\n");

    let provider = Arc::new(StaticProvider::reply("Your refund has been queued."));
    let adapter = EngineAdapter::new(ExecutorRegistry::builtin(Some(provider)));

    for question in ["Can I get a refund?", "When do orders ship?"] {
        println!("Question: {question}");
        let events = Mutex::new(Vec::new());
        let record = |event: NormalizedEvent| {
            if let Ok(mut events) = events.lock() {
                events.push(event);
            }
        };

        let (nodes, connections) = graph(question);
        let outputs = adapter.run_flow(nodes, connections, None, None, Some(&record)).await;

        let events = events.into_inner().unwrap_or_default();
        for step in to_timeline(&events) {
            println!(
                "  {:?} {} ({} ms)",
                step.status,
                step.node_id,
                step.ended_at - step.started_at
            );
        }
        for id in ["billing", "faq"] {
            if let Some(output) = outputs.get(id) {
                println!("  -> {id}: {}", output.to_json_string());
            }
        }
        println!();
    }

    println!("=== Demo Completed ===");
}
