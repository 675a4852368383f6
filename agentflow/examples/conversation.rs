use agentflow::prelude::*;

const WORKFLOW: &str = include_str!("../workflows/support_triage.yaml");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Logger::init_tracing();
    println!("=== AgentFlow Conversation Demo ===\n");

    let document = WorkflowLoader::from_yaml_str(WORKFLOW)?;
    WorkflowLoader::validate(&document)?;
    let mut runner = DocumentRunner::new(document)?;

    for message in [
        "Hi, I forgot my password",
        "Also my last invoice looks wrong",
        "Thanks, that is all",
    ] {
        runner.document_mut().nodes[0].data = serde_json::json!({ "content": message });
        let report = runner.run(None).await;

        println!("User: {message}");
        if let Some(memory) = report.outputs.get("memory") {
            println!("  context: {}", memory.field("context").cloned().unwrap_or_default());
        }
        if let Some(state) = report.outputs.get("stage") {
            println!("  stage:   {}", state.field("state").cloned().unwrap_or_default());
        }
        if let Some(reply) = report.outputs.get("assistant") {
            println!("  reply:   {}", reply.field("output").cloned().unwrap_or_default());
        }
        Logger::log_run_summary(&report.context);
        println!();
    }

    let history = runner.conversations().get("memory").await.unwrap_or_default();
    println!("Stored history ({} messages): {:?}", history.len(), history);
    println!("=== Demo Completed ===");
    Ok(())
}
