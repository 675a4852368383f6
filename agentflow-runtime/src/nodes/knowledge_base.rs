use super::{object, str_field};
use agentflow_core::resolve::joined_input;
use agentflow_core::{NodeContext, NodeExecutor, NodeFuture};
use serde_json::{json, Value};
use std::collections::HashSet;

const DEFAULT_TOP_K: usize = 3;

/// Lowercase alphanumeric words longer than one character.
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Keyword retrieval over documents embedded in the node configuration.
pub struct KnowledgeBaseExecutor;

impl NodeExecutor for KnowledgeBaseExecutor {
    fn kind(&self) -> &str {
        "knowledge-base"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let top_k = node
                .data_u64("topK")
                .map(|k| k as usize)
                .unwrap_or(DEFAULT_TOP_K);
            let query = terms(&joined_input(&ctx));

            let mut scored: Vec<(usize, String, &str)> = node
                .data_array("documents")
                .iter()
                .enumerate()
                .filter_map(|(index, doc)| {
                    let content = str_field(doc, "content")?;
                    let title = str_field(doc, "title")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Document {}", index + 1));
                    let score = terms(content).intersection(&query).count();
                    (score > 0).then_some((score, title, content))
                })
                .collect();
            // stable: ties keep document order
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.truncate(top_k);

            tracing::debug!(node_id = %node.id, matches = scored.len(), "knowledge base searched");

            let output = scored
                .iter()
                .map(|(_, _, content)| *content)
                .collect::<Vec<_>>()
                .join("\n\n");
            let matches: Vec<Value> = scored
                .iter()
                .map(|(score, title, _)| json!({ "title": title, "score": score }))
                .collect();

            Ok(object([
                ("output", Value::String(output)),
                ("matches", Value::Array(matches)),
            ]))
        })
    }
}
