//! Input resolution shared by every node executor.
//!
//! Upstream outputs come in many shapes: plain text, `{ output }` objects and
//! raw provider responses wrapped as `{ llm }`, `{ gemini }` or `{ provider }`.
//! Each shape is handled by one [`Extractor`]; a chain of extractors is tried
//! in order and the first hit wins, with compact JSON as the last resort.

use crate::context::{FlowMode, NodeContext};
use crate::model::{CanvasNode, NodeOutput};
use serde_json::Value;
use std::sync::Once;

/// Pulls text out of one output shape, or passes.
pub type Extractor = fn(&Value) -> Option<String>;

/// Chain used for pre-resolved v2 `inputs`.
pub const V2_CHAIN: &[Extractor] = &[
    plain_text,
    output_field,
    llm_openai_text,
    llm_gemini_text,
    gemini_text,
];

/// Chain used when inputs are derived from connections.
pub const LEGACY_CHAIN: &[Extractor] = &[
    plain_text,
    output_field,
    message_field,
    llm_openai_text,
    llm_gemini_text,
    gemini_text,
    provider_text,
];

static LEGACY_WARNING: Once = Once::new();

fn string_at<'v>(value: &'v Value, pointer: &str) -> Option<&'v str> {
    value.pointer(pointer).and_then(Value::as_str)
}

pub fn plain_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

pub fn output_field(value: &Value) -> Option<String> {
    string_at(value, "/output").map(str::to_string)
}

pub fn message_field(value: &Value) -> Option<String> {
    string_at(value, "/message").map(str::to_string)
}

/// OpenAI-compatible chat completion wrapped as `{ llm }`.
pub fn llm_openai_text(value: &Value) -> Option<String> {
    string_at(value, "/llm/choices/0/message/content").map(str::to_string)
}

/// Gemini `generateContent` response wrapped as `{ llm }`.
pub fn llm_gemini_text(value: &Value) -> Option<String> {
    string_at(value, "/llm/candidates/0/content/parts/0/text").map(str::to_string)
}

pub fn gemini_text(value: &Value) -> Option<String> {
    string_at(value, "/gemini/candidates/0/content/parts/0/text").map(str::to_string)
}

pub fn provider_text(value: &Value) -> Option<String> {
    string_at(value, "/provider/candidates/0/content/parts/0/text").map(str::to_string)
}

/// Runs `chain` over `value`, falling back to compact JSON text.
pub fn extract_text(value: &Value, chain: &[Extractor]) -> String {
    chain
        .iter()
        .find_map(|extract| extract(value))
        .unwrap_or_else(|| value.to_string())
}

/// Text of an output as seen by the v2 chain.
pub fn v2_text(output: &NodeOutput) -> String {
    match output {
        NodeOutput::Text(text) => text.clone(),
        other => extract_text(&other.to_value(), V2_CHAIN),
    }
}

/// Text of an output as seen by the legacy chain.
pub fn legacy_text(output: &NodeOutput) -> String {
    match output {
        NodeOutput::Text(text) => text.clone(),
        other => extract_text(&other.to_value(), LEGACY_CHAIN),
    }
}

fn is_ui_source(node: &CanvasNode) -> bool {
    node.node_type == "ui" || node.subtype.as_deref() == Some("ui")
}

/// Text contributed by an upstream `ui` node.
fn ui_source_text(node: &CanvasNode, output: Option<&NodeOutput>) -> String {
    match output {
        Some(NodeOutput::Text(text)) if !text.is_empty() => return text.clone(),
        Some(output) => {
            for key in ["message", "content"] {
                if let Some(text) = output.field(key).and_then(Value::as_str) {
                    if !text.is_empty() {
                        return text.to_string();
                    }
                }
            }
        }
        None => {}
    }
    node.data_text("content")
        .or_else(|| node.data_text("message"))
        .unwrap_or_default()
        .to_string()
}

/// Upstream values of the current node as text, in a stable order.
///
/// A non-empty `inputs` map wins; otherwise incoming connections are scanned
/// and each source's recorded output is read. Sources with no recorded output
/// and empty texts are dropped.
pub fn get_input_values(ctx: &NodeContext<'_>) -> Vec<String> {
    if let Some(inputs) = ctx.inputs.filter(|inputs| !inputs.is_empty()) {
        return inputs
            .values()
            .map(v2_text)
            .filter(|text| !text.is_empty())
            .collect();
    }

    let node_id = ctx.current_node.id.as_str();
    ctx.connections
        .iter()
        .filter(|conn| conn.target_node == node_id)
        .filter_map(|conn| {
            let output = ctx.node_outputs.get(&conn.source_node);
            let upstream = ctx.nodes.iter().find(|n| n.id == conn.source_node);
            match upstream {
                Some(node) if is_ui_source(node) => Some(ui_source_text(node, output)),
                _ => output.map(legacy_text),
            }
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Scenario block appended to prompts, when any scenario field is set.
pub fn scenario_block(ctx: &NodeContext<'_>) -> Option<String> {
    let scenario = ctx.scenario()?;
    let mut lines = vec!["Scenario Context:".to_string()];

    if let Some(description) = scenario.description.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Description: {description}"));
    }
    if let Some(timezone) = scenario.timezone.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Timezone: {timezone}"));
    }
    if let Some(hours) = &scenario.working_hours {
        if hours.start.is_some() || hours.end.is_some() {
            lines.push(format!(
                "Working Hours: {}-{}",
                hours.start.as_deref().unwrap_or_default(),
                hours.end.as_deref().unwrap_or_default()
            ));
        }
    }
    if let Some(rules) = scenario.business_rules.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Business Rules: {rules}"));
    }

    let has_fields = scenario.description.as_deref().is_some_and(|s| !s.is_empty())
        || scenario.timezone.as_deref().is_some_and(|s| !s.is_empty())
        || scenario.working_hours.is_some()
        || scenario.business_rules.as_deref().is_some_and(|s| !s.is_empty());
    has_fields.then(|| lines.join("\n"))
}

/// Input values joined by blank lines, followed by the scenario block.
pub fn format_input_context(ctx: &NodeContext<'_>) -> String {
    if ctx.mode == Some(FlowMode::Legacy) {
        LEGACY_WARNING.call_once(|| {
            tracing::warn!(
                node_id = %ctx.current_node.id,
                "legacy node context in use; migrate to namespaced inputs"
            );
        });
    }

    let mut parts = Vec::new();
    let inputs = get_input_values(ctx);
    if !inputs.is_empty() {
        parts.push(inputs.join("\n\n"));
    }
    if let Some(block) = scenario_block(ctx) {
        parts.push(block);
    }
    parts.join("\n\n")
}

/// Input values joined by newlines; the text deterministic routers match on.
pub fn joined_input(ctx: &NodeContext<'_>) -> String {
    get_input_values(ctx).join("\n")
}
