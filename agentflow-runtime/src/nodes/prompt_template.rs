use super::message::variable;
use super::{object, render_template};
use agentflow_core::resolve::{format_input_context, get_input_values};
use agentflow_core::{NodeContext, NodeExecutor, NodeFuture, Scenario};
use serde_json::Value;

fn scenario_field(scenario: Option<&Scenario>, key: &str) -> Option<String> {
    let scenario = scenario?;
    let hours = scenario.working_hours.as_ref();
    match key {
        "description" => scenario.description.clone(),
        "timezone" => scenario.timezone.clone(),
        "businessRules" => scenario.business_rules.clone(),
        "workingHours.start" => hours.and_then(|h| h.start.clone()),
        "workingHours.end" => hours.and_then(|h| h.end.clone()),
        _ => None,
    }
}

/// Renders a prompt from inputs, scenario fields and variables.
pub struct PromptTemplateExecutor {
    kind: String,
}

impl PromptTemplateExecutor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl Default for PromptTemplateExecutor {
    fn default() -> Self {
        Self::new("prompt-template")
    }
}

impl NodeExecutor for PromptTemplateExecutor {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let template = node.data_str("template").unwrap_or_default();
            let variables = node.data_value("variables");
            let inputs = get_input_values(&ctx);
            let scenario = ctx.scenario();

            let rendered = render_template(template, |key| {
                if key == "input" {
                    return Some(format_input_context(&ctx));
                }
                if let Some(index) = key.strip_prefix("inputs.") {
                    return index.parse::<usize>().ok().and_then(|i| inputs.get(i).cloned());
                }
                if let Some(field) = key.strip_prefix("scenario.") {
                    return scenario_field(scenario, field);
                }
                variable(variables, key)
            });

            Ok(object([
                ("output", Value::String(rendered.clone())),
                ("prompt", Value::String(rendered)),
            ]))
        })
    }
}
