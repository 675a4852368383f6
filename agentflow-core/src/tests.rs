#[cfg(test)]
mod tests {
    use crate::resolve::*;
    use crate::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    fn outputs(pairs: &[(&str, NodeOutput)]) -> HashMap<String, NodeOutput> {
        pairs
            .iter()
            .map(|(id, out)| (id.to_string(), out.clone()))
            .collect()
    }

    #[test]
    fn test_canvas_node_deserializes_canvas_shape() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "n1",
            "type": "conversation",
            "subtype": "conversation-flow",
            "position": { "x": 10.0, "y": 20.0 },
            "size": { "width": 200.0, "height": 100.0 },
            "data": { "historyLength": 2 },
            "inputs": [{ "id": "in" }],
            "outputs": [{ "id": "out" }],
            "execution": { "policy": "any" }
        }))
        .unwrap();

        assert_eq!(node.kind(), "conversation-flow");
        assert_eq!(node.policy(), ExecutionPolicy::Any);
        assert_eq!(node.data_u64("historyLength"), Some(2));
        assert_eq!(node.tag(), "[conversation:conversation-flow]");
    }

    #[test]
    fn test_kind_falls_back_to_type() {
        let node = CanvasNode::new("a", "agent").with_subtype("");
        assert_eq!(node.kind(), "agent");
        assert_eq!(node.policy(), ExecutionPolicy::All);
        assert_eq!(node.title(), "a");

        let titled = node.with_data(json!({ "description": "Helper" }));
        assert_eq!(titled.title(), "Helper");
    }

    #[test]
    fn test_unknown_policy_means_all() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "x", "type": "agent", "execution": { "policy": "first" }
        }))
        .unwrap();
        assert_eq!(node.policy(), ExecutionPolicy::All);
    }

    #[test]
    fn test_ui_output_precedence() {
        let blank_content = CanvasNode::new("u", "ui")
            .with_data(json!({ "content": "  ", "message": "hello" }));
        assert_eq!(blank_content.ui_output(), "hello");

        let messages = CanvasNode::new("u", "gui").with_data(json!({
            "messages": ["first", { "text": "last" }]
        }));
        assert!(messages.is_ui());
        assert_eq!(messages.ui_output(), "last");

        assert_eq!(CanvasNode::new("u", "ui").ui_output(), "");
    }

    #[test]
    fn test_connection_builders_serialize_camel_case() {
        let conn = Connection::new("e1", "a", "b")
            .with_source_output("true-path")
            .with_target_input("in");
        let value = serde_json::to_value(&conn).unwrap();
        assert_eq!(value["sourceOutput"], "true-path");
        assert_eq!(value["targetInputId"], "in");
        assert_eq!(value["sourceNode"], "a");
    }

    #[test]
    fn test_node_output_helpers() {
        let err = NodeOutput::error("boom");
        assert!(err.is_error());
        assert_eq!(err.error_message(), Some("boom"));
        assert_eq!(err.to_json_string(), r#"{"error":"boom"}"#);

        assert_eq!(NodeOutput::from(json!("hi")), NodeOutput::text("hi"));
        assert_eq!(NodeOutput::from(json!(42)), NodeOutput::Value(json!(42)));
        assert!(NodeOutput::from(json!({ "output": 1 })).as_object().is_some());
    }

    #[test]
    fn test_extractor_chains() {
        let openai = NodeOutput::from(json!({
            "llm": { "choices": [{ "message": { "content": "from nvidia" } }] }
        }));
        let gemini = NodeOutput::from(json!({
            "gemini": { "candidates": [{ "content": { "parts": [{ "text": "from gemini" }] } }] }
        }));
        let provider = NodeOutput::from(json!({
            "provider": { "candidates": [{ "content": { "parts": [{ "text": "wrapped" }] } }] }
        }));
        let message = NodeOutput::from(json!({ "message": "legacy" }));

        assert_eq!(v2_text(&openai), "from nvidia");
        assert_eq!(legacy_text(&gemini), "from gemini");
        assert_eq!(legacy_text(&provider), "wrapped");
        assert_eq!(v2_text(&provider), provider.to_json_string());
        assert_eq!(legacy_text(&message), "legacy");
        assert_eq!(v2_text(&message), r#"{"message":"legacy"}"#);
        assert_eq!(v2_text(&NodeOutput::Value(json!(3))), "3");
    }

    #[test]
    fn test_legacy_inputs_follow_connections() {
        let nodes = vec![
            CanvasNode::new("a", "agent"),
            CanvasNode::new("b", "agent"),
            CanvasNode::new("c", "agent"),
        ];
        let connections = vec![
            Connection::new("e1", "a", "c"),
            Connection::new("e2", "b", "c"),
            Connection::new("e3", "missing", "c"),
        ];
        let node_outputs = outputs(&[
            ("a", NodeOutput::from(json!({ "output": "alpha" }))),
            ("b", NodeOutput::text("")),
        ]);
        let ctx = NodeContext::new(&nodes, &connections, &node_outputs, &nodes[2]);

        assert_eq!(get_input_values(&ctx), vec!["alpha".to_string()]);
    }

    #[test]
    fn test_ui_upstream_uses_message_then_data() {
        let nodes = vec![
            CanvasNode::new("chat", "ui").with_data(json!({ "content": "from data" })),
            CanvasNode::new("bot", "agent"),
        ];
        let connections = vec![Connection::new("e1", "chat", "bot")];

        let with_message = outputs(&[("chat", NodeOutput::from(json!({ "message": "typed" })))]);
        let ctx = NodeContext::new(&nodes, &connections, &with_message, &nodes[1]);
        assert_eq!(get_input_values(&ctx), vec!["typed".to_string()]);

        let empty = HashMap::new();
        let ctx = NodeContext::new(&nodes, &connections, &empty, &nodes[1]);
        assert_eq!(get_input_values(&ctx), vec!["from data".to_string()]);
    }

    #[test]
    fn test_v2_inputs_take_precedence() {
        let nodes = vec![CanvasNode::new("a", "agent"), CanvasNode::new("b", "agent")];
        let connections = vec![Connection::new("e1", "a", "b")];
        let node_outputs = outputs(&[("a", NodeOutput::text("legacy"))]);
        let mut inputs = BTreeMap::new();
        inputs.insert("in".to_string(), NodeOutput::from(json!({ "output": "namespaced" })));

        let ctx = NodeContext::new(&nodes, &connections, &node_outputs, &nodes[1])
            .with_inputs(&inputs)
            .with_mode(FlowMode::V2);
        assert_eq!(get_input_values(&ctx), vec!["namespaced".to_string()]);
    }

    #[test]
    fn test_format_input_context_with_scenario() {
        let nodes = vec![CanvasNode::new("a", "message"), CanvasNode::new("b", "agent")];
        let connections = vec![Connection::new("e1", "a", "b")];
        let node_outputs = outputs(&[("a", NodeOutput::text("Hello"))]);
        let options = RunOptions {
            scenario: Some(Scenario {
                description: Some("Support desk".to_string()),
                timezone: Some("UTC".to_string()),
                working_hours: Some(WorkingHours {
                    start: Some("09:00".to_string()),
                    end: None,
                }),
                business_rules: None,
            }),
        };
        let ctx = NodeContext::new(&nodes, &connections, &node_outputs, &nodes[1])
            .with_run_options(Some(&options));

        assert_eq!(
            format_input_context(&ctx),
            "Hello\n\nScenario Context:\nDescription: Support desk\nTimezone: UTC\nWorking Hours: 09:00-"
        );
    }

    #[test]
    fn test_empty_scenario_adds_nothing() {
        let nodes = vec![CanvasNode::new("a", "agent")];
        let options = RunOptions {
            scenario: Some(Scenario::default()),
        };
        let node_outputs = HashMap::new();
        let ctx = NodeContext::new(&nodes, &[], &node_outputs, &nodes[0])
            .with_run_options(Some(&options));
        assert_eq!(format_input_context(&ctx), "");
    }

    #[test]
    fn test_legacy_context_warns_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: Subscriber> Layer<S> for WarnCounter {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let nodes = vec![CanvasNode::new("a", "message"), CanvasNode::new("b", "agent")];
        let connections = vec![Connection::new("e1", "a", "b")];
        let node_outputs = outputs(&[("a", NodeOutput::text("Hello"))]);
        let ctx = NodeContext::new(&nodes, &connections, &node_outputs, &nodes[1])
            .with_mode(FlowMode::Legacy);

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let (first, second) = tracing::subscriber::with_default(subscriber, || {
            (format_input_context(&ctx), format_input_context(&ctx))
        });

        assert_eq!(first, "Hello");
        assert_eq!(second, first);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_provider_params_from_data() {
        let params = ProviderParams::from_data(&json!({
            "model": "gemini-2.5-flash",
            "temperature": 0.2,
            "maxTokens": 256,
            "topK": 40,
            "topP": "high",
            "stopSequences": ["END", 3]
        }));
        assert_eq!(params.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(params.max_tokens, Some(256));
        assert_eq!(params.top_k, Some(40));
        assert_eq!(params.top_p, None);
        assert_eq!(params.stop_sequences, vec!["END".to_string()]);
    }

    #[test]
    fn test_debug_slot_records_once_taken() {
        let nodes = vec![CanvasNode::new("a", "agent")];
        let node_outputs = HashMap::new();
        let slot = DebugSlot::default();
        let ctx = NodeContext::new(&nodes, &[], &node_outputs, &nodes[0]).with_debug(&slot);

        ctx.record_debug(DebugInfo {
            prompt: Some("p".to_string()),
            ..Default::default()
        });
        assert_eq!(slot.take().and_then(|d| d.prompt).as_deref(), Some("p"));
        assert!(slot.take().is_none());
    }
}
