use agentflow_core::{CanvasNode, Connection, ExecutionPolicy};
use agentflow_runtime::{ExecutorRegistry, FlowEngine};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

/// One source message fanning out to `width` relays that join on a single sink.
fn fanout_graph(width: usize) -> (Vec<CanvasNode>, Vec<Connection>) {
    let mut nodes = vec![
        CanvasNode::new("source", "message").with_data(json!({ "content": "ping" })),
        CanvasNode::new("sink", "message").with_policy(ExecutionPolicy::All),
    ];
    let mut connections = Vec::new();
    for i in 0..width {
        let id = format!("relay{i}");
        nodes.push(CanvasNode::new(&id, "message"));
        connections.push(Connection::new(format!("in{i}"), "source", &id));
        connections.push(Connection::new(format!("out{i}"), &id, "sink"));
    }
    (nodes, connections)
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_fanout");
    let registry = ExecutorRegistry::builtin(None);

    for &width in &[10usize, 100] {
        let (nodes, connections) = fanout_graph(width);
        group.bench_function(format!("fanout_{width}"), |b| {
            b.to_async(tokio::runtime::Runtime::new().unwrap()).iter(|| {
                let engine = FlowEngine::new(nodes.clone(), connections.clone(), &registry);
                async move {
                    let outputs = engine.execute(None).await;
                    black_box(outputs);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(name=benches; config=Criterion::default(); targets=bench_engine);
criterion_main!(benches);
