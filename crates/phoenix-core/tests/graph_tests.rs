use phoenix_core::effects::{EffectError, EffectNode, EffectParams, RenderContext};
use phoenix_core::{
    AudioFeatures, CommandRecorder, EffectGraph, FrameOrchestrator, GraphError, RenderMode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy)]
enum Behavior {
    Draw,
    Fail,
    Panic,
}

struct MockNode {
    name: &'static str,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    params: EffectParams,
}

fn mock(name: &'static str, behavior: Behavior) -> (Box<dyn EffectNode>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let node = MockNode {
        name,
        behavior,
        calls: Arc::clone(&calls),
        params: EffectParams::new(),
    };
    (Box::new(node), calls)
}

impl EffectNode for MockNode {
    fn name(&self) -> &str {
        self.name
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(
        &mut self,
        _waveform: &[f32],
        _spectrum: &[f32],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), EffectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Draw => {
                ctx.sink.clear(phoenix_core::Argb::BLACK);
                Ok(())
            }
            Behavior::Fail => Err(EffectError::Render("mock failure".to_string())),
            Behavior::Panic => panic!("mock panic"),
        }
    }
}

#[test]
fn test_acyclic_chain_orders_a_b_c() {
    let mut graph = EffectGraph::new();
    // Insert out of order so the result depends on the edges
    let c = graph.add_node(mock("c", Behavior::Draw).0);
    let a = graph.add_node(mock("a", Behavior::Draw).0);
    let b = graph.add_node(mock("b", Behavior::Draw).0);

    graph.connect(a, "image", b, "image").unwrap();
    graph.connect(b, "image", c, "image").unwrap();

    assert_eq!(graph.execution_order().unwrap(), vec![a, b, c]);
}

#[test]
fn test_cycle_is_structural_error() {
    let mut graph = EffectGraph::new();
    let a = graph.add_node(mock("a", Behavior::Draw).0);
    let b = graph.add_node(mock("b", Behavior::Draw).0);
    graph.connect(a, "image", b, "image").unwrap();
    graph.connect(b, "image", a, "image").unwrap();

    match graph.execution_order() {
        Err(GraphError::Cycle { nodes }) => {
            assert!(nodes.contains(&a) && nodes.contains(&b));
        }
        other => panic!("expected cycle error, got {:?}", other),
    }

    let mut sink = CommandRecorder::new();
    let result = graph.evaluate(&AudioFeatures::default(), &mut sink, 64.0, 64.0);
    assert!(matches!(result, Err(GraphError::Cycle { .. })));
    assert!(sink.is_empty(), "nothing may be drawn for a cyclic graph");
}

#[test]
fn test_failing_node_does_not_block_siblings() {
    let mut graph = EffectGraph::new();
    let (first, first_calls) = mock("first", Behavior::Draw);
    let (broken, broken_calls) = mock("broken", Behavior::Fail);
    let (panicky, panicky_calls) = mock("panicky", Behavior::Panic);
    let (last, last_calls) = mock("last", Behavior::Draw);
    let ids = [
        graph.add_node(first),
        graph.add_node(broken),
        graph.add_node(panicky),
        graph.add_node(last),
    ];
    for pair in ids.windows(2) {
        graph.connect(pair[0], "image", pair[1], "image").unwrap();
    }

    let features = AudioFeatures {
        rms: 0.3,
        ..Default::default()
    };
    let mut sink = CommandRecorder::new();
    for _ in 0..3 {
        let report = graph.evaluate(&features, &mut sink, 320.0, 240.0).unwrap();
        assert_eq!(report.rendered, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.fallbacks, 2);
    }

    assert_eq!(first_calls.load(Ordering::SeqCst), 3);
    assert_eq!(broken_calls.load(Ordering::SeqCst), 3);
    assert_eq!(panicky_calls.load(Ordering::SeqCst), 3);
    assert_eq!(last_calls.load(Ordering::SeqCst), 3);

    let kinds: Vec<&str> = sink.commands().iter().map(|c| c.kind()).collect();
    assert_eq!(&kinds[..4], &["clear", "circle", "circle", "clear"]);
}

#[test]
fn test_round_robin_single_active_node() {
    let mut graph = EffectGraph::new();
    graph.set_mode(RenderMode::RoundRobin);
    let (a, a_calls) = mock("a", Behavior::Draw);
    let (b, b_calls) = mock("b", Behavior::Draw);
    graph.add_node(a);
    graph.add_node(b);

    let mut sink = CommandRecorder::new();
    let report = graph
        .evaluate(&AudioFeatures::default(), &mut sink, 10.0, 10.0)
        .unwrap();
    assert_eq!(report.rendered, 1);
    assert_eq!(a_calls.load(Ordering::SeqCst) + b_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_orchestrator_rejects_cyclic_stage() {
    let orchestrator = FrameOrchestrator::new(&Default::default()).unwrap();
    let mut graph = EffectGraph::new();
    let a = graph.add_node(mock("a", Behavior::Draw).0);
    let b = graph.add_node(mock("b", Behavior::Draw).0);
    graph.connect(a, "image", b, "image").unwrap();
    graph.connect(b, "image", a, "image").unwrap();

    assert!(orchestrator.stager().stage(graph).is_err());
}
