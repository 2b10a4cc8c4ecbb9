//! Effect Graph - node arena, connections and per-frame evaluation
//!
//! Nodes live in an insertion-ordered arena addressed by stable ids. The
//! topological order is cached and only recomputed after a structural change.

use crate::audio::AudioFeatures;
use crate::config::RenderSettings;
use crate::draw::{Argb, DrawSink};
use crate::effects::{draw_fallback, EffectNode, RenderContext};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::config::RenderMode;

/// Unique identifier for a graph node
pub type NodeId = u64;

/// Structural graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The connections form a cycle
    #[error("Effect graph contains a cycle through nodes {nodes:?}")]
    Cycle {
        /// Nodes that could not be ordered
        nodes: Vec<NodeId>,
    },

    /// A referenced node does not exist
    #[error("Node {0} not found")]
    UnknownNode(NodeId),

    /// A referenced port does not exist on the node
    #[error("Port '{port}' not found on node {node}")]
    UnknownPort {
        /// Node id
        node: NodeId,
        /// Port name
        port: String,
    },

    /// The connection already exists
    #[error("Connection {from}:{from_port} -> {to}:{to_port} already exists")]
    DuplicateConnection {
        /// Producer node
        from: NodeId,
        /// Producer port
        from_port: String,
        /// Consumer node
        to: NodeId,
        /// Consumer port
        to_port: String,
    },

    /// A node cannot feed itself
    #[error("Node {0} cannot be connected to itself")]
    SelfLoop(NodeId),
}

/// Producer port to consumer port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Producer node
    pub from: NodeId,
    /// Producer output port
    pub from_port: String,
    /// Consumer node
    pub to: NodeId,
    /// Consumer input port
    pub to_port: String,
}

/// Outcome of one evaluated frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Graph frame counter
    pub frame: u64,
    /// Nodes that rendered successfully
    pub rendered: usize,
    /// Nodes that returned an error or panicked
    pub failed: usize,
    /// Fallback visuals drawn
    pub fallbacks: usize,
    /// Active node in round-robin mode
    pub active_node: Option<NodeId>,
}

struct GraphNode {
    id: NodeId,
    node: Box<dyn EffectNode>,
    enabled: bool,
}

/// Directed acyclic graph of effect nodes
pub struct EffectGraph {
    nodes: Vec<GraphNode>,
    connections: Vec<Connection>,
    next_id: NodeId,
    /// Cached topological order, `None` when dirty
    order: Option<Vec<NodeId>>,
    mode: RenderMode,
    rotate_interval: f64,
    fallback_color: Argb,
    frame: u64,
    active_index: usize,
    rotation_started: Option<f64>,
}

impl Default for EffectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectGraph")
            .field(
                "nodes",
                &self
                    .nodes
                    .iter()
                    .map(|n| (n.id, n.node.name()))
                    .collect::<Vec<_>>(),
            )
            .field("connections", &self.connections)
            .field("mode", &self.mode)
            .finish()
    }
}

impl EffectGraph {
    /// Create an empty stacked graph
    pub fn new() -> Self {
        Self::with_settings(&RenderSettings::default())
    }

    /// Create an empty graph with the given render settings
    pub fn with_settings(settings: &RenderSettings) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_id: 1,
            order: None,
            mode: settings.mode,
            rotate_interval: settings.rotate_interval_secs.max(0.0),
            fallback_color: settings.fallback_color,
            frame: 0,
            active_index: 0,
            rotation_started: None,
        }
    }

    /// Add a node and return its id
    pub fn add_node(&mut self, node: Box<dyn EffectNode>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Graph: added node {} ({})", id, node.name());
        self.nodes.push(GraphNode {
            id,
            node,
            enabled: true,
        });
        self.order = None;
        id
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<Box<dyn EffectNode>> {
        let index = self.index_of(id)?;
        let removed = self.nodes.remove(index);
        self.connections.retain(|c| c.from != id && c.to != id);
        self.order = None;
        debug!("Graph: removed node {}", id);
        Some(removed.node)
    }

    /// Connect a producer output to a consumer input
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: &str,
        to: NodeId,
        to_port: &str,
    ) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfLoop(from));
        }
        let source = self.node(from).ok_or(GraphError::UnknownNode(from))?;
        if !source.outputs().contains(&from_port) {
            return Err(GraphError::UnknownPort {
                node: from,
                port: from_port.to_string(),
            });
        }
        let dest = self.node(to).ok_or(GraphError::UnknownNode(to))?;
        if !dest.inputs().contains(&to_port) {
            return Err(GraphError::UnknownPort {
                node: to,
                port: to_port.to_string(),
            });
        }

        let connection = Connection {
            from,
            from_port: from_port.to_string(),
            to,
            to_port: to_port.to_string(),
        };
        if self.connections.contains(&connection) {
            return Err(GraphError::DuplicateConnection {
                from,
                from_port: connection.from_port,
                to,
                to_port: connection.to_port,
            });
        }

        self.connections.push(connection);
        self.order = None;
        Ok(())
    }

    /// Remove a connection; returns false if it did not exist
    pub fn disconnect(&mut self, from: NodeId, from_port: &str, to: NodeId, to_port: &str) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| {
            !(c.from == from && c.from_port == from_port && c.to == to && c.to_port == to_port)
        });
        let removed = self.connections.len() != before;
        if removed {
            self.order = None;
        }
        removed
    }

    /// Enable or disable a node without changing the structure
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), GraphError> {
        let index = self.index_of(id).ok_or(GraphError::UnknownNode(id))?;
        self.nodes[index].enabled = enabled;
        Ok(())
    }

    /// Node is enabled
    pub fn is_enabled(&self, id: NodeId) -> bool {
        self.index_of(id).is_some_and(|i| self.nodes[i].enabled)
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&dyn EffectNode> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.node.as_ref())
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn EffectNode + 'static)> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| n.node.as_mut())
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// All connections
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Scheduling mode
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Change the scheduling mode
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
        self.rotation_started = None;
        self.active_index = 0;
    }

    /// Seconds per node in round-robin mode
    pub fn set_rotate_interval(&mut self, secs: f64) {
        self.rotate_interval = secs.max(0.0);
    }

    /// Color of the fallback visualization
    pub fn set_fallback_color(&mut self, color: Argb) {
        self.fallback_color = color;
    }

    /// Frames evaluated so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Topological order of all nodes.
    ///
    /// Kahn's algorithm; ties are broken by insertion order so the result is
    /// deterministic. Cached until the next structural change.
    pub fn execution_order(&mut self) -> Result<Vec<NodeId>, GraphError> {
        if let Some(order) = &self.order {
            return Ok(order.clone());
        }

        let index: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for c in &self.connections {
            if let (Some(&from), Some(&to)) = (index.get(&c.from), index.get(&c.to)) {
                successors[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(self.nodes[i].id);
            for &next in &successors[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let nodes: Vec<NodeId> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(i, _)| self.nodes[i].id)
                .collect();
            return Err(GraphError::Cycle { nodes });
        }

        debug!("Graph: execution order recomputed ({} nodes)", order.len());
        self.order = Some(order.clone());
        Ok(order)
    }

    /// Pick the round-robin node for this frame
    fn active_node(&mut self, enabled: &[NodeId], now: f64) -> Option<NodeId> {
        if enabled.is_empty() {
            return None;
        }
        match self.rotation_started {
            Some(started) if now < started => {
                // Clock went backwards (stream restarted)
                self.rotation_started = Some(now);
            }
            Some(started) if self.rotate_interval > 0.0 && now - started >= self.rotate_interval => {
                self.active_index = self.active_index.wrapping_add(1);
                self.rotation_started = Some(now);
            }
            None => self.rotation_started = Some(now),
            _ => {}
        }
        Some(enabled[self.active_index % enabled.len()])
    }

    /// Render one frame.
    ///
    /// Structural errors abort before anything is drawn. A node that fails or
    /// panics is replaced by the fallback visual and the frame continues.
    pub fn evaluate(
        &mut self,
        features: &AudioFeatures,
        sink: &mut dyn DrawSink,
        width: f32,
        height: f32,
    ) -> Result<FrameReport, GraphError> {
        let order = self.execution_order()?;
        self.frame += 1;

        let enabled: Vec<NodeId> = order
            .into_iter()
            .filter(|id| self.is_enabled(*id))
            .collect();

        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        let scheduled = match self.mode {
            RenderMode::Stacked => enabled,
            RenderMode::RoundRobin => {
                report.active_node = self.active_node(&enabled, features.time_seconds);
                report.active_node.into_iter().collect()
            }
        };

        if scheduled.is_empty() {
            draw_fallback(features, sink, width, height, self.fallback_color);
            report.fallbacks += 1;
            return Ok(report);
        }

        let frame = self.frame;
        let waveform = features.waveform();
        let spectrum = features.spectrum.as_slice();

        for id in scheduled {
            let Some(index) = self.index_of(id) else {
                continue;
            };
            let entry = &mut self.nodes[index];
            let mut ctx = RenderContext {
                features,
                sink: &mut *sink,
                width,
                height,
                frame,
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                entry.node.render(waveform, spectrum, &mut ctx)
            }));

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };

            match failure {
                None => report.rendered += 1,
                Some(reason) => {
                    warn!(
                        "Effect node {} ({}) failed on frame {}: {}",
                        id,
                        entry.node.name(),
                        frame,
                        reason
                    );
                    report.failed += 1;
                    draw_fallback(features, sink, width, height, self.fallback_color);
                    report.fallbacks += 1;
                }
            }
        }

        Ok(report)
    }

    /// Reset every node's per-run state
    pub fn reset(&mut self) {
        for entry in &mut self.nodes {
            entry.node.reset();
        }
        self.frame = 0;
        self.active_index = 0;
        self.rotation_started = None;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
