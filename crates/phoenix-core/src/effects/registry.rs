//! Effect registry - maps legacy type ids to node factories
//!
//! The registry is an ordinary value owned by the application. Tests build
//! their own instances with whatever factories they need.

use super::nodes::{
    ClearScreen, Comment, Convolution, PassThrough, Ring, SimpleSpectrum, Superscope,
    TextOverlay, CLEAR_SCREEN_ID, COMMENT_ID, CONVOLUTION_ID, RING_ID, SIMPLE_SPECTRUM_ID,
    SUPERSCOPE_ID, TEXT_ID,
};
use super::{EffectError, EffectNode, IMAGE_PORT};
use crate::config::RenderSettings;
use crate::graph::{EffectGraph, NodeId};
use crate::preset::{EffectDescriptor, ParamValue, Scope, ScopeSource, UnifiedPresetData};
use crate::CoreError;
use std::collections::HashMap;
use tracing::{debug, info};

/// Creates a node from a parsed descriptor
pub type EffectFactory =
    Box<dyn Fn(&EffectDescriptor) -> Result<Box<dyn EffectNode>, EffectError> + Send + Sync>;

/// Type id to factory table
pub struct EffectRegistry {
    factories: HashMap<i32, EffectFactory>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<i32> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("EffectRegistry").field("ids", &ids).finish()
    }
}

impl EffectRegistry {
    /// Registry without any factories; every id becomes a pass-through node
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with all built-in nodes
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(SIMPLE_SPECTRUM_ID, |d| {
            Ok(Box::new(SimpleSpectrum::from_descriptor(d)?))
        });
        registry.register(RING_ID, |_| Ok(Box::new(Ring::default())));
        registry.register(COMMENT_ID, |d| {
            let text = d
                .param("text")
                .and_then(ParamValue::as_text)
                .unwrap_or_default();
            Ok(Box::new(Comment::new(text)))
        });
        registry.register(CLEAR_SCREEN_ID, |_| Ok(Box::new(ClearScreen::default())));
        registry.register(TEXT_ID, |d| {
            let text = d
                .param("text")
                .and_then(ParamValue::as_text)
                .unwrap_or_default();
            Ok(Box::new(TextOverlay::new(text)))
        });
        registry.register(SUPERSCOPE_ID, |d| {
            Ok(Box::new(Superscope::from_descriptor(d)?))
        });
        registry.register(CONVOLUTION_ID, |d| {
            Ok(Box::new(Convolution::from_descriptor(d)?))
        });
        registry
    }

    /// Register or replace the factory for `type_id`
    pub fn register<F>(&mut self, type_id: i32, factory: F)
    where
        F: Fn(&EffectDescriptor) -> Result<Box<dyn EffectNode>, EffectError> + Send + Sync + 'static,
    {
        self.factories.insert(type_id, Box::new(factory));
    }

    /// A dedicated factory exists for `type_id`
    pub fn contains(&self, type_id: i32) -> bool {
        self.factories.contains_key(&type_id)
    }

    /// Create a node for a descriptor; unknown ids yield a pass-through node
    pub fn create(&self, desc: &EffectDescriptor) -> Result<Box<dyn EffectNode>, EffectError> {
        match self.factories.get(&desc.type_id) {
            Some(factory) => factory(desc),
            None => {
                debug!(
                    "No factory for effect id {} ({}), using pass-through",
                    desc.type_id, desc.name
                );
                Ok(Box::new(PassThrough::from_descriptor(desc)))
            }
        }
    }

    /// Create a superscope node for a parsed scope
    pub fn create_scope(&self, scope: &Scope) -> Box<dyn EffectNode> {
        Box::new(Superscope::from_scope(scope))
    }

    /// Build an effect graph for a parsed preset.
    ///
    /// Effects become a chain in source order, followed by one superscope
    /// node per valid text scope. Scopes that came out of binary records are
    /// already represented by their effect node.
    pub fn build_graph(
        &self,
        preset: &UnifiedPresetData,
        settings: &RenderSettings,
    ) -> Result<EffectGraph, CoreError> {
        let mut graph = EffectGraph::with_settings(settings);
        let mut previous: Option<NodeId> = None;

        let mut effects: Vec<&EffectDescriptor> = preset.effects.iter().collect();
        effects.sort_by_key(|d| d.order);

        let scope_nodes = preset
            .scopes
            .iter()
            .filter(|s| s.valid && s.source != ScopeSource::Legacy)
            .map(|s| self.create_scope(s));

        let effect_nodes = effects
            .into_iter()
            .map(|d| self.create(d))
            .collect::<Result<Vec<_>, _>>()?;

        for node in effect_nodes.into_iter().chain(scope_nodes) {
            let id = graph.add_node(node);
            if let Some(prev) = previous {
                graph.connect(prev, IMAGE_PORT, id, IMAGE_PORT)?;
            }
            previous = Some(id);
        }

        // Validate now so a broken graph never reaches the render tick
        graph.execution_order()?;

        info!(
            "Built effect graph: {} nodes from {} effects and {} scopes",
            graph.len(),
            preset.effects.len(),
            preset.scopes.len()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::EffectCategory;

    fn descriptor(type_id: i32, order: usize) -> EffectDescriptor {
        EffectDescriptor::new(type_id, format!("Effect_{}", type_id), EffectCategory::Unknown, order)
    }

    #[test]
    fn test_unknown_id_is_pass_through() {
        let registry = EffectRegistry::builtin();
        let node = registry.create(&descriptor(4242, 0)).unwrap();
        assert_eq!(node.name(), "Effect_4242");
        assert_eq!(node.avs_id(), Some(4242));
        assert!(!registry.contains(4242));
    }

    #[test]
    fn test_isolated_registries() {
        let mut registry = EffectRegistry::empty();
        registry.register(7, |_| Ok(Box::new(Ring::default())));
        assert_eq!(registry.create(&descriptor(7, 0)).unwrap().name(), "Ring");
        assert!(!EffectRegistry::builtin().contains(7));
    }

    #[test]
    fn test_build_graph_chains_in_source_order() {
        let mut preset = UnifiedPresetData::default();
        preset.effects.push(descriptor(RING_ID, 1));
        preset.effects.push(descriptor(CLEAR_SCREEN_ID, 0));

        let mut scope = Scope::new("wave", ScopeSource::Phoenix);
        scope.point_code = Some("y=sin(i);".to_string());
        preset.scopes.push(scope);
        let mut legacy = Scope::new("legacy", ScopeSource::Legacy);
        legacy.point_code = Some("y=cos(i);".to_string());
        preset.scopes.push(legacy);

        let mut graph = EffectRegistry::builtin()
            .build_graph(&preset, &RenderSettings::default())
            .unwrap();
        let order = graph.execution_order().unwrap();
        let names: Vec<String> = order
            .iter()
            .filter_map(|id| graph.node(*id).map(|n| n.name().to_string()))
            .collect();
        assert_eq!(names, vec!["Clear Screen", "Ring", "wave"]);
    }

    #[test]
    fn test_build_graph_rejects_invalid_node_config() {
        let mut preset = UnifiedPresetData::default();
        let mut desc = descriptor(CONVOLUTION_ID, 0);
        desc.parameters
            .insert("kernel".to_string(), ParamValue::IntArray(vec![0; 3]));
        preset.effects.push(desc);

        let result = EffectRegistry::builtin().build_graph(&preset, &RenderSettings::default());
        assert!(matches!(result, Err(CoreError::Effect(_))));
    }
}
