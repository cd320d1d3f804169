//! Provider - resolves named price models to ticks
//!
//! The outward face of the graph: callers (CLI "prices" command, RPC agent)
//! ask for models by name; the provider refreshes exactly the resolved
//! subgraphs and reads their root ticks. A returned tick's error slot, not
//! an `Err`, is the signal for "no usable price right now".

use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::error::ProviderError;
use crate::graph::node::Node;
use crate::graph::tick::Tick;
use crate::graph::updater::Updater;
use crate::types::Pair;

/// Descriptive metadata about a model's computation shape.
///
/// Declared for API completeness; [`Provider::model`] and
/// [`Provider::models`] do not build it yet and return
/// [`ProviderError::NotSupported`] so callers fail fast instead of
/// panicking.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub pair: Pair,
}

/// Name-to-root-node table plus the updater that refreshes it.
pub struct Provider {
    models: HashMap<String, Arc<Node>>,
    updater: Updater,
}

impl Provider {
    pub fn new(models: HashMap<String, Arc<Node>>, updater: Updater) -> Self {
        Self { models, updater }
    }

    /// Sorted list of configured model names.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    /// Refresh and read one model's tick.
    pub async fn tick(&self, name: &str) -> Result<Tick, ProviderError> {
        let node = self.resolve(name)?;
        self.updater.update(std::slice::from_ref(&node)).await?;
        Ok(node.tick())
    }

    /// Refresh all named models in one round, then read their ticks.
    pub async fn ticks(&self, names: &[&str]) -> Result<HashMap<String, Tick>, ProviderError> {
        let mut roots = Vec::with_capacity(names.len());
        for name in names {
            roots.push(self.resolve(name)?);
        }
        self.updater.update(&roots).await?;
        Ok(names
            .iter()
            .zip(roots)
            .map(|(name, node)| (name.to_string(), node.tick()))
            .collect())
    }

    /// Not implemented in this subsystem; callers must not invoke it.
    pub fn model(&self, _name: &str) -> Result<Model, ProviderError> {
        Err(ProviderError::NotSupported("model"))
    }

    /// Not implemented in this subsystem; callers must not invoke it.
    pub fn models(&self) -> Result<Vec<Model>, ProviderError> {
        Err(ProviderError::NotSupported("models"))
    }

    fn resolve(&self, name: &str) -> Result<Arc<Node>, ProviderError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::ModelNotFound(name.to_string()))
    }
}
