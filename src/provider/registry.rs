use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{parse_spec, EchoProvider, ExecProvider, MockProvider, Provider};
use crate::error::{PeError, Result};

/// Builds a provider from the optional model part of a spec.
pub type ProviderFactory = Box<dyn Fn(Option<&str>) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Maps provider names to factories.
///
/// Built by the caller and passed where it is needed; there is no global
/// registry.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
    aliases: BTreeMap<String, String>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `echo`, `mock` and `exec` registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", |model| Ok(Arc::new(EchoProvider::new(model))));
        registry.register("mock", |model| Ok(Arc::new(MockProvider::new(model))));
        registry.register("exec", |command| {
            let command = command.unwrap_or_default();
            Ok(Arc::new(ExecProvider::new(command)?))
        });
        registry
    }

    /// Register a factory under `name` (case-insensitive), replacing any
    /// previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(Option<&str>) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into().to_lowercase(), Box::new(factory));
    }

    /// Make `alias` stand for the full provider spec `target`.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Create the provider for a spec such as `mock`, `echo:model` or
    /// `exec:./run.sh`.
    pub fn get(&self, spec: &str) -> Result<Arc<dyn Provider>> {
        let resolved = self.aliases.get(spec).map_or(spec, String::as_str);
        let (name, model) = parse_spec(resolved);

        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| PeError::ProviderNotFound {
                name: spec.to_string(),
            })?;

        debug!(spec, resolved, "creating provider");
        factory(model)
    }

    pub fn contains(&self, spec: &str) -> bool {
        let resolved = self.aliases.get(spec).map_or(spec, String::as_str);
        let (name, _) = parse_spec(resolved);
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered provider names, then aliases, each group sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect()
    }
}
