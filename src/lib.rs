pub mod assertion;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod eval;
pub mod format;
pub mod lint;
pub mod provider;
pub mod template;

use crate::config::Settings;
use crate::provider::ProviderRegistry;

/// Registry with the built-in providers plus any aliases from user settings.
pub fn build_registry(settings: &Settings) -> ProviderRegistry {
    let mut registry = ProviderRegistry::with_builtins();
    for (alias, target) in &settings.providers {
        registry.alias(alias.as_str(), target.as_str());
    }
    registry
}
