//! Node registry for managing available node types.

use crate::config::PackConfig;
use crate::core::node::{Category, FilterNode, NodeMetadata};
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

/// Factory function for creating node instances.
pub type FilterFactory = Arc<dyn Fn() -> Box<dyn FilterNode> + Send + Sync>;

/// Registry entry containing metadata and factory.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Factory function to create instances.
    pub factory: FilterFactory,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: NodeMetadata,
    /// Whether this node is enabled.
    pub enabled: bool,
}

/// Registry for all available node types.
///
/// Nodes are kept in registration order and indexed by category. Display
/// names and category paths are derived from the registry's [`PackConfig`].
pub struct FilterRegistry {
    /// Nodes indexed by their unique ID.
    filters: IndexMap<String, RegistryEntry>,
    /// Node IDs grouped by category.
    categories: IndexMap<Category, Vec<String>>,
    config: PackConfig,
}

impl FilterRegistry {
    /// Create a new empty registry with the default configuration.
    pub fn new() -> Self {
        Self::empty_with_config(PackConfig::default())
    }

    /// Create an empty registry using `config` for naming.
    pub fn empty_with_config(config: PackConfig) -> Self {
        Self {
            filters: IndexMap::new(),
            categories: IndexMap::new(),
            config,
        }
    }

    /// Create a registry pre-populated with built-in nodes.
    pub fn with_builtins() -> Self {
        Self::with_config(PackConfig::default())
    }

    /// Create a registry with every built-in node, configured by `config`.
    pub fn with_config(config: PackConfig) -> Self {
        let mut registry = Self::empty_with_config(config.clone());
        crate::filters::builtin::register_all(&mut registry, &config);
        registry
    }

    /// Configuration used by this registry.
    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Register a node type, replacing any earlier one with the same ID.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn FilterNode> + Send + Sync + 'static,
    {
        // Create a temporary instance to get metadata
        let metadata = factory().metadata();
        let id = metadata.id.clone();
        let category = metadata.category;

        if self.filters.contains_key(&id) {
            self.unregister(&id);
        }
        debug!("Registered node '{}' in {}", id, category.display_name());

        self.filters.insert(
            id.clone(),
            RegistryEntry {
                factory: Arc::new(factory),
                metadata,
                enabled: true,
            },
        );
        self.categories.entry(category).or_default().push(id);
    }

    /// Create a new instance of a node by ID.
    pub fn create(&self, id: &str) -> Option<Box<dyn FilterNode>> {
        self.filters.get(id).filter(|e| e.enabled).map(|e| (e.factory)())
    }

    /// Get metadata for a node without creating an instance.
    pub fn get_metadata(&self, id: &str) -> Option<&NodeMetadata> {
        self.filters.get(id).map(|e| &e.metadata)
    }

    /// Prefixed display name of a node, e.g. `"jk Resize Image"`.
    pub fn display_name(&self, id: &str) -> Option<String> {
        self.get_metadata(id)
            .map(|m| self.config.display_name(&m.name))
    }

    /// Menu path of a node's category, e.g. `"jk Nodes/image"`.
    pub fn category_path(&self, id: &str) -> Option<String> {
        self.get_metadata(id)
            .map(|m| m.category.path(&self.config.category_root))
    }

    /// Check if a node is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Get all registered node IDs.
    pub fn filter_ids(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|s| s.as_str())
    }

    /// Get all registered nodes.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get nodes by category.
    pub fn filters_by_category(&self, category: &Category) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|ids| ids.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Search nodes by ID, name or description.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();

        self.filters
            .iter()
            .filter(|(_, entry)| {
                let name_match = entry.metadata.name.to_lowercase().contains(&query);
                let desc_match = entry.metadata.description.to_lowercase().contains(&query);
                let id_match = entry.metadata.id.to_lowercase().contains(&query);

                name_match || desc_match || id_match
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Enable or disable a node.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        if let Some(entry) = self.filters.get_mut(id) {
            entry.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Unregister a node.
    pub fn unregister(&mut self, id: &str) -> bool {
        if let Some(entry) = self.filters.shift_remove(id) {
            if let Some(ids) = self.categories.get_mut(&entry.metadata.category) {
                ids.retain(|i| i != id);
            }
            true
        } else {
            false
        }
    }

    /// Get the total number of registered nodes.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get count of enabled nodes.
    pub fn enabled_count(&self) -> usize {
        self.filters.values().filter(|e| e.enabled).count()
    }

    /// Get enabled nodes grouped by category, sorted by name.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&NodeMetadata>> {
        let mut grouped: IndexMap<Category, Vec<&NodeMetadata>> = IndexMap::new();

        for entry in self.filters.values().filter(|e| e.enabled) {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }

        for nodes in grouped.values_mut() {
            nodes.sort_by(|a, b| a.name.cmp(&b.name));
        }

        grouped
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    config: PackConfig,
    custom: Vec<FilterFactory>,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: PackConfig::default(),
            custom: Vec::new(),
            include_builtins: true,
        }
    }

    /// Use `config` for built-in nodes and naming.
    pub fn config(mut self, config: PackConfig) -> Self {
        self.config = config;
        self
    }

    /// Include or exclude built-in nodes.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Register a custom node, after the built-ins.
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn FilterNode> + Send + Sync + 'static,
    {
        self.custom.push(Arc::new(factory));
        self
    }

    /// Build the registry.
    pub fn build(self) -> FilterRegistry {
        let mut registry = if self.include_builtins {
            FilterRegistry::with_config(self.config)
        } else {
            FilterRegistry::empty_with_config(self.config)
        };
        for factory in self.custom {
            registry.register(move || factory());
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
