//! Registry catalog with association type resolution
//!
//! Association traversal hops from one resource type to another, so it needs
//! every registry at once. The catalog owns them, the shared schema provider,
//! and a concurrent cache of resolved association targets.

use super::authorizer::{AssociationAuthorizer, AssociationPermissions};
use super::tree::AssociationRequest;
use crate::config::{PolicyDocument, ResolverConfig};
use crate::error::{AuthzError, Result};
use crate::roles::{RegistryBuilder, RoleRegistry};
use crate::schema::SchemaProvider;
use crate::types::PermissionSet;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Statistics about association type cache performance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Resolutions answered by the alias table
    pub alias_fallbacks: usize,
    /// Total number of entries in cache
    pub entries: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Every registry of an application plus the schema they were built against
pub struct PolicyCatalog {
    schema: Arc<dyn SchemaProvider>,
    registries: HashMap<String, Arc<RoleRegistry>>,
    config: ResolverConfig,
    /// (resource type, association) -> target resource type
    type_cache: DashMap<(String, String), String>,
    stats: DashMap<&'static str, usize>,
}

impl fmt::Debug for PolicyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyCatalog")
            .field("registries", &self.registries.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("cached_types", &self.type_cache.len())
            .finish()
    }
}

impl PolicyCatalog {
    /// Empty catalog with default settings
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self::with_config(schema, ResolverConfig::default())
    }

    pub fn with_config(schema: Arc<dyn SchemaProvider>, config: ResolverConfig) -> Self {
        Self {
            schema,
            registries: HashMap::new(),
            config,
            type_cache: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema.as_ref()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Add a built registry; one registry per resource type
    pub fn register(&mut self, registry: impl Into<Arc<RoleRegistry>>) -> Result<Arc<RoleRegistry>> {
        let registry = registry.into();
        let resource_type = registry.resource_type().to_string();

        if self.registries.contains_key(&resource_type) {
            return Err(AuthzError::Configuration(format!(
                "a policy for '{}' is already registered",
                resource_type
            )));
        }

        info!(resource = %resource_type, roles = registry.role_count(), "Registered policy");
        self.registries.insert(resource_type, Arc::clone(&registry));
        Ok(registry)
    }

    /// Build `builder` against the catalog schema and register it
    pub fn declare(&mut self, builder: RegistryBuilder) -> Result<Arc<RoleRegistry>> {
        let registry = builder.build(self.schema.as_ref())?;
        self.register(registry)
    }

    /// Build a policy document against the catalog schema and register it
    pub fn load_document(&mut self, document: PolicyDocument) -> Result<Arc<RoleRegistry>> {
        let registry = document.into_registry(self.schema.as_ref())?;
        self.register(registry)
    }

    pub fn registry(&self, resource_type: &str) -> Option<&Arc<RoleRegistry>> {
        self.registries.get(resource_type)
    }

    /// Registry that must exist
    pub fn lookup(&self, resource_type: &str) -> Result<&Arc<RoleRegistry>> {
        self.registries.get(resource_type).ok_or_else(|| {
            AuthzError::Configuration(format!("no policy is registered for '{}'", resource_type))
        })
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Target resource type of `association` on `resource_type`
    ///
    /// The schema provider is asked first, then the owning registry's alias
    /// table. Successful resolutions are cached.
    pub fn resolve_association_type(&self, resource_type: &str, association: &str) -> Result<String> {
        let cache_key = (resource_type.to_string(), association.to_string());

        if let Some(target) = self.type_cache.get(&cache_key) {
            self.increment_stat("hits");
            return Ok(target.clone());
        }
        self.increment_stat("misses");

        let target = match self.schema.resolve_association_type(resource_type, association) {
            Some(target) => target,
            None => {
                let aliased = self
                    .registries
                    .get(resource_type)
                    .and_then(|registry| registry.association_alias(association))
                    .ok_or_else(|| AuthzError::NotFound {
                        resource: resource_type.to_string(),
                        association: association.to_string(),
                    })?;
                self.increment_stat("alias_fallbacks");
                debug!(
                    resource = resource_type,
                    association,
                    target = aliased,
                    "Association resolved through alias table"
                );
                aliased.to_string()
            }
        };

        trace!(resource = resource_type, association, target = %target, "Caching association type");
        self.type_cache.insert(cache_key, target.clone());
        Ok(target)
    }

    /// Authorize a request tree beneath `parent`, the permissions resolved
    /// for a resource of type `resource_type`
    pub fn authorize_associations(
        &self,
        resource_type: &str,
        parent: &PermissionSet,
        requested: &[AssociationRequest],
    ) -> Result<AssociationPermissions> {
        AssociationAuthorizer::new(self).authorize(resource_type, parent, requested)
    }

    /// Same as [`authorize_associations`](Self::authorize_associations) with
    /// the tree given as JSON
    pub fn authorize_associations_json(
        &self,
        resource_type: &str,
        parent: &PermissionSet,
        requested: &Value,
    ) -> Result<AssociationPermissions> {
        let requested =
            AssociationRequest::parse_list_within(requested, self.config.max_association_depth)?;
        self.authorize_associations(resource_type, parent, &requested)
    }

    /// Get association type cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            alias_fallbacks: self.get_stat("alias_fallbacks"),
            entries: self.type_cache.len(),
        }
    }

    /// Clear cached association types and statistics
    pub fn clear_cache(&self) {
        self.type_cache.clear();
        self.stats.clear();
    }

    fn increment_stat(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
