//! Resolver configuration and declarative policy documents

use crate::associations::DEFAULT_MAX_DEPTH;
use crate::error::{AuthzError, Result};
use crate::restriction::{RestrictionOverrides, RestrictionTable};
use crate::roles::{RoleDeclaration, RoleRegistry};
use crate::schema::SchemaProvider;
use crate::types::RoleId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Association traversal settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Deepest association request tree accepted
    #[serde(default = "default_max_association_depth")]
    pub max_association_depth: usize,

    /// Abort the whole request when an association branch has no role to
    /// propagate; when `false` the branch is dropped and reported as denied
    #[serde(default = "default_true")]
    pub fail_closed_associations: bool,

    /// Suffix of nested write keys, e.g. `posts_attributes`
    #[serde(default = "default_nested_attributes_suffix")]
    pub nested_attributes_suffix: String,
}

fn default_true() -> bool { true }
fn default_max_association_depth() -> usize { DEFAULT_MAX_DEPTH }
fn default_nested_attributes_suffix() -> String { "_attributes".to_string() }

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_association_depth: default_max_association_depth(),
            fail_closed_associations: default_true(),
            nested_attributes_suffix: default_nested_attributes_suffix(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML configuration
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_association_depth == 0 {
            return Err(AuthzError::Configuration(
                "max_association_depth must be at least 1".to_string(),
            ));
        }

        if self.nested_attributes_suffix.is_empty() {
            return Err(AuthzError::Configuration(
                "nested_attributes_suffix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Declarative description of one policy type
///
/// ```toml
/// resource = "post"
///
/// [restrictions.extend]
/// create_attributes = ["slug"]
///
/// [default_associated_roles]
/// comments = ["viewer"]
///
/// [[roles]]
/// name = "author"
/// attributes = "save_all"
/// associations = { show = ["comments"] }
/// associated_as = { comments = "commenter" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Resource type the roles apply to
    pub resource: String,

    /// Overrides on top of the inherited restriction table
    #[serde(default)]
    pub restrictions: RestrictionOverrides,

    /// Roles presented to an association when a role declares no alias
    #[serde(default)]
    pub default_associated_roles: IndexMap<String, Vec<RoleId>>,

    /// Roles presented to any association without aliases or defaults
    #[serde(default)]
    pub fallback_associated_roles: Vec<RoleId>,

    /// association name -> target resource type
    #[serde(default)]
    pub association_aliases: IndexMap<String, String>,

    #[serde(default)]
    pub roles: Vec<RoleDeclaration>,
}

impl PolicyDocument {
    /// Load a document, choosing the format by extension (`.json` or TOML)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Build a registry on top of the base restriction defaults
    pub fn into_registry(self, schema: &dyn SchemaProvider) -> Result<RoleRegistry> {
        self.into_registry_with(&RestrictionTable::defaults(), schema)
    }

    /// Build a registry inheriting restrictions from `parent`
    pub fn into_registry_with(
        self,
        parent: &RestrictionTable,
        schema: &dyn SchemaProvider,
    ) -> Result<RoleRegistry> {
        debug!(
            resource = %self.resource,
            roles = self.roles.len(),
            "Building registry from policy document"
        );

        let restrictions = RestrictionTable::inherit(parent).with_overrides(&self.restrictions);
        let mut builder = RoleRegistry::builder(self.resource)
            .restrictions(restrictions)
            .fallback_associated_roles(self.fallback_associated_roles);

        for (association, roles) in self.default_associated_roles {
            builder = builder.default_associated_roles(association, roles);
        }
        for (association, target) in self.association_aliases {
            builder = builder.association_alias(association, target);
        }
        for role in self.roles {
            builder = builder.role(role);
        }

        builder.build(schema)
    }
}
