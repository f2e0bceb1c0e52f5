//! Per-policy role registry
//!
//! A [`RegistryBuilder`] collects declarations for one resource type and is
//! consumed by [`RegistryBuilder::build`], which expands every grant once.
//! The resulting [`RoleRegistry`] has no mutating methods and can be shared
//! behind an `Arc` across threads.

use super::declaration::{AssociatedAs, RoleDeclaration};
use super::grant::{GrantBuilder, ResolvedGrant};
use crate::error::{AuthzError, Result};
use crate::restriction::RestrictionTable;
use crate::schema::SchemaProvider;
use crate::types::{PermissionSet, RoleId, RoleSummary, GUEST_ROLE};
use indexmap::IndexMap;
use tracing::{debug, info};

/// One role after registration
#[derive(Debug, Clone)]
pub struct RegisteredRole {
    name: RoleId,
    grant: ResolvedGrant,
    associated_as: Option<AssociatedAs>,
    /// Grant plus role summary, as returned when this role alone is satisfied
    permissions: PermissionSet,
}

impl RegisteredRole {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grant(&self) -> &ResolvedGrant {
        &self.grant
    }

    pub fn associated_as(&self) -> Option<&AssociatedAs> {
        self.associated_as.as_ref()
    }

    /// Permission set of this role on its own
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Explicit aliases declared for `association`, if any
    pub fn alias_targets(&self, association: &str) -> Option<Vec<RoleId>> {
        match self.associated_as.as_ref()? {
            AssociatedAs::SelfRole => Some(vec![self.name.clone()]),
            AssociatedAs::Uniform(roles) => Some(roles.clone()),
            AssociatedAs::PerAssociation(map) => map.get(association).cloned(),
        }
    }
}

/// Frozen role table for one resource type
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    resource_type: String,
    roles: IndexMap<RoleId, RegisteredRole>,
    default_associated_roles: IndexMap<String, Vec<RoleId>>,
    fallback_associated_roles: Vec<RoleId>,
    /// association name -> target resource type
    association_aliases: IndexMap<String, String>,
}

impl RoleRegistry {
    /// Start declaring roles for `resource_type`
    pub fn builder(resource_type: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder::new(resource_type)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn role(&self, name: &str) -> Option<&RegisteredRole> {
        self.roles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Look up a role that must exist
    pub fn lookup(&self, name: &str) -> Result<&RegisteredRole> {
        self.roles.get(name).ok_or_else(|| {
            AuthzError::Configuration(format!(
                "role '{}' is not declared on '{}'",
                name, self.resource_type
            ))
        })
    }

    /// Declared role names in declaration order (guest included)
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Roles presented to `association` when a role declares no alias for it
    pub fn default_associated_roles(&self, association: &str) -> Option<&[RoleId]> {
        match self.default_associated_roles.get(association) {
            Some(roles) => Some(roles.as_slice()),
            None if !self.fallback_associated_roles.is_empty() => {
                Some(self.fallback_associated_roles.as_slice())
            }
            None => None,
        }
    }

    /// Roles `role` is presented as on `association`
    ///
    /// Explicit aliases win; otherwise the association's default roles apply.
    /// Undeclared roles get the defaults.
    pub fn associated_roles(&self, role: &str, association: &str) -> Option<Vec<RoleId>> {
        match self.roles.get(role) {
            Some(registered) => self.presented_roles(registered, association),
            None => self
                .default_associated_roles(association)
                .map(<[RoleId]>::to_vec),
        }
    }

    /// Target resource type registered for `association`
    pub fn association_alias(&self, association: &str) -> Option<&str> {
        self.association_aliases.get(association).map(String::as_str)
    }
}

/// Collects declarations for one resource type
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    resource_type: String,
    restrictions: RestrictionTable,
    declarations: Vec<RoleDeclaration>,
    default_associated_roles: IndexMap<String, Vec<RoleId>>,
    fallback_associated_roles: Vec<RoleId>,
    association_aliases: IndexMap<String, String>,
}

impl RegistryBuilder {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            restrictions: RestrictionTable::defaults(),
            declarations: Vec::new(),
            default_associated_roles: IndexMap::new(),
            fallback_associated_roles: Vec::new(),
            association_aliases: IndexMap::new(),
        }
    }

    /// Restriction table wildcard grants are narrowed by
    pub fn restrictions(mut self, restrictions: RestrictionTable) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Declare a role
    pub fn role(mut self, declaration: RoleDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Roles presented to `association` by roles with no alias for it
    pub fn default_associated_roles<I, T>(mut self, association: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleId>,
    {
        self.default_associated_roles
            .insert(association.into(), roles.into_iter().map(Into::into).collect());
        self
    }

    /// Roles presented to any association without aliases or defaults
    pub fn fallback_associated_roles<I, T>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleId>,
    {
        self.fallback_associated_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve `association` to `target_type` when the schema cannot
    pub fn association_alias(
        mut self,
        association: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        self.association_aliases
            .insert(association.into(), target_type.into());
        self
    }

    /// Expand every declaration and freeze the registry
    pub fn build(self, schema: &dyn SchemaProvider) -> Result<RoleRegistry> {
        let grants = GrantBuilder::new(&self.resource_type, schema, &self.restrictions);

        let mut declared: IndexMap<RoleId, (ResolvedGrant, Option<AssociatedAs>)> = IndexMap::new();
        for declaration in &self.declarations {
            if declaration.name.trim().is_empty() {
                return Err(AuthzError::Configuration(format!(
                    "role names on '{}' cannot be empty",
                    self.resource_type
                )));
            }
            if declared.contains_key(&declaration.name) {
                return Err(AuthzError::Configuration(format!(
                    "role '{}' is declared twice on '{}'",
                    declaration.name, self.resource_type
                )));
            }

            let grant = grants.build_grant(declaration)?;
            debug!(
                resource = %self.resource_type,
                role = %declaration.name,
                "Registered role"
            );
            declared.insert(
                declaration.name.clone(),
                (grant, declaration.associated_as.clone()),
            );
        }

        if !declared.contains_key(GUEST_ROLE) {
            declared.insert(GUEST_ROLE.to_string(), (ResolvedGrant::default(), None));
        }

        let mut registry = RoleRegistry {
            resource_type: self.resource_type,
            roles: IndexMap::with_capacity(declared.len()),
            default_associated_roles: self.default_associated_roles,
            fallback_associated_roles: self.fallback_associated_roles,
            association_aliases: self.association_aliases,
        };

        for (name, (grant, associated_as)) in declared {
            let mut role = RegisteredRole {
                name: name.clone(),
                grant,
                associated_as,
                permissions: PermissionSet::new(),
            };
            role.permissions = registry.role_permissions(&role);
            registry.roles.insert(name, role);
        }

        info!(
            resource = %registry.resource_type,
            roles = registry.roles.len(),
            aliases = registry.association_aliases.len(),
            "Role registry built"
        );

        Ok(registry)
    }
}

impl RoleRegistry {
    fn presented_roles(&self, role: &RegisteredRole, association: &str) -> Option<Vec<RoleId>> {
        role.alias_targets(association).or_else(|| {
            self.default_associated_roles(association)
                .map(<[RoleId]>::to_vec)
        })
    }

    /// Permission set of `role` alone: its grant, its name, and the roles it
    /// presents to every association it declares or is granted
    fn role_permissions(&self, role: &RegisteredRole) -> PermissionSet {
        let mut associations: Vec<String> = match role.associated_as.as_ref() {
            Some(AssociatedAs::PerAssociation(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        for association in role.grant.granted_associations().iter() {
            if !associations.contains(association) {
                associations.push(association.clone());
            }
        }

        let mut for_associated_models = IndexMap::new();
        for association in associations {
            let roles = self.presented_roles(role, &association);
            if let Some(roles) = roles.filter(|roles| !roles.is_empty()) {
                for_associated_models.insert(association, roles);
            }
        }

        PermissionSet {
            attributes: role.grant.attributes.clone(),
            associations: role.grant.associations.clone(),
            roles: RoleSummary {
                for_current_model: vec![role.name.clone()],
                for_associated_models,
            },
        }
    }
}
