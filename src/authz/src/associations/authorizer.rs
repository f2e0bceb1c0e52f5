//! Association tree authorization
//!
//! Walks a request tree breadth-first. Each granted node gets a permission
//! set resolved on the target resource's registry from the roles the parent
//! presents to that association, limited to the actions under which the
//! parent granted it.

use super::catalog::PolicyCatalog;
use super::tree::{tree_depth, AssociationRequest};
use crate::engine::Evaluator;
use crate::error::{AuthzError, Result};
use crate::types::{union_roles, Action, FieldList, PermissionSet, RoleId};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// One association the subject may traverse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantedAssociation {
    /// Association name as requested
    pub name: String,
    /// Resource type the association resolved to
    pub resource_type: String,
    /// Permissions on the associated resource
    pub permissions: PermissionSet,
    /// Whether the request named nested associations beneath this one
    #[serde(skip)]
    pub nested: bool,
    /// Granted associations beneath this one
    pub children: Vec<GrantedAssociation>,
}

/// Nested write whitelist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePermit {
    /// Attribute of the resource itself
    Field(String),
    /// `<association><suffix>` key with the associated resource's permits
    Nested {
        key: String,
        permits: Vec<WritePermit>,
    },
}

impl Serialize for WritePermit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            WritePermit::Field(field) => serializer.serialize_str(field),
            WritePermit::Nested { key, permits } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(key, permits)?;
                map.end()
            }
        }
    }
}

/// Result of authorizing a request tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationPermissions {
    primary: PermissionSet,
    table: IndexMap<String, PermissionSet>,
    granted: Vec<GrantedAssociation>,
    denied: Vec<String>,
    suffix: String,
}

impl AssociationPermissions {
    /// Permissions of the resource the tree hangs from
    pub fn primary(&self) -> &PermissionSet {
        &self.primary
    }

    /// Flat association name -> permission set table; unauthorized
    /// associations are absent
    pub fn permissions(&self) -> &IndexMap<String, PermissionSet> {
        &self.table
    }

    pub fn get(&self, association: &str) -> Option<&PermissionSet> {
        self.table.get(association)
    }

    pub fn contains(&self, association: &str) -> bool {
        self.table.contains_key(association)
    }

    /// Granted associations as a tree
    pub fn granted(&self) -> &[GrantedAssociation] {
        &self.granted
    }

    /// Dotted paths of branches dropped for lack of a role to present
    pub fn denied(&self) -> &[String] {
        &self.denied
    }

    /// Granted request tree limited to associations permitted for `action`
    /// at every level
    pub fn permitted(&self, action: Action) -> Vec<AssociationRequest> {
        permitted_nodes(&self.primary, &self.granted, action)
    }

    /// `action` attributes of every granted association
    pub fn association_attributes(&self, action: Action) -> IndexMap<String, FieldList> {
        self.table
            .iter()
            .map(|(name, permissions)| {
                let fields = permissions.attributes_for(action).cloned().unwrap_or_default();
                (name.clone(), fields)
            })
            .collect()
    }

    /// `action` associations of every granted association
    pub fn association_associations(&self, action: Action) -> IndexMap<String, FieldList> {
        self.table
            .iter()
            .map(|(name, permissions)| {
                let fields = permissions.associations_for(action).cloned().unwrap_or_default();
                (name.clone(), fields)
            })
            .collect()
    }

    /// Show attributes per granted association
    pub fn show_permits(&self) -> IndexMap<String, FieldList> {
        self.association_attributes(Action::Show)
    }

    /// Write whitelist for `action`: the primary attributes followed by one
    /// nested entry per association permitted for `action`
    pub fn write_permits(&self, action: Action) -> Vec<WritePermit> {
        let mut permits = field_permits(&self.primary, action);
        permits.extend(self.nested_permits(&self.primary, &self.granted, action));
        permits
    }

    fn nested_permits(
        &self,
        parent: &PermissionSet,
        nodes: &[GrantedAssociation],
        action: Action,
    ) -> Vec<WritePermit> {
        nodes
            .iter()
            .filter(|node| permits_association(parent, &node.name, action))
            .map(|node| {
                let mut permits = field_permits(&node.permissions, action);
                permits.extend(self.nested_permits(&node.permissions, &node.children, action));
                WritePermit::Nested {
                    key: format!("{}{}", node.name, self.suffix),
                    permits,
                }
            })
            .collect()
    }
}

fn permits_association(parent: &PermissionSet, association: &str, action: Action) -> bool {
    parent
        .associations_for(action)
        .is_some_and(|fields| fields.contains(association))
}

fn field_permits(permissions: &PermissionSet, action: Action) -> Vec<WritePermit> {
    permissions
        .attributes_for(action)
        .map(|fields| fields.iter().cloned().map(WritePermit::Field).collect())
        .unwrap_or_default()
}

fn permitted_nodes(
    parent: &PermissionSet,
    nodes: &[GrantedAssociation],
    action: Action,
) -> Vec<AssociationRequest> {
    nodes
        .iter()
        .filter(|node| permits_association(parent, &node.name, action))
        .map(|node| {
            if node.nested {
                AssociationRequest::nested(
                    node.name.clone(),
                    permitted_nodes(&node.permissions, &node.children, action),
                )
            } else {
                AssociationRequest::name(node.name.clone())
            }
        })
        .collect()
}

/// Arena node built during traversal
struct Visited {
    name: String,
    resource_type: String,
    permissions: PermissionSet,
    nested: bool,
    children: Vec<usize>,
}

/// Pending request node and where its result attaches
struct Pending<'q> {
    parent: Option<usize>,
    parent_type: String,
    path: String,
    request: &'q AssociationRequest,
}

/// Authorizes request trees against a [`PolicyCatalog`]
pub struct AssociationAuthorizer<'c> {
    catalog: &'c PolicyCatalog,
}

impl<'c> AssociationAuthorizer<'c> {
    pub fn new(catalog: &'c PolicyCatalog) -> Self {
        Self { catalog }
    }

    /// Authorize `requested` beneath `primary`, the permissions resolved for
    /// a resource of type `resource_type`
    pub fn authorize(
        &self,
        resource_type: &str,
        primary: &PermissionSet,
        requested: &[AssociationRequest],
    ) -> Result<AssociationPermissions> {
        let config = self.catalog.config();
        let depth = tree_depth(requested);
        if depth > config.max_association_depth {
            return Err(AuthzError::Validation(format!(
                "association request is {} levels deep, the limit is {}",
                depth, config.max_association_depth
            )));
        }

        let mut arena: Vec<Visited> = Vec::new();
        let mut roots: Vec<usize> = Vec::new();
        let mut table: IndexMap<String, PermissionSet> = IndexMap::new();
        let mut denied: Vec<String> = Vec::new();

        let mut queue: VecDeque<Pending<'_>> = requested
            .iter()
            .map(|request| Pending {
                parent: None,
                parent_type: resource_type.to_string(),
                path: request.association().to_string(),
                request,
            })
            .collect();

        while let Some(pending) = queue.pop_front() {
            let name = pending.request.association();
            let parent = match pending.parent {
                Some(index) => &arena[index].permissions,
                None => primary,
            };

            let actions = parent.actions_granting(name);
            if actions.is_empty() {
                debug!(
                    resource = %pending.parent_type,
                    association = name,
                    "Association not granted, dropping branch"
                );
                continue;
            }

            let target = self
                .catalog
                .resolve_association_type(&pending.parent_type, name)?;

            let presented = self.presented_roles(&pending.parent_type, parent, name)?;

            if presented.is_empty() {
                if config.fail_closed_associations {
                    return Err(AuthzError::not_authorized(
                        name,
                        target,
                        "no associated or default role to present",
                    ));
                }
                warn!(
                    resource = %pending.parent_type,
                    association = name,
                    "No role to present, denying branch"
                );
                denied.push(pending.path);
                continue;
            }

            let Some(permissions) = self.resolve_child(&target, &presented, &actions)? else {
                continue;
            };

            match table.get_mut(name) {
                Some(existing) => existing.absorb(&permissions),
                None => {
                    table.insert(name.to_string(), permissions.clone());
                }
            }

            let index = arena.len();
            arena.push(Visited {
                name: name.to_string(),
                resource_type: target.clone(),
                permissions,
                nested: matches!(pending.request, AssociationRequest::Nested { .. }),
                children: Vec::new(),
            });
            match pending.parent {
                Some(parent) => arena[parent].children.push(index),
                None => roots.push(index),
            }

            for child in pending.request.children() {
                queue.push_back(Pending {
                    parent: Some(index),
                    parent_type: target.clone(),
                    path: format!("{}.{}", pending.path, child.association()),
                    request: child,
                });
            }
        }

        debug!(
            resource = resource_type,
            granted = table.len(),
            denied = denied.len(),
            "Authorized associations"
        );

        Ok(AssociationPermissions {
            primary: primary.clone(),
            table,
            granted: assemble(&arena, &roots),
            denied,
            suffix: config.nested_attributes_suffix.clone(),
        })
    }

    /// Union of the roles each satisfied parent role is presented as on
    /// `association`, in role order
    fn presented_roles(
        &self,
        parent_type: &str,
        parent: &PermissionSet,
        association: &str,
    ) -> Result<Vec<RoleId>> {
        let registry = self.catalog.lookup(parent_type)?;

        let mut presented = Vec::new();
        for role in &parent.roles.for_current_model {
            if let Some(roles) = registry.associated_roles(role, association) {
                union_roles(&mut presented, &roles);
            }
        }
        Ok(presented)
    }

    /// Merge the presented roles on the target registry, limited to `actions`
    ///
    /// Roles the target does not declare are skipped; `None` when none remain.
    fn resolve_child(
        &self,
        target: &str,
        presented: &[RoleId],
        actions: &[Action],
    ) -> Result<Option<PermissionSet>> {
        let registry = self.catalog.lookup(target)?;

        let mut roles = Vec::with_capacity(presented.len());
        for role in presented {
            if registry.contains(role) {
                roles.push(role.as_str());
            } else {
                warn!(
                    resource = target,
                    role = %role,
                    "Presented role is not declared on the associated policy, skipping"
                );
            }
        }

        if roles.is_empty() {
            debug!(resource = target, "No presented role applies, dropping branch");
            return Ok(None);
        }

        let merged = Evaluator::new(registry).merge(roles)?;
        Ok(Some(merged.restricted_to(actions)))
    }
}

fn assemble(arena: &[Visited], indices: &[usize]) -> Vec<GrantedAssociation> {
    indices
        .iter()
        .map(|&index| {
            let node = &arena[index];
            GrantedAssociation {
                name: node.name.clone(),
                resource_type: node.resource_type.clone(),
                permissions: node.permissions.clone(),
                nested: node.nested,
                children: assemble(arena, &node.children),
            }
        })
        .collect()
}
