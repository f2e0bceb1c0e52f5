//! Grant expansion
//!
//! Turns one role's raw [`FieldSpec`] into a concrete `action -> fields`
//! map. Wildcards and `all` are expanded against the resource schema and
//! narrowed by the policy's restriction table; `all_minus` and literal lists
//! are taken as written.

use super::declaration::{FieldSpec, FieldValue, RoleDeclaration, Wildcard};
use crate::error::{AuthzError, Result};
use crate::restriction::RestrictionTable;
use crate::schema::SchemaProvider;
use crate::types::{Action, ActionMap, FieldKind, FieldList};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Expanded grants of one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGrant {
    /// Attribute names per action
    pub attributes: ActionMap,
    /// Association names per action
    pub associations: ActionMap,
}

impl ResolvedGrant {
    /// Grant map for one field kind
    pub fn for_kind(&self, kind: FieldKind) -> &ActionMap {
        match kind {
            FieldKind::Attributes => &self.attributes,
            FieldKind::Associations => &self.associations,
        }
    }

    /// Every association granted under any action, first-seen order
    pub fn granted_associations(&self) -> FieldList {
        self.associations
            .values()
            .flat_map(|fields| fields.iter().cloned())
            .collect()
    }
}

/// Expands declarations for one resource type
pub struct GrantBuilder<'a> {
    resource_type: &'a str,
    schema: &'a dyn SchemaProvider,
    restrictions: &'a RestrictionTable,
}

impl<'a> GrantBuilder<'a> {
    pub fn new(
        resource_type: &'a str,
        schema: &'a dyn SchemaProvider,
        restrictions: &'a RestrictionTable,
    ) -> Self {
        Self {
            resource_type,
            schema,
            restrictions,
        }
    }

    /// Expand both halves of a declaration
    pub fn build_grant(&self, declaration: &RoleDeclaration) -> Result<ResolvedGrant> {
        Ok(ResolvedGrant {
            attributes: self.build(declaration.attributes.as_ref(), FieldKind::Attributes)?,
            associations: self.build(declaration.associations.as_ref(), FieldKind::Associations)?,
        })
    }

    /// Expand one spec; an absent spec grants nothing
    pub fn build(&self, spec: Option<&FieldSpec>, kind: FieldKind) -> Result<ActionMap> {
        let mut grants = ActionMap::new();

        match spec {
            None => {}
            Some(FieldSpec::Wildcard(wildcard)) => {
                self.expand_wildcard(*wildcard, kind, &mut grants)?;
            }
            Some(FieldSpec::Explicit(entries)) => {
                for (key, value) in entries {
                    for action in key.expand() {
                        let fields = self.expand_value(value, *action, kind)?;
                        grants.entry(*action).or_default().union(fields.into_vec());
                    }
                }
            }
        }

        trace!(
            resource = self.resource_type,
            kind = %kind,
            actions = grants.len(),
            "Expanded grant"
        );

        Ok(grants)
    }

    fn expand_wildcard(
        &self,
        wildcard: Wildcard,
        kind: FieldKind,
        grants: &mut ActionMap,
    ) -> Result<()> {
        for action in wildcard.actions() {
            let fields = self.restricted_full_set(*action, kind)?;
            grants.entry(*action).or_default().union(fields.into_vec());
        }
        Ok(())
    }

    fn expand_value(&self, value: &FieldValue, action: Action, kind: FieldKind) -> Result<FieldList> {
        match value {
            FieldValue::All => self.restricted_full_set(action, kind),
            FieldValue::AllMinus(excluded) => Ok(self.full_set(kind)?.without(excluded)),
            FieldValue::List(fields) => Ok(fields.iter().cloned().collect()),
        }
    }

    /// Every field of `kind` minus the restricted list for `action`
    fn restricted_full_set(&self, action: Action, kind: FieldKind) -> Result<FieldList> {
        let restricted = self.restrictions.restricted(action, kind);
        Ok(self.full_set(kind)?.without(restricted))
    }

    fn full_set(&self, kind: FieldKind) -> Result<FieldList> {
        let fields = match kind {
            FieldKind::Attributes => self.schema.field_list(self.resource_type),
            FieldKind::Associations => self.schema.association_list(self.resource_type),
        };

        fields
            .map(|fields| fields.into_iter().collect())
            .ok_or_else(|| {
                AuthzError::Configuration(format!(
                    "'{}' has no discoverable {}, implicit declarations are not allowed",
                    self.resource_type, kind
                ))
            })
    }
}
