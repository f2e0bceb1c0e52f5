//! Core permission types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Role identifier (e.g., "author", "guest")
pub type RoleId = String;

/// Name of the role every anonymous subject is resolved as
pub const GUEST_ROLE: &str = "guest";

/// Resolved action a field list applies to
///
/// `save` is a declaration-time shorthand and never appears here; it is
/// expanded into `Create` and `Update` by the grant builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read access
    Show,
    /// Write access on creation
    Create,
    /// Write access on modification
    Update,
}

impl Action {
    /// All resolved actions, in canonical order
    pub const ALL: [Action; 3] = [Action::Show, Action::Create, Action::Update];

    /// Lowercase action name
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of a resource a grant talks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain fields of the resource
    Attributes,
    /// Named associations to other resources
    Associations,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Attributes => "attributes",
            FieldKind::Associations => "associations",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of unique field names
///
/// Order is first-seen order and is part of equality, so merged results
/// compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// Create an empty list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a field unless already present; returns whether it was added
    pub fn push(&mut self, field: impl Into<String>) -> bool {
        let field = field.into();
        if self.0.contains(&field) {
            return false;
        }
        self.0.push(field);
        true
    }

    /// Set union preserving first-seen order
    pub fn union<I, T>(&mut self, fields: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for field in fields {
            self.push(field);
        }
    }

    /// Copy of this list without the `excluded` fields
    pub fn without<S: AsRef<str>>(&self, excluded: &[S]) -> FieldList {
        FieldList(
            self.0
                .iter()
                .filter(|field| !excluded.iter().any(|e| e.as_ref() == field.as_str()))
                .cloned()
                .collect(),
        )
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<T: Into<String>> FromIterator<T> for FieldList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = FieldList::new();
        list.union(iter);
        list
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[&str]> for FieldList {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for FieldList {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == &other[..]
    }
}

/// Mapping from action to the fields it grants
pub type ActionMap = BTreeMap<Action, FieldList>;

/// Union `source` into `target`, action by action
pub(crate) fn union_action_maps(target: &mut ActionMap, source: &ActionMap) {
    for (action, fields) in source {
        target.entry(*action).or_default().union(fields.iter().cloned());
    }
}

/// Append roles not yet present, preserving order
pub(crate) fn union_roles<'a, I>(target: &mut Vec<RoleId>, roles: I)
where
    I: IntoIterator<Item = &'a RoleId>,
{
    for role in roles {
        if !target.contains(role) {
            target.push(role.clone());
        }
    }
}

/// Roles that produced a permission set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    /// Every role the subject satisfied on this resource, or exactly the guest role
    pub for_current_model: Vec<RoleId>,

    /// Roles presented to each named association of this resource
    #[serde(default)]
    pub for_associated_models: IndexMap<String, Vec<RoleId>>,
}

/// Field-level permissions resolved for one subject and resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Attribute names per action
    #[serde(default)]
    pub attributes: ActionMap,

    /// Association names per action
    #[serde(default)]
    pub associations: ActionMap,

    /// Roles the permissions were derived from
    #[serde(default)]
    pub roles: RoleSummary,
}

impl PermissionSet {
    /// Empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// Union another set into this one (fields, roles and associated roles)
    pub fn absorb(&mut self, other: &PermissionSet) {
        union_action_maps(&mut self.attributes, &other.attributes);
        union_action_maps(&mut self.associations, &other.associations);
        union_roles(&mut self.roles.for_current_model, &other.roles.for_current_model);
        for (association, roles) in &other.roles.for_associated_models {
            union_roles(
                self.roles
                    .for_associated_models
                    .entry(association.clone())
                    .or_default(),
                roles,
            );
        }
    }

    /// Copy limited to the given actions
    pub fn restricted_to(&self, actions: &[Action]) -> PermissionSet {
        let keep = |map: &ActionMap| -> ActionMap {
            map.iter()
                .filter(|(action, _)| actions.contains(action))
                .map(|(action, fields)| (*action, fields.clone()))
                .collect()
        };

        PermissionSet {
            attributes: keep(&self.attributes),
            associations: keep(&self.associations),
            roles: self.roles.clone(),
        }
    }

    /// Attributes granted for `action`, if any were declared
    pub fn attributes_for(&self, action: Action) -> Option<&FieldList> {
        self.attributes.get(&action)
    }

    /// Associations granted for `action`, if any were declared
    pub fn associations_for(&self, action: Action) -> Option<&FieldList> {
        self.associations.get(&action)
    }

    pub fn show_attributes(&self) -> Option<&FieldList> {
        self.attributes_for(Action::Show)
    }

    pub fn create_attributes(&self) -> Option<&FieldList> {
        self.attributes_for(Action::Create)
    }

    pub fn update_attributes(&self) -> Option<&FieldList> {
        self.attributes_for(Action::Update)
    }

    pub fn show_associations(&self) -> Option<&FieldList> {
        self.associations_for(Action::Show)
    }

    pub fn create_associations(&self) -> Option<&FieldList> {
        self.associations_for(Action::Create)
    }

    pub fn update_associations(&self) -> Option<&FieldList> {
        self.associations_for(Action::Update)
    }

    /// Actions under which `association` is granted, in canonical order
    pub fn actions_granting(&self, association: &str) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| {
                self.associations
                    .get(action)
                    .is_some_and(|fields| fields.contains(association))
            })
            .collect()
    }

    /// Whether `association` is granted under any action
    pub fn grants_association(&self, association: &str) -> bool {
        !self.actions_granting(association).is_empty()
    }
}

/// Outcome of resolving an operation for a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The operation predicate returned `true` without naming roles
    Allowed,
    /// No role applies, or the operation predicate returned `false`
    Denied,
    /// Field-level permissions of the satisfied roles
    Granted(PermissionSet),
}

impl Resolution {
    /// Whether access is granted at all
    pub fn is_granted(&self) -> bool {
        !matches!(self, Resolution::Denied)
    }

    /// Permission set, when the resolution produced one
    pub fn permissions(&self) -> Option<&PermissionSet> {
        match self {
            Resolution::Granted(permissions) => Some(permissions),
            _ => None,
        }
    }

    pub fn into_permissions(self) -> Option<PermissionSet> {
        match self {
            Resolution::Granted(permissions) => Some(permissions),
            _ => None,
        }
    }
}
