//! Restricted-field tables
//!
//! A restricted list is subtracted from every wildcard expansion for its
//! `(action, kind)` pair. Tables compose by copy: a policy type starts from a
//! parent table and overrides entries without touching the parent.

use crate::types::{Action, FieldKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute names withheld from wildcard create/update grants by default
pub const DEFAULT_RESTRICTED_WRITE_ATTRIBUTES: [&str; 3] = ["id", "created_at", "updated_at"];

/// Flat `(action, kind) -> restricted fields` table for one policy type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionTable {
    entries: HashMap<(Action, FieldKind), Vec<String>>,
}

impl RestrictionTable {
    /// Table with nothing restricted
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Base defaults: show restricts nothing, create and update withhold
    /// identity and timestamp attributes, associations restrict nothing
    pub fn defaults() -> Self {
        let write: Vec<String> = DEFAULT_RESTRICTED_WRITE_ATTRIBUTES
            .iter()
            .map(|f| f.to_string())
            .collect();

        let mut entries = HashMap::new();
        entries.insert((Action::Create, FieldKind::Attributes), write.clone());
        entries.insert((Action::Update, FieldKind::Attributes), write);

        Self { entries }
    }

    /// Start a child table from `parent`; the parent is never modified
    pub fn inherit(parent: &RestrictionTable) -> Self {
        parent.clone()
    }

    /// Replace the restricted list for one pair
    pub fn replace<I, T>(mut self, action: Action, kind: FieldKind, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.entries
            .insert((action, kind), fields.into_iter().map(Into::into).collect());
        self
    }

    /// Append to the restricted list for one pair
    pub fn extend<I, T>(mut self, action: Action, kind: FieldKind, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let entry = self.entries.entry((action, kind)).or_default();
        for field in fields {
            let field = field.into();
            if !entry.contains(&field) {
                entry.push(field);
            }
        }
        self
    }

    /// Restricted fields for one pair (empty when nothing is restricted)
    pub fn restricted(&self, action: Action, kind: FieldKind) -> &[String] {
        self.entries
            .get(&(action, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Apply declarative overrides on top of this table
    pub fn with_overrides(mut self, overrides: &RestrictionOverrides) -> Self {
        for (key, fields) in &overrides.replace {
            self = self.replace(key.action, key.kind, fields.iter().cloned());
        }
        for (key, fields) in &overrides.extend {
            self = self.extend(key.action, key.kind, fields.iter().cloned());
        }
        self
    }
}

impl Default for RestrictionTable {
    fn default() -> Self {
        Self::defaults()
    }
}

/// `(action, kind)` pair named in configuration as `"<action>_<kind>"`,
/// e.g. `"create_attributes"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestrictionKey {
    pub action: Action,
    pub kind: FieldKind,
}

impl TryFrom<String> for RestrictionKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (action, kind) = value
            .split_once('_')
            .ok_or_else(|| format!("expected '<action>_<kind>', got '{}'", value))?;

        let action = match action {
            "show" => Action::Show,
            "create" => Action::Create,
            "update" => Action::Update,
            other => return Err(format!("unknown action '{}' in '{}'", other, value)),
        };
        let kind = match kind {
            "attributes" => FieldKind::Attributes,
            "associations" => FieldKind::Associations,
            other => return Err(format!("unknown field kind '{}' in '{}'", other, value)),
        };

        Ok(Self { action, kind })
    }
}

impl From<RestrictionKey> for String {
    fn from(key: RestrictionKey) -> Self {
        format!("{}_{}", key.action, key.kind)
    }
}

/// Declarative restriction overrides for one policy type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionOverrides {
    /// Lists that replace the inherited entry
    #[serde(default)]
    pub replace: HashMap<RestrictionKey, Vec<String>>,

    /// Lists appended to the inherited entry
    #[serde(default)]
    pub extend: HashMap<RestrictionKey, Vec<String>>,
}
