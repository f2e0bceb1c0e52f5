//! Role declaration types
//!
//! A [`RoleDeclaration`] is what a policy author writes: which attributes and
//! associations a role may touch, and which roles it is presented as when the
//! resolver walks into an association. Declarations are expanded once, at
//! registry build time, into concrete grants.

use crate::types::{Action, RoleId};
use indexmap::IndexMap;
use serde::Deserialize;

/// Shorthand that grants every field for a fixed set of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wildcard {
    /// `show_all`: show only
    ShowAll,
    /// `save_all`: show, create and update
    SaveAll,
    /// `create_all`: show and create
    CreateAll,
    /// `update_all`: show and update
    UpdateAll,
}

impl Wildcard {
    /// Parse a wildcard token such as `"show_all"`
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "show_all" => Some(Wildcard::ShowAll),
            "save_all" => Some(Wildcard::SaveAll),
            "create_all" => Some(Wildcard::CreateAll),
            "update_all" => Some(Wildcard::UpdateAll),
            _ => None,
        }
    }

    /// Actions the wildcard expands to
    pub fn actions(&self) -> &'static [Action] {
        match self {
            Wildcard::ShowAll => &[Action::Show],
            Wildcard::SaveAll => &[Action::Show, Action::Create, Action::Update],
            Wildcard::CreateAll => &[Action::Show, Action::Create],
            Wildcard::UpdateAll => &[Action::Show, Action::Update],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Wildcard::ShowAll => "show_all",
            Wildcard::SaveAll => "save_all",
            Wildcard::CreateAll => "create_all",
            Wildcard::UpdateAll => "update_all",
        }
    }
}

/// Action key accepted in an explicit declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKey {
    Show,
    Create,
    Update,
    /// Shorthand for both create and update, never show
    Save,
}

impl ActionKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "show" => Some(ActionKey::Show),
            "create" => Some(ActionKey::Create),
            "update" => Some(ActionKey::Update),
            "save" => Some(ActionKey::Save),
            _ => None,
        }
    }

    /// Resolved actions this key stands for
    pub fn expand(&self) -> &'static [Action] {
        match self {
            ActionKey::Show => &[Action::Show],
            ActionKey::Create => &[Action::Create],
            ActionKey::Update => &[Action::Update],
            ActionKey::Save => &[Action::Create, Action::Update],
        }
    }
}

/// Token marking an "everything except" list: `["all_minus", "secret"]`
pub const ALL_MINUS_TOKEN: &str = "all_minus";

/// Token granting every field of the resource: `"all"`
pub const ALL_TOKEN: &str = "all";

/// Value of one explicit `(action, value)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Every field, minus the restricted list for the action
    All,
    /// Every field minus an explicit exclusion list; restrictions are not reapplied
    AllMinus(Vec<String>),
    /// Literal field names, granted verbatim
    List(Vec<String>),
}

impl FieldValue {
    /// Literal field list
    pub fn list<I, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        FieldValue::List(fields.into_iter().map(Into::into).collect())
    }

    /// Every field except `excluded`
    pub fn all_minus<I, T>(excluded: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        FieldValue::AllMinus(excluded.into_iter().map(Into::into).collect())
    }

    /// Interpret a raw list, recognizing a leading `all_minus` token
    pub fn from_raw_list(mut values: Vec<String>) -> Self {
        if values.first().map(String::as_str) == Some(ALL_MINUS_TOKEN) {
            values.remove(0);
            FieldValue::AllMinus(values)
        } else {
            FieldValue::List(values)
        }
    }
}

/// Attribute or association declaration of one role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFieldSpec")]
pub enum FieldSpec {
    /// Implicit declaration, e.g. `save_all`
    Wildcard(Wildcard),
    /// Explicit `(action, value)` entries, applied in order
    Explicit(Vec<(ActionKey, FieldValue)>),
}

impl FieldSpec {
    /// Empty explicit declaration, filled with the builder methods below
    pub fn explicit() -> Self {
        FieldSpec::Explicit(Vec::new())
    }

    /// Append an entry; turns a wildcard into an explicit declaration
    pub fn with(self, key: ActionKey, value: FieldValue) -> Self {
        let mut entries = match self {
            FieldSpec::Explicit(entries) => entries,
            FieldSpec::Wildcard(_) => Vec::new(),
        };
        entries.push((key, value));
        FieldSpec::Explicit(entries)
    }

    pub fn show<I, T>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with(ActionKey::Show, FieldValue::list(fields))
    }

    pub fn create<I, T>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with(ActionKey::Create, FieldValue::list(fields))
    }

    pub fn update<I, T>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with(ActionKey::Update, FieldValue::list(fields))
    }

    pub fn save<I, T>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.with(ActionKey::Save, FieldValue::list(fields))
    }
}

impl From<Wildcard> for FieldSpec {
    fn from(wildcard: Wildcard) -> Self {
        FieldSpec::Wildcard(wildcard)
    }
}

/// Roles a role is presented as when authorizing associations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAssociatedAs")]
pub enum AssociatedAs {
    /// The role is presented under its own name on every association
    SelfRole,
    /// The same roles on every association
    Uniform(Vec<RoleId>),
    /// Roles per association name
    PerAssociation(IndexMap<String, Vec<RoleId>>),
}

/// Marker for [`AssociatedAs::SelfRole`] in configuration
pub const SELF_TOKEN: &str = "self";

/// One role as declared by a policy author
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleDeclaration {
    /// Role name, unique within a policy
    pub name: RoleId,

    /// Attribute grants
    #[serde(default)]
    pub attributes: Option<FieldSpec>,

    /// Association grants
    #[serde(default)]
    pub associations: Option<FieldSpec>,

    /// Roles presented to associated resources
    #[serde(default)]
    pub associated_as: Option<AssociatedAs>,
}

impl RoleDeclaration {
    /// Declaration with no grants
    pub fn new(name: impl Into<RoleId>) -> Self {
        Self {
            name: name.into(),
            attributes: None,
            associations: None,
            associated_as: None,
        }
    }

    pub fn attributes(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.attributes = Some(spec.into());
        self
    }

    pub fn associations(mut self, spec: impl Into<FieldSpec>) -> Self {
        self.associations = Some(spec.into());
        self
    }

    /// Present this role as `roles` when authorizing `association`
    pub fn associated_as<I, T>(mut self, association: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleId>,
    {
        let roles: Vec<RoleId> = roles.into_iter().map(Into::into).collect();
        let mut map = match self.associated_as.take() {
            Some(AssociatedAs::PerAssociation(map)) => map,
            _ => IndexMap::new(),
        };
        map.insert(association.into(), roles);
        self.associated_as = Some(AssociatedAs::PerAssociation(map));
        self
    }

    /// Present this role as `roles` on every association
    pub fn associated_as_everywhere<I, T>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleId>,
    {
        self.associated_as = Some(AssociatedAs::Uniform(
            roles.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Present this role under its own name on every association
    pub fn associated_as_self(mut self) -> Self {
        self.associated_as = Some(AssociatedAs::SelfRole);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldValue {
    Token(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldSpec {
    Token(String),
    Table(IndexMap<String, RawFieldValue>),
}

impl TryFrom<RawFieldSpec> for FieldSpec {
    type Error = String;

    fn try_from(raw: RawFieldSpec) -> Result<Self, Self::Error> {
        match raw {
            RawFieldSpec::Token(token) => Wildcard::parse(&token)
                .map(FieldSpec::Wildcard)
                .ok_or_else(|| {
                    format!(
                        "implicit declarations must be one of show_all, save_all, create_all, update_all, got '{}'",
                        token
                    )
                }),
            RawFieldSpec::Table(table) => {
                let mut entries = Vec::with_capacity(table.len());
                for (key, value) in table {
                    let action = ActionKey::parse(&key).ok_or_else(|| {
                        format!("action must be one of show, create, update, save, got '{}'", key)
                    })?;
                    let value = match value {
                        RawFieldValue::Token(token) if token == ALL_TOKEN => FieldValue::All,
                        RawFieldValue::Token(token) => {
                            return Err(format!(
                                "expected '{}' or a field list for '{}', got '{}'",
                                ALL_TOKEN, key, token
                            ))
                        }
                        RawFieldValue::List(values) => FieldValue::from_raw_list(values),
                    };
                    entries.push((action, value));
                }
                Ok(FieldSpec::Explicit(entries))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    One(String),
    Many(Vec<String>),
}

impl RawRoles {
    fn into_roles(self) -> Vec<RoleId> {
        match self {
            RawRoles::One(role) => vec![role],
            RawRoles::Many(roles) => roles,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAssociatedAs {
    Token(String),
    List(Vec<String>),
    Table(IndexMap<String, RawRoles>),
}

impl TryFrom<RawAssociatedAs> for AssociatedAs {
    type Error = String;

    fn try_from(raw: RawAssociatedAs) -> Result<Self, Self::Error> {
        match raw {
            RawAssociatedAs::Token(token) if token == SELF_TOKEN => Ok(AssociatedAs::SelfRole),
            RawAssociatedAs::Token(token) if token.is_empty() => {
                Err("associated_as role name cannot be empty".to_string())
            }
            RawAssociatedAs::Token(token) => Ok(AssociatedAs::Uniform(vec![token])),
            RawAssociatedAs::List(roles) => Ok(AssociatedAs::Uniform(roles)),
            RawAssociatedAs::Table(table) => Ok(AssociatedAs::PerAssociation(
                table
                    .into_iter()
                    .map(|(association, roles)| (association, roles.into_roles()))
                    .collect(),
            )),
        }
    }
}
