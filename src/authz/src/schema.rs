//! Resource schema discovery
//!
//! The resolver never inspects resources itself. Wildcard grants and
//! association traversal ask a [`SchemaProvider`] for field lists and
//! association targets.

use indexmap::IndexMap;

/// Field and association discovery for resource types
pub trait SchemaProvider: Send + Sync {
    /// All attribute names of `resource_type`, or `None` when the type has no
    /// discoverable schema
    fn field_list(&self, resource_type: &str) -> Option<Vec<String>>;

    /// All association names of `resource_type`
    fn association_list(&self, resource_type: &str) -> Option<Vec<String>>;

    /// Resource type an association of `resource_type` points at
    fn resolve_association_type(&self, resource_type: &str, association: &str) -> Option<String>;
}

/// Schema of one resource type held by [`StaticSchema`]
#[derive(Debug, Clone, Default)]
struct ResourceSchema {
    fields: Vec<String>,
    /// association name -> target resource type
    associations: IndexMap<String, String>,
}

/// In-memory schema provider
///
/// # Example
///
/// ```
/// use rolegate_authz::schema::{SchemaProvider, StaticSchema};
///
/// let schema = StaticSchema::new()
///     .resource("post", ["id", "title", "body"])
///     .association("post", "comments", "comment");
///
/// assert_eq!(schema.field_list("post").unwrap().len(), 3);
/// assert_eq!(schema.resolve_association_type("post", "comments").as_deref(), Some("comment"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    resources: IndexMap<String, ResourceSchema>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource type with its attribute names
    pub fn resource<I, T>(mut self, resource_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let entry = self.resources.entry(resource_type.into()).or_default();
        entry.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Declare an association of `resource_type` pointing at `target_type`
    pub fn association(
        mut self,
        resource_type: impl Into<String>,
        association: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        self.resources
            .entry(resource_type.into())
            .or_default()
            .associations
            .insert(association.into(), target_type.into());
        self
    }

    /// Whether `resource_type` was declared
    pub fn contains(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }
}

impl SchemaProvider for StaticSchema {
    fn field_list(&self, resource_type: &str) -> Option<Vec<String>> {
        self.resources
            .get(resource_type)
            .map(|schema| schema.fields.clone())
    }

    fn association_list(&self, resource_type: &str) -> Option<Vec<String>> {
        self.resources
            .get(resource_type)
            .map(|schema| schema.associations.keys().cloned().collect())
    }

    fn resolve_association_type(&self, resource_type: &str, association: &str) -> Option<String> {
        self.resources
            .get(resource_type)
            .and_then(|schema| schema.associations.get(association))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_has_no_schema() {
        let schema = StaticSchema::new().resource("post", ["id"]);
        assert!(schema.field_list("comment").is_none());
        assert!(schema.association_list("comment").is_none());
        assert!(schema.resolve_association_type("post", "comments").is_none());
    }

    #[test]
    fn test_associations_keep_declaration_order() {
        let schema = StaticSchema::new()
            .resource("user", ["id", "name"])
            .association("user", "posts", "post")
            .association("user", "avatar", "image");

        assert_eq!(
            schema.association_list("user").unwrap(),
            vec!["posts".to_string(), "avatar".to_string()]
        );
    }

    #[test]
    fn test_association_only_resource_has_empty_fields() {
        let schema = StaticSchema::new().association("tag", "posts", "post");
        assert_eq!(schema.field_list("tag"), Some(Vec::new()));
    }
}
