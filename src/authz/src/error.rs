//! Error types for the role resolution engine

use thiserror::Error;

/// Role resolution errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed role declaration, missing role predicate, or a schema the
    /// resolver needs but cannot discover
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The subject is not entitled to the requested operation
    #[error("Not authorized to {query} {resource}: {reason}")]
    NotAuthorized {
        /// Operation or association query that was denied
        query: String,
        /// Resource type the query ran against
        resource: String,
        /// Why the resolver refused
        reason: String,
    },

    /// Association name could not be resolved to a resource type
    #[error("Association '{association}' of '{resource}' could not be resolved")]
    NotFound {
        /// Resource type owning the association
        resource: String,
        /// Requested association name
        association: String,
    },

    /// Malformed association request tree
    #[error("Invalid association request: {0}")]
    Validation(String),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// JSON document could not be parsed
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthzError {
    /// Build a denial for `query` on `resource`
    pub fn not_authorized(
        query: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotAuthorized {
            query: query.into(),
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is an expected denial rather than a fault
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::NotAuthorized { .. })
    }

    /// Whether the error signals a caller or configuration mismatch that
    /// retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        !self.is_not_authorized()
    }
}

/// Result type for role resolution operations
pub type Result<T> = std::result::Result<T, AuthzError>;
