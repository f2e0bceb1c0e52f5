//! # Rolegate Authorization Resolver
//!
//! Field-level, role-based authorization for application resources.
//!
//! ## Features
//!
//! - **Declarative roles** with per-action attribute and association grants
//! - **Schema-driven wildcards** (`show_all`, `save_all`, `all`, `all_minus`)
//!   narrowed by restriction tables
//! - **Merged permissions** across every satisfied role
//! - **Guest resolution** for anonymous subjects
//! - **Scopes** picked by the first satisfied role
//! - **Nested association authorization** with role propagation
//! - **TOML/JSON policy documents**
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rolegate_authz::{Action, FieldSpec, Policy, QueryOutcome, RoleDeclaration, RoleRegistry};
//! use rolegate_authz::roles::{ActionKey, FieldValue};
//! use rolegate_authz::schema::StaticSchema;
//!
//! struct User { id: u64 }
//! struct Post { author_id: u64 }
//!
//! # fn main() -> rolegate_authz::Result<()> {
//! let schema = StaticSchema::new().resource("post", ["id", "title", "body", "author_id"]);
//!
//! let registry = RoleRegistry::builder("post")
//!     .role(RoleDeclaration::new("author").attributes(
//!         FieldSpec::explicit().with(ActionKey::Show, FieldValue::all_minus(["author_id"])),
//!     ))
//!     .role(RoleDeclaration::new("guest").attributes(FieldSpec::explicit().show(["title"])))
//!     .build(&schema)?;
//!
//! let policy = Policy::<User, Post>::builder(Arc::new(registry))
//!     .role_condition("author", |ctx| {
//!         ctx.subject.is_some_and(|user| user.id == ctx.resource.author_id)
//!     })
//!     .operation("show", |_| QueryOutcome::roles(["author", "guest"]))
//!     .build()?;
//!
//! let post = Post { author_id: 7 };
//!
//! let author = policy.authorize(Some(&User { id: 7 }), &post, "show?")?;
//! assert_eq!(author.permissions().unwrap().attributes[&Action::Show], ["id", "title", "body"]);
//!
//! let anonymous = policy.authorize(None, &post, "show?")?;
//! assert_eq!(anonymous.permissions().unwrap().attributes[&Action::Show], ["title"]);
//!
//! assert!(policy.authorize(Some(&User { id: 8 }), &post, "show?").is_err());
//! # Ok(())
//! # }
//! ```

pub mod associations;
pub mod config;
pub mod engine;
pub mod error;
pub mod restriction;
pub mod roles;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use associations::{AssociationPermissions, AssociationRequest, PolicyCatalog};
pub use config::{PolicyDocument, ResolverConfig};
pub use engine::{Evaluator, Policy, PolicyBuilder, PolicyContext, QueryOutcome, ScopeResolution};
pub use error::{AuthzError, Result};
pub use restriction::RestrictionTable;
pub use roles::{FieldSpec, RoleDeclaration, RoleRegistry};
pub use schema::{SchemaProvider, StaticSchema};
pub use types::{Action, FieldList, PermissionSet, Resolution, RoleId, GUEST_ROLE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
