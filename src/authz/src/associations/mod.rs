//! Nested association authorization
//!
//! Given the permissions resolved for a primary resource and a tree of
//! requested associations, decides which associations the subject may
//! traverse and what it may do on each associated resource.
//!
//! # Features
//!
//! - **Role propagation**: roles a parent role is presented as, falling back
//!   to per-association defaults
//! - **Alias fallback**: association targets from the schema, then the
//!   registry's alias table
//! - **Action filtering**: a child only receives the actions its parent
//!   granted the association under
//! - **Write permits**: nested `<association>_attributes` whitelists
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rolegate_authz::associations::PolicyCatalog;
//! use rolegate_authz::roles::{FieldSpec, RoleDeclaration, RoleRegistry};
//! use rolegate_authz::schema::StaticSchema;
//! use serde_json::json;
//!
//! # fn example() -> rolegate_authz::Result<()> {
//! let schema = StaticSchema::new()
//!     .resource("user", ["id", "name"])
//!     .association("user", "posts", "post")
//!     .resource("post", ["id", "title"]);
//!
//! let mut catalog = PolicyCatalog::new(Arc::new(schema));
//! let users = catalog.declare(
//!     RoleRegistry::builder("user").role(
//!         RoleDeclaration::new("owner")
//!             .associations(FieldSpec::explicit().show(["posts"]))
//!             .associated_as("posts", ["author"]),
//!     ),
//! )?;
//! catalog.declare(
//!     RoleRegistry::builder("post")
//!         .role(RoleDeclaration::new("author").attributes(FieldSpec::explicit().show(["title"]))),
//! )?;
//!
//! let owner = users.lookup("owner")?.permissions().clone();
//! let granted = catalog.authorize_associations_json("user", &owner, &json!(["posts"]))?;
//! assert_eq!(granted.get("posts").unwrap().roles.for_current_model, vec!["author"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod authorizer;
pub mod catalog;
pub mod tree;


pub use authorizer::{AssociationAuthorizer, AssociationPermissions, GrantedAssociation, WritePermit};
pub use catalog::{CacheStats, PolicyCatalog};
pub use tree::{tree_depth, AssociationRequest, DEFAULT_MAX_DEPTH};
