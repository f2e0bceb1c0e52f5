//! Role declarations, grant expansion and the per-policy registry
//!
//! Roles are declared once per resource type and expanded into concrete
//! `action -> fields` grants when the registry is built.
//!
//! # Features
//!
//! - **Wildcards**: `show_all`, `save_all`, `create_all`, `update_all`
//! - **Restrictions**: wildcard and `all` grants drop restricted fields
//! - **Associated-as aliases**: roles a role is presented as on associations
//! - **Implicit guest**: every registry holds a `guest` role
//!
//! # Example
//!
//! ```rust
//! use rolegate_authz::roles::{FieldSpec, RoleDeclaration, RoleRegistry, Wildcard};
//! use rolegate_authz::schema::StaticSchema;
//!
//! # fn example() -> rolegate_authz::Result<()> {
//! let schema = StaticSchema::new().resource("post", ["id", "title", "body"]);
//!
//! let registry = RoleRegistry::builder("post")
//!     .role(RoleDeclaration::new("reader").attributes(Wildcard::ShowAll))
//!     .role(RoleDeclaration::new("author").attributes(FieldSpec::explicit().save(["title", "body"])))
//!     .build(&schema)?;
//!
//! assert!(registry.contains("guest"));
//! assert_eq!(registry.lookup("reader")?.grant().attributes.len(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod declaration;
pub mod grant;
pub mod registry;

#[cfg(test)]
mod tests;

pub use declaration::{ActionKey, AssociatedAs, FieldSpec, FieldValue, RoleDeclaration, Wildcard};
pub use grant::{GrantBuilder, ResolvedGrant};
pub use registry::{RegisteredRole, RegistryBuilder, RoleRegistry};
