//! Policy engine
//!
//! A [`Policy`] binds a frozen [`RoleRegistry`] to the caller's predicates:
//! one condition per role, the operation predicates, and optional per-role
//! scopes. Resolution runs synchronously and touches nothing but the
//! registry and the closures.
//!
//! # Architecture
//!
//! ```text
//! operation predicate → QueryOutcome → Evaluator → Resolution
//!                                   └→ ScopeSelector → ScopeResolution
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rolegate_authz::engine::{Policy, QueryOutcome};
//! use rolegate_authz::roles::{FieldSpec, RoleDeclaration, RoleRegistry};
//! use rolegate_authz::schema::StaticSchema;
//! use rolegate_authz::types::Action;
//!
//! struct User { admin: bool }
//! struct Post;
//!
//! # fn example() -> rolegate_authz::Result<()> {
//! let registry = RoleRegistry::builder("post")
//!     .role(RoleDeclaration::new("admin").attributes(FieldSpec::explicit().show(["title"])))
//!     .build(&StaticSchema::new())?;
//!
//! let policy = Policy::<User, Post>::builder(Arc::new(registry))
//!     .role_condition("admin", |ctx| ctx.subject.is_some_and(|u| u.admin))
//!     .operation("show", |_| QueryOutcome::roles(["admin"]))
//!     .build()?;
//!
//! let permissions = policy
//!     .authorize(Some(&User { admin: true }), &Post, "show?")?
//!     .into_permissions()
//!     .unwrap();
//! assert_eq!(permissions.attributes[&Action::Show], ["title"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod evaluator;
pub mod scope;

pub use evaluator::{Evaluator, QueryOutcome};
pub use scope::{ScopeChoice, ScopeResolution, ScopeSelector};

use crate::error::{AuthzError, Result};
use crate::roles::RoleRegistry;
use crate::types::{Resolution, RoleId, GUEST_ROLE};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Operations every policy answers, resolving to `false` unless defined
pub const DEFAULT_OPERATIONS: [&str; 5] = ["index", "show", "create", "update", "destroy"];

/// Subject and resource a query runs against
pub struct PolicyContext<'a, U, R> {
    /// Acting subject, `None` when anonymous
    pub subject: Option<&'a U>,
    /// Resource being accessed
    pub resource: &'a R,
}

impl<'a, U, R> PolicyContext<'a, U, R> {
    pub fn new(subject: Option<&'a U>, resource: &'a R) -> Self {
        Self { subject, resource }
    }
}

impl<U, R> Clone for PolicyContext<'_, U, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U, R> Copy for PolicyContext<'_, U, R> {}

type Predicate<U, R> = Box<dyn Fn(&PolicyContext<'_, U, R>) -> bool + Send + Sync>;
type Operation<U, R> = Box<dyn Fn(&PolicyContext<'_, U, R>) -> QueryOutcome + Send + Sync>;
type ScopeFn<U, R, S> = Box<dyn Fn(&PolicyContext<'_, U, R>) -> S + Send + Sync>;

/// Operation names are accepted with or without a trailing `?`
fn operation_key(operation: &str) -> &str {
    operation.strip_suffix('?').unwrap_or(operation)
}

/// Roles, predicates and scopes for one resource type
///
/// `U` is the subject type, `R` the resource type and `S` the value scopes
/// produce.
pub struct Policy<U, R, S = ()> {
    registry: Arc<RoleRegistry>,
    conditions: HashMap<RoleId, Predicate<U, R>>,
    operations: HashMap<String, Operation<U, R>>,
    scopes: HashMap<RoleId, ScopeFn<U, R, S>>,
    guest_when: Option<Predicate<U, R>>,
}

impl<U, R, S> fmt::Debug for Policy<U, R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("resource_type", &self.registry.resource_type())
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<U, R, S> Policy<U, R, S> {
    pub fn builder(registry: Arc<RoleRegistry>) -> PolicyBuilder<U, R, S> {
        PolicyBuilder::new(registry)
    }

    pub fn registry(&self) -> &Arc<RoleRegistry> {
        &self.registry
    }

    pub fn resource_type(&self) -> &str {
        self.registry.resource_type()
    }

    /// Run an operation predicate
    pub fn query(&self, operation: &str, ctx: &PolicyContext<'_, U, R>) -> Result<QueryOutcome> {
        let key = operation_key(operation);
        match self.operations.get(key) {
            Some(predicate) => Ok(predicate(ctx)),
            None if DEFAULT_OPERATIONS.contains(&key) => Ok(QueryOutcome::Bool(false)),
            None => Err(AuthzError::Configuration(format!(
                "operation '{}?' is not defined on '{}'",
                key,
                self.resource_type()
            ))),
        }
    }

    /// Resolve an operation without failing on denial
    pub fn resolve(&self, subject: Option<&U>, resource: &R, operation: &str) -> Result<Resolution> {
        let ctx = PolicyContext::new(subject, resource);
        let outcome = self.query(operation, &ctx)?;
        let anonymous = self.is_anonymous(&ctx);

        let resolution = Evaluator::new(&self.registry)
            .resolve(&outcome, anonymous, |role| self.test_role(role, &ctx))?;

        debug!(
            resource = self.resource_type(),
            operation = operation_key(operation),
            granted = resolution.is_granted(),
            "Resolved operation"
        );

        Ok(resolution)
    }

    /// Resolve an operation, turning a denial into [`AuthzError::NotAuthorized`]
    pub fn authorize(&self, subject: Option<&U>, resource: &R, operation: &str) -> Result<Resolution> {
        match self.resolve(subject, resource, operation)? {
            Resolution::Denied => Err(AuthzError::not_authorized(
                operation_key(operation),
                self.resource_type(),
                "no eligible role is satisfied",
            )),
            resolution => Ok(resolution),
        }
    }

    /// Evaluate the scope of the first satisfied role
    pub fn resolve_scope(
        &self,
        subject: Option<&U>,
        resource: &R,
        operation: &str,
    ) -> Result<ScopeResolution<S>> {
        let ctx = PolicyContext::new(subject, resource);
        let outcome = self.query(operation, &ctx)?;
        let anonymous = self.is_anonymous(&ctx);

        let choice = ScopeSelector::new(&self.registry)
            .select(&outcome, anonymous, |role| self.test_role(role, &ctx))?;

        match choice {
            ScopeChoice::Allowed => Ok(ScopeResolution::Allowed),
            ScopeChoice::Denied => Ok(ScopeResolution::Denied),
            ScopeChoice::Role(role) => {
                let scope = self.scopes.get(role).ok_or_else(|| {
                    AuthzError::Configuration(format!(
                        "role '{}' on '{}' has no scope",
                        role,
                        self.resource_type()
                    ))
                })?;
                Ok(ScopeResolution::Scoped(scope(&ctx)))
            }
        }
    }

    /// Evaluate a scope, turning a denial into [`AuthzError::NotAuthorized`]
    pub fn authorize_scope(
        &self,
        subject: Option<&U>,
        resource: &R,
        operation: &str,
    ) -> Result<ScopeResolution<S>> {
        match self.resolve_scope(subject, resource, operation)? {
            ScopeResolution::Denied => Err(AuthzError::not_authorized(
                operation_key(operation),
                self.resource_type(),
                "no scope applies",
            )),
            resolution => Ok(resolution),
        }
    }

    /// Whether the subject resolves as guest
    pub fn is_anonymous(&self, ctx: &PolicyContext<'_, U, R>) -> bool {
        match &self.guest_when {
            Some(test) => test(ctx),
            None => ctx.subject.is_none(),
        }
    }

    fn test_role(&self, role: &str, ctx: &PolicyContext<'_, U, R>) -> Result<bool> {
        let condition = self.conditions.get(role).ok_or_else(|| {
            AuthzError::Configuration(format!(
                "role '{}' on '{}' has no condition, declare one with role_condition",
                role,
                self.resource_type()
            ))
        })?;
        Ok(condition(ctx))
    }
}

/// Builder for [`Policy`]
pub struct PolicyBuilder<U, R, S = ()> {
    registry: Arc<RoleRegistry>,
    conditions: HashMap<RoleId, Predicate<U, R>>,
    operations: HashMap<String, Operation<U, R>>,
    scopes: HashMap<RoleId, ScopeFn<U, R, S>>,
    guest_when: Option<Predicate<U, R>>,
}

impl<U, R, S> PolicyBuilder<U, R, S> {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self {
            registry,
            conditions: HashMap::new(),
            operations: HashMap::new(),
            scopes: HashMap::new(),
            guest_when: None,
        }
    }

    /// Test deciding whether the subject holds `role`
    pub fn role_condition<F>(mut self, role: impl Into<RoleId>, condition: F) -> Self
    where
        F: Fn(&PolicyContext<'_, U, R>) -> bool + Send + Sync + 'static,
    {
        self.conditions.insert(role.into(), Box::new(condition));
        self
    }

    /// Predicate for `operation`, e.g. `"show"` or `"show?"`
    pub fn operation<F>(mut self, operation: &str, predicate: F) -> Self
    where
        F: Fn(&PolicyContext<'_, U, R>) -> QueryOutcome + Send + Sync + 'static,
    {
        self.operations
            .insert(operation_key(operation).to_string(), Box::new(predicate));
        self
    }

    /// Scope evaluated when `role` is the first satisfied candidate
    pub fn scope<F>(mut self, role: impl Into<RoleId>, scope: F) -> Self
    where
        F: Fn(&PolicyContext<'_, U, R>) -> S + Send + Sync + 'static,
    {
        self.scopes.insert(role.into(), Box::new(scope));
        self
    }

    /// Override the anonymity test; defaults to "no subject"
    pub fn guest_when<F>(mut self, test: F) -> Self
    where
        F: Fn(&PolicyContext<'_, U, R>) -> bool + Send + Sync + 'static,
    {
        self.guest_when = Some(Box::new(test));
        self
    }

    pub fn build(self) -> Result<Policy<U, R, S>> {
        let resource_type = self.registry.resource_type();

        for role in self.conditions.keys() {
            if role == GUEST_ROLE {
                return Err(AuthzError::Configuration(format!(
                    "'{}' on '{}' is decided by guest_when, not a role condition",
                    GUEST_ROLE, resource_type
                )));
            }
            self.registry.lookup(role)?;
        }
        for role in self.scopes.keys() {
            self.registry.lookup(role)?;
        }

        info!(
            resource = resource_type,
            conditions = self.conditions.len(),
            operations = self.operations.len(),
            scopes = self.scopes.len(),
            "Policy built"
        );

        Ok(Policy {
            registry: self.registry,
            conditions: self.conditions,
            operations: self.operations,
            scopes: self.scopes,
            guest_when: self.guest_when,
        })
    }
}
