//! Scope selection
//!
//! Scopes never merge: the first satisfied candidate's scope wins, and an
//! anonymous subject uses the guest scope or nothing.

use super::evaluator::{Evaluator, QueryOutcome};
use crate::error::Result;
use crate::roles::RoleRegistry;
use crate::types::GUEST_ROLE;
use tracing::debug;

/// Which scope, if any, applies to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeChoice<'r> {
    /// The predicate returned `true`; the unscoped resource applies
    Allowed,
    /// No scope applies
    Denied,
    /// Scope of this role applies
    Role(&'r str),
}

/// Result of evaluating a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution<S> {
    /// Unrestricted access
    Allowed,
    /// No scope applies
    Denied,
    /// Value of the chosen role's scope
    Scoped(S),
}

impl<S> ScopeResolution<S> {
    pub fn is_denied(&self) -> bool {
        matches!(self, ScopeResolution::Denied)
    }

    pub fn scoped(self) -> Option<S> {
        match self {
            ScopeResolution::Scoped(scope) => Some(scope),
            _ => None,
        }
    }
}

/// Picks the scope for a query outcome
pub struct ScopeSelector<'r> {
    registry: &'r RoleRegistry,
}

impl<'r> ScopeSelector<'r> {
    pub fn new(registry: &'r RoleRegistry) -> Self {
        Self { registry }
    }

    /// Choose the scope for one subject
    pub fn select<F>(&self, outcome: &QueryOutcome, anonymous: bool, test: F) -> Result<ScopeChoice<'r>>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let candidates = match outcome {
            QueryOutcome::Bool(true) => return Ok(ScopeChoice::Allowed),
            QueryOutcome::Bool(false) => return Ok(ScopeChoice::Denied),
            QueryOutcome::Roles(candidates) => candidates,
        };

        if anonymous {
            if !outcome.names(GUEST_ROLE) {
                return Ok(ScopeChoice::Denied);
            }
            let guest = self.registry.lookup(GUEST_ROLE)?;
            return Ok(ScopeChoice::Role(guest.name()));
        }

        let satisfied = Evaluator::new(self.registry).scan(candidates, test)?;
        match satisfied.first().copied() {
            Some(role) => {
                debug!(
                    resource = self.registry.resource_type(),
                    role = role.name(),
                    satisfied = satisfied.len(),
                    "Selected scope"
                );
                Ok(ScopeChoice::Role(role.name()))
            }
            None => Ok(ScopeChoice::Denied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleDeclaration;
    use crate::schema::StaticSchema;

    fn registry() -> RoleRegistry {
        RoleRegistry::builder("scoped")
            .role(RoleDeclaration::new("some_role"))
            .role(RoleDeclaration::new("some_extra_role"))
            .build(&StaticSchema::new())
            .unwrap()
    }

    #[test]
    fn test_first_satisfied_role_wins() {
        let registry = registry();
        let selector = ScopeSelector::new(&registry);

        let outcome = QueryOutcome::roles(["some_extra_role", "some_role"]);
        let choice = selector.select(&outcome, false, |_| Ok(true)).unwrap();
        assert_eq!(choice, ScopeChoice::Role("some_extra_role"));

        let choice = selector
            .select(&outcome, false, |role| Ok(role == "some_role"))
            .unwrap();
        assert_eq!(choice, ScopeChoice::Role("some_role"));
    }

    #[test]
    fn test_guest_and_boolean_short_circuits() {
        let registry = registry();
        let selector = ScopeSelector::new(&registry);

        let outcome = QueryOutcome::roles(["some_role", "guest"]);
        assert_eq!(
            selector.select(&outcome, true, |_| Ok(true)).unwrap(),
            ScopeChoice::Role("guest")
        );

        let outcome = QueryOutcome::roles(["some_role"]);
        assert_eq!(
            selector.select(&outcome, true, |_| Ok(true)).unwrap(),
            ScopeChoice::Denied
        );
        assert_eq!(
            selector.select(&true.into(), true, |_| Ok(false)).unwrap(),
            ScopeChoice::Allowed
        );
        assert_eq!(
            selector.select(&outcome, false, |_| Ok(false)).unwrap(),
            ScopeChoice::Denied
        );
    }
}
