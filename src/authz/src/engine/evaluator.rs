//! Operation resolution
//!
//! Turns the outcome of an operation predicate into a [`Resolution`]:
//! booleans pass through, anonymous subjects resolve as guest or not at
//! all, and every satisfied role is union-merged in candidate order.

use crate::error::Result;
use crate::roles::{RegisteredRole, RoleRegistry};
use crate::types::{PermissionSet, Resolution, RoleId, GUEST_ROLE};
use tracing::{debug, trace};

/// What an operation predicate returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Decided without roles
    Bool(bool),
    /// Roles eligible for the operation, in priority order
    Roles(Vec<RoleId>),
}

impl QueryOutcome {
    /// Candidate role list
    pub fn roles<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleId>,
    {
        QueryOutcome::Roles(roles.into_iter().map(Into::into).collect())
    }

    /// Whether `role` is among the candidates
    pub fn names(&self, role: &str) -> bool {
        match self {
            QueryOutcome::Bool(_) => false,
            QueryOutcome::Roles(roles) => roles.iter().any(|r| r == role),
        }
    }
}

impl From<bool> for QueryOutcome {
    fn from(value: bool) -> Self {
        QueryOutcome::Bool(value)
    }
}

impl From<Vec<RoleId>> for QueryOutcome {
    fn from(roles: Vec<RoleId>) -> Self {
        QueryOutcome::Roles(roles)
    }
}

/// Resolves query outcomes against one registry
pub struct Evaluator<'r> {
    registry: &'r RoleRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r RoleRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a query outcome for one subject
    ///
    /// `anonymous` is the guest test; `test` answers whether the subject
    /// satisfies a role and fails when the role has no predicate.
    pub fn resolve<F>(&self, outcome: &QueryOutcome, anonymous: bool, test: F) -> Result<Resolution>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let candidates = match outcome {
            QueryOutcome::Bool(true) => return Ok(Resolution::Allowed),
            QueryOutcome::Bool(false) => return Ok(Resolution::Denied),
            QueryOutcome::Roles(candidates) => candidates,
        };

        if anonymous {
            return if outcome.names(GUEST_ROLE) {
                debug!(resource = self.registry.resource_type(), "Resolved as guest");
                Ok(Resolution::Granted(
                    self.registry.lookup(GUEST_ROLE)?.permissions().clone(),
                ))
            } else {
                debug!(
                    resource = self.registry.resource_type(),
                    "Anonymous subject and guest is not a candidate"
                );
                Ok(Resolution::Denied)
            };
        }

        let satisfied = self.scan(candidates, test)?;
        match satisfied.as_slice() {
            [] => {
                debug!(
                    resource = self.registry.resource_type(),
                    candidates = candidates.len(),
                    "No candidate role satisfied"
                );
                Ok(Resolution::Denied)
            }
            [role] => Ok(Resolution::Granted(role.permissions().clone())),
            roles => Ok(Resolution::Granted(merge_roles(roles.iter().copied()))),
        }
    }

    /// Satisfied non-guest candidates, in candidate order
    pub fn scan<F>(&self, candidates: &[RoleId], mut test: F) -> Result<Vec<&'r RegisteredRole>>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let mut satisfied: Vec<&'r RegisteredRole> = Vec::new();

        for candidate in candidates {
            if candidate == GUEST_ROLE {
                continue;
            }
            let role = self.registry.lookup(candidate)?;
            if satisfied.iter().any(|r| r.name() == role.name()) {
                continue;
            }
            if test(candidate)? {
                trace!(role = %candidate, "Role satisfied");
                satisfied.push(role);
            }
        }

        Ok(satisfied)
    }

    /// Union-merge the named roles, bypassing predicates
    pub fn merge<I, T>(&self, roles: I) -> Result<PermissionSet>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut registered = Vec::new();
        for role in roles {
            registered.push(self.registry.lookup(role.as_ref())?);
        }
        Ok(merge_roles(registered))
    }
}

/// Union of every role's permission set, first-seen order
fn merge_roles<'a, I>(roles: I) -> PermissionSet
where
    I: IntoIterator<Item = &'a RegisteredRole>,
{
    let mut merged = PermissionSet::new();
    for role in roles {
        merged.absorb(role.permissions());
    }
    merged
}
