//! Shared fixtures for integration tests

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber when `RUST_LOG` is set
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Acting subject
#[derive(Debug, Clone)]
pub struct Account {
    pub name: &'static str,
    pub anonymous: bool,
}

impl Account {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            anonymous: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            name: "anonymous",
            anonymous: true,
        }
    }
}

/// Resource under test; conditions key off its id
#[derive(Debug, Clone)]
pub struct Record {
    pub id: &'static str,
}

impl Record {
    pub fn new(id: &'static str) -> Self {
        Self { id }
    }

    /// Scope value named after the role that produced it
    pub fn scoped(&self, label: &str) -> String {
        format!("scope with {}", label)
    }
}
