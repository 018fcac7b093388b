// Mock collaborators for testing

use keystone_core::{Principal, RoleHandler};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Role handler granting fixed roles per principal and recording every check
#[derive(Clone, Default)]
pub struct MockRoleHandler {
    grants: HashMap<String, HashSet<String>>,
    checks: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockRoleHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to the principal called `principal`
    pub fn grant(mut self, principal: &str, role: &str) -> Self {
        self.grants
            .entry(principal.to_string())
            .or_default()
            .insert(role.to_string());
        self
    }

    /// Number of role checks performed
    pub fn call_count(&self) -> usize {
        self.checks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All `(principal, role)` checks, in order
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check if a role was asked about
    pub fn was_checked(&self, role: &str) -> bool {
        self.get_calls().iter().any(|(_, r)| r == role)
    }
}

impl RoleHandler for MockRoleHandler {
    fn has_role(&self, principal: &Principal, role: &str) -> bool {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((principal.name().to_string(), role.to_string()));
        self.grants
            .get(principal.name())
            .is_some_and(|roles| roles.contains(role))
    }
}
