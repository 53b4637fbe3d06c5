//! Multi-hop role assumption chains.
//!
//! A chain is walked front to back: each hop assumes `role_name` using the
//! credential produced by the previous hop. Every hop except the last names
//! the account it moves into; the last hop assumes a role inside the account
//! reached so far and therefore carries no `target_account`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One role assumption step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHop {
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl RoleHop {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self { role_name: role_name.into(), target_account: None, external_id: None }
    }

    #[must_use]
    pub fn in_account(mut self, account: impl Into<String>) -> Self {
        self.target_account = Some(account.into());
        self
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    fn has_target_account(&self) -> bool {
        self.target_account.as_deref().is_some_and(|account| !account.trim().is_empty())
    }
}

/// Reasons a chain is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleChainError {
    #[error("role chain must contain at least one hop")]
    Empty,

    #[error("hop {index} has an empty role name")]
    EmptyRoleName { index: usize },

    #[error("hop {index} ({role}) is not the last hop and must name a target account")]
    MissingTargetAccount { index: usize, role: String },

    #[error("terminal hop ({role}) must not name a target account")]
    TerminalTargetAccount { role: String },
}

/// Validated, immutable sequence of [`RoleHop`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RoleHop>", into = "Vec<RoleHop>")]
pub struct RoleChain {
    hops: Vec<RoleHop>,
}

impl RoleChain {
    /// Validate and build a chain.
    ///
    /// # Errors
    ///
    /// Returns [`RoleChainError`] if the chain is empty, a hop has a blank
    /// role name, a non-terminal hop lacks a target account, or the terminal
    /// hop has one.
    pub fn new(hops: Vec<RoleHop>) -> Result<Self, RoleChainError> {
        let Some(last_index) = hops.len().checked_sub(1) else {
            return Err(RoleChainError::Empty);
        };

        for (index, hop) in hops.iter().enumerate() {
            if hop.role_name.trim().is_empty() {
                return Err(RoleChainError::EmptyRoleName { index });
            }

            if index < last_index && !hop.has_target_account() {
                return Err(RoleChainError::MissingTargetAccount {
                    index,
                    role: hop.role_name.clone(),
                });
            }

            if index == last_index && hop.target_account.is_some() {
                return Err(RoleChainError::TerminalTargetAccount { role: hop.role_name.clone() });
            }
        }

        Ok(Self { hops })
    }

    pub fn hops(&self) -> &[RoleHop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Always false: construction rejects empty chains.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The hop whose credential the chain ultimately yields.
    pub fn terminal(&self) -> &RoleHop {
        // Non-empty by construction.
        &self.hops[self.hops.len() - 1]
    }

    /// Account the terminal role lives in, if the chain crosses accounts.
    pub fn target_account(&self) -> Option<&str> {
        self.hops.iter().rev().find_map(|hop| hop.target_account.as_deref())
    }
}

impl TryFrom<Vec<RoleHop>> for RoleChain {
    type Error = RoleChainError;

    fn try_from(hops: Vec<RoleHop>) -> Result<Self, Self::Error> {
        Self::new(hops)
    }
}

impl From<RoleChain> for Vec<RoleHop> {
    fn from(chain: RoleChain) -> Self {
        chain.hops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org_then_admin() -> Vec<RoleHop> {
        vec![RoleHop::new("OrgAccess").in_account("111111111111"), RoleHop::new("Admin")]
    }

    #[test]
    fn accepts_valid_chain_and_reports_target_account() {
        let chain = RoleChain::new(org_then_admin()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.terminal().role_name, "Admin");
        assert_eq!(chain.target_account(), Some("111111111111"));
    }

    #[test]
    fn single_terminal_hop_is_valid() {
        let chain = RoleChain::new(vec![RoleHop::new("ReadOnly")]).unwrap();
        assert_eq!(chain.target_account(), None);
    }

    #[test]
    fn rejects_empty_chain() {
        assert_eq!(RoleChain::new(Vec::new()), Err(RoleChainError::Empty));
    }

    #[test]
    fn rejects_intermediate_hop_without_account() {
        let err = RoleChain::new(vec![RoleHop::new("Org"), RoleHop::new("Admin")]).unwrap_err();
        assert_eq!(err, RoleChainError::MissingTargetAccount { index: 0, role: "Org".into() });

        let blank = vec![RoleHop::new("Org").in_account("  "), RoleHop::new("Admin")];
        assert!(matches!(
            RoleChain::new(blank),
            Err(RoleChainError::MissingTargetAccount { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_terminal_hop_with_account() {
        let hops = vec![RoleHop::new("Admin").in_account("222222222222")];
        assert_eq!(
            RoleChain::new(hops),
            Err(RoleChainError::TerminalTargetAccount { role: "Admin".into() })
        );
    }

    #[test]
    fn rejects_blank_role_name() {
        let hops = vec![RoleHop::new("Org").in_account("1"), RoleHop::new(" ")];
        assert_eq!(RoleChain::new(hops), Err(RoleChainError::EmptyRoleName { index: 1 }));
    }

    #[test]
    fn deserialization_runs_validation() {
        let bad = r#"[{"role_name":"Admin","target_account":"1"}]"#;
        assert!(serde_json::from_str::<RoleChain>(bad).is_err());

        let good = r#"[{"role_name":"Org","target_account":"1"},{"role_name":"Admin"}]"#;
        let chain: RoleChain = serde_json::from_str(good).unwrap();
        assert_eq!(chain.hops()[0].target_account.as_deref(), Some("1"));
    }
}
