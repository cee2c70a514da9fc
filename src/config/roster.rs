use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::AccountId;

/// The static set of accounts a run reports on.
///
/// Order is significant: report rows follow roster order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterConfig {
    pub accounts: Vec<AccountId>,
}

impl RosterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::Validation(
                "roster.accounts must list at least one account id".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.accounts.len());
        for id in &self.accounts {
            if !seen.insert(id) {
                return Err(ConfigError::Validation(format!(
                    "roster.accounts lists account {id} more than once"
                )));
            }
        }

        Ok(())
    }
}

/// Account-loop policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Skip an account whose scoping, lookup or queries fail and keep going.
    /// When false the first account failure aborts the run.
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            continue_on_error: default_continue_on_error(),
        }
    }
}

fn default_continue_on_error() -> bool {
    true
}
