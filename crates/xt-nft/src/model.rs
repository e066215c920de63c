use serde::{Deserialize, Serialize};
use tracing::debug;
use xt_core::{ChainRecord, Counters, Family, RuleRecord, RuleStore};

use crate::error::StoreError;

/// Rule state of one family, already in save-format terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default)]
    pub tables: Vec<TableState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub name: String,
    #[serde(default)]
    pub chains: Vec<ChainState>,
    /// Constructs found in the table that the save format cannot express.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub name: String,
    /// Base chains carry a policy, user chains do not.
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub packets: u64,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub rules: Vec<RuleState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleState {
    pub text: String,
    #[serde(default)]
    pub packets: u64,
    #[serde(default)]
    pub bytes: u64,
}

impl TableState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chains: vec![],
            unsupported: vec![],
        }
    }

    pub fn chain_mut(&mut self, name: &str) -> Option<&mut ChainState> {
        self.chains.iter_mut().find(|c| c.name == name)
    }
}

impl ChainState {
    pub fn new(name: &str, policy: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            policy,
            packets: 0,
            bytes: 0,
            rules: vec![],
        }
    }
}

/// Read-only store over a loaded ruleset.
#[derive(Debug, Clone)]
pub struct RulesetStore {
    family: Family,
    ruleset: Ruleset,
    source: &'static str,
}

impl RulesetStore {
    pub fn new(family: Family, mut ruleset: Ruleset, source: &'static str) -> Self {
        for table in &mut ruleset.tables {
            order_chains(family, table);
        }
        Self {
            family,
            ruleset,
            source,
        }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    fn table(&self, name: &str) -> Result<&TableState, StoreError> {
        self.ruleset
            .tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))
    }
}

impl Drop for RulesetStore {
    fn drop(&mut self) {
        debug!(family = %self.family, source = self.source, "ruleset handle released");
    }
}

// Built-in chains first in catalog order, user chains after in their
// original order.
fn order_chains(family: Family, table: &mut TableState) {
    let Some(builtin) = family.builtin_table(&table.name) else {
        return;
    };
    table.chains.sort_by_key(|chain| {
        builtin
            .chains
            .iter()
            .position(|c| *c == chain.name)
            .unwrap_or(builtin.chains.len())
    });
}

impl RuleStore for RulesetStore {
    type Error = StoreError;

    fn family(&self) -> Family {
        self.family
    }

    fn table_names(&self) -> Vec<String> {
        self.ruleset.tables.iter().map(|t| t.name.clone()).collect()
    }

    fn is_table_compatible(&self, name: &str) -> bool {
        // Nothing loaded means nothing the save format could get wrong.
        let Ok(table) = self.table(name) else {
            return true;
        };
        if !table.unsupported.is_empty() {
            debug!(table = name, reasons = ?table.unsupported, "unsupported constructs");
            return false;
        }
        let Some(builtin) = self.family.builtin_table(name) else {
            return false;
        };
        // A base chain the legacy tool does not know cannot be restored.
        table
            .chains
            .iter()
            .filter(|c| c.policy.is_some())
            .all(|c| builtin.has_chain(&c.name))
    }

    fn chains(&self, table: &str) -> Result<Vec<ChainRecord>, StoreError> {
        Ok(self
            .table(table)?
            .chains
            .iter()
            .map(|c| ChainRecord {
                name: c.name.clone(),
                policy: c.policy.clone(),
                counters: Counters::new(c.packets, c.bytes),
            })
            .collect())
    }

    fn rules(&self, table: &str, chain: &str) -> Result<Vec<RuleRecord>, StoreError> {
        let table = self.table(table)?;
        Ok(table
            .chains
            .iter()
            .find(|c| c.name == chain)
            .map(|c| {
                c.rules
                    .iter()
                    .map(|r| RuleRecord {
                        text: r.text.clone(),
                        counters: Counters::new(r.packets, r.bytes),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
