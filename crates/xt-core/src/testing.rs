// In-memory store and fixed clock shared by the unit tests.

use thiserror::Error;

use crate::family::Family;
use crate::render::Clock;
use crate::store::{ChainRecord, Counters, RuleRecord, RuleStore};

#[derive(Debug, Error)]
#[error("broken table {0}")]
pub struct BrokenTable(pub String);

#[derive(Debug, Clone)]
struct MemTable {
    name: String,
    compatible: bool,
    broken: bool,
    chains: Vec<(ChainRecord, Vec<RuleRecord>)>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    family: Family,
    tables: Vec<MemTable>,
}

impl MemoryStore {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            tables: vec![],
        }
    }

    pub fn with_table(mut self, name: &str) -> Self {
        self.tables.push(MemTable {
            name: name.to_string(),
            compatible: true,
            broken: false,
            chains: vec![],
        });
        self
    }

    /// Add a chain to the most recently added table.
    pub fn with_chain(mut self, name: &str, policy: Option<&str>) -> Self {
        let table = self.tables.last_mut().expect("add a table first");
        table.chains.push((
            ChainRecord {
                name: name.to_string(),
                policy: policy.map(str::to_string),
                counters: Counters::new(3, 180),
            },
            vec![],
        ));
        self
    }

    /// Add a rule to the most recently added chain.
    pub fn with_rule(mut self, text: &str) -> Self {
        let table = self.tables.last_mut().expect("add a table first");
        let (_, rules) = table.chains.last_mut().expect("add a chain first");
        rules.push(RuleRecord {
            text: text.to_string(),
            counters: Counters::new(5, 300),
        });
        self
    }

    pub fn incompatible(mut self) -> Self {
        if let Some(table) = self.tables.last_mut() {
            table.compatible = false;
        }
        self
    }

    pub fn broken(mut self) -> Self {
        if let Some(table) = self.tables.last_mut() {
            table.broken = true;
        }
        self
    }

    fn table(&self, name: &str) -> Option<&MemTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl RuleStore for MemoryStore {
    type Error = BrokenTable;

    fn family(&self) -> Family {
        self.family
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    fn is_table_compatible(&self, name: &str) -> bool {
        self.table(name).map(|t| t.compatible).unwrap_or(true)
    }

    fn chains(&self, table: &str) -> Result<Vec<ChainRecord>, BrokenTable> {
        let t = self.table(table).ok_or_else(|| BrokenTable(table.into()))?;
        Ok(t.chains.iter().map(|(c, _)| c.clone()).collect())
    }

    fn rules(&self, table: &str, chain: &str) -> Result<Vec<RuleRecord>, BrokenTable> {
        let t = self.table(table).ok_or_else(|| BrokenTable(table.into()))?;
        if t.broken {
            return Err(BrokenTable(table.into()));
        }
        Ok(t.chains
            .iter()
            .find(|(c, _)| c.name == chain)
            .map(|(_, rules)| rules.clone())
            .unwrap_or_default())
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> String {
        "Sat Oct 17 09:30:00 2026".to_string()
    }
}
