use crate::family::Family;

/// Packet and byte counters of a chain or rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
}

impl Counters {
    pub fn new(packets: u64, bytes: u64) -> Self {
        Self { packets, bytes }
    }
}

/// One chain declaration as handed over by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRecord {
    pub name: String,
    /// Default policy; `None` for user-defined chains.
    pub policy: Option<String>,
    pub counters: Counters,
}

/// One rule with its rendered match/target text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub text: String,
    pub counters: Counters,
}

/// A table selected for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub family: Family,
    pub is_builtin: bool,
}

impl TableDescriptor {
    pub fn new(family: Family, name: &str) -> Self {
        Self {
            name: name.to_string(),
            family,
            is_builtin: family.builtin_table(name).is_some(),
        }
    }
}

/// Read access to the rule state of one family.
///
/// Implementations own whatever handle they need; dropping the store
/// releases it.
pub trait RuleStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn family(&self) -> Family;

    /// Names of the tables present in the store.
    fn table_names(&self) -> Vec<String>;

    fn has_table(&self, name: &str) -> bool {
        self.table_names().iter().any(|t| t == name)
    }

    /// Whether the table can be expressed in the save format. Tables the
    /// store does not hold count as compatible.
    fn is_table_compatible(&self, name: &str) -> bool;

    /// Chains of a table, built-in chains first in catalog order.
    fn chains(&self, table: &str) -> Result<Vec<ChainRecord>, Self::Error>;

    /// Rules of one chain, in evaluation order.
    fn rules(&self, table: &str, chain: &str) -> Result<Vec<RuleRecord>, Self::Error>;
}
