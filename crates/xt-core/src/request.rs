use crate::family::Family;

/// Parameters of one dump run, built from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    pub family: Family,
    /// Dump only this table instead of every built-in one.
    pub table: Option<String>,
    pub counters: bool,
}

impl DumpRequest {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            table: None,
            counters: false,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_counters(mut self, counters: bool) -> Self {
        self.counters = counters;
        self
    }
}
