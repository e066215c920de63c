use std::fmt;

/// Rule-set family a run is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Ipv4,
    Ipv6,
    Bridge,
    Arp,
}

impl Family {
    /// Family name as understood by `nft` (`nft list ruleset <family>`).
    pub fn nft_name(&self) -> &'static str {
        match self {
            Family::Ipv4 => "ip",
            Family::Ipv6 => "ip6",
            Family::Bridge => "bridge",
            Family::Arp => "arp",
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, Family::Ipv4 | Family::Ipv6)
    }

    /// Built-in table catalog of this family, in catalog order.
    pub fn catalog(&self) -> &'static [BuiltinTable] {
        match self {
            Family::Ipv4 | Family::Ipv6 => IP_TABLES,
            Family::Bridge => BRIDGE_TABLES,
            Family::Arp => ARP_TABLES,
        }
    }

    pub fn builtin_table(&self, name: &str) -> Option<&'static BuiltinTable> {
        self.catalog().iter().find(|t| t.name == name)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nft_name())
    }
}

/// A table predefined by a family together with its base chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTable {
    pub name: &'static str,
    pub chains: &'static [&'static str],
}

impl BuiltinTable {
    pub fn has_chain(&self, chain: &str) -> bool {
        self.chains.contains(&chain)
    }
}

const IP_TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        name: "mangle",
        chains: &["PREROUTING", "INPUT", "FORWARD", "OUTPUT", "POSTROUTING"],
    },
    BuiltinTable {
        name: "security",
        chains: &["INPUT", "FORWARD", "OUTPUT"],
    },
    BuiltinTable {
        name: "raw",
        chains: &["PREROUTING", "OUTPUT"],
    },
    BuiltinTable {
        name: "filter",
        chains: &["INPUT", "FORWARD", "OUTPUT"],
    },
    BuiltinTable {
        name: "nat",
        chains: &["PREROUTING", "INPUT", "OUTPUT", "POSTROUTING"],
    },
];

const BRIDGE_TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        name: "filter",
        chains: &["INPUT", "FORWARD", "OUTPUT"],
    },
    BuiltinTable {
        name: "nat",
        chains: &["PREROUTING", "OUTPUT", "POSTROUTING"],
    },
    BuiltinTable {
        name: "broute",
        chains: &["BROUTING"],
    },
];

const ARP_TABLES: &[BuiltinTable] = &[BuiltinTable {
    name: "filter",
    chains: &["INPUT", "OUTPUT", "FORWARD"],
}];

/// What a front end does when a requested table is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTablePolicy {
    /// Report on the error stream and fail the run.
    Fatal,
    /// Report inline with the dump; the run still succeeds.
    Soft,
    /// Nothing to dump; succeed silently.
    NothingToDo,
}

/// How a named table is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedLookup {
    /// Known if the store has it or it is a built-in table.
    StoreOrBuiltin,
    /// Known only if the store has it.
    StoreOnly,
}

/// Options a front end exposes on its command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSet {
    pub table_selector: bool,
    pub output_file: bool,
    pub family_selector: bool,
    pub legacy_counter_env: bool,
}

/// Per-family configuration of the shared dump engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyProfile {
    pub family: Family,
    /// Restrict the run to this table, ignoring the catalog.
    pub fixed_table: Option<&'static str>,
    pub named_lookup: NamedLookup,
    pub missing_table: MissingTablePolicy,
    pub options: OptionSet,
    /// Probe for legacy (non-nftables) tables after the dump.
    pub legacy_probe: bool,
}

const FILTER_OPTIONS: OptionSet = OptionSet {
    table_selector: true,
    output_file: true,
    family_selector: true,
    legacy_counter_env: false,
};

impl FamilyProfile {
    pub const IPV4: FamilyProfile = FamilyProfile {
        family: Family::Ipv4,
        fixed_table: None,
        named_lookup: NamedLookup::StoreOrBuiltin,
        missing_table: MissingTablePolicy::Fatal,
        options: FILTER_OPTIONS,
        legacy_probe: true,
    };

    pub const IPV6: FamilyProfile = FamilyProfile {
        family: Family::Ipv6,
        ..FamilyProfile::IPV4
    };

    // A missing named bridge table has always been reported without failing
    // the run; restore tooling may depend on the exit status.
    pub const BRIDGE: FamilyProfile = FamilyProfile {
        family: Family::Bridge,
        fixed_table: None,
        named_lookup: NamedLookup::StoreOnly,
        missing_table: MissingTablePolicy::Soft,
        options: OptionSet {
            table_selector: true,
            output_file: false,
            family_selector: false,
            legacy_counter_env: true,
        },
        legacy_probe: false,
    };

    pub const ARP: FamilyProfile = FamilyProfile {
        family: Family::Arp,
        fixed_table: Some("filter"),
        named_lookup: NamedLookup::StoreOnly,
        missing_table: MissingTablePolicy::NothingToDo,
        options: OptionSet {
            table_selector: false,
            output_file: false,
            family_selector: false,
            legacy_counter_env: false,
        },
        legacy_probe: false,
    };

    pub fn for_family(family: Family) -> FamilyProfile {
        match family {
            Family::Ipv4 => Self::IPV4,
            Family::Ipv6 => Self::IPV6,
            Family::Bridge => Self::BRIDGE,
            Family::Arp => Self::ARP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_catalog_order_is_stable() {
        let names: Vec<_> = Family::Ipv4.catalog().iter().map(|t| t.name).collect();
        assert_eq!(names, ["mangle", "security", "raw", "filter", "nat"]);
        assert_eq!(Family::Ipv6.catalog(), Family::Ipv4.catalog());
    }

    #[test]
    fn arp_catalog_only_has_filter() {
        assert_eq!(Family::Arp.catalog().len(), 1);
        assert!(Family::Arp.builtin_table("filter").is_some());
        assert!(Family::Arp.builtin_table("nat").is_none());
    }

    #[test]
    fn profiles_encode_missing_table_policy() {
        assert_eq!(FamilyProfile::IPV6.missing_table, MissingTablePolicy::Fatal);
        assert_eq!(FamilyProfile::IPV6.family, Family::Ipv6);
        assert_eq!(FamilyProfile::BRIDGE.missing_table, MissingTablePolicy::Soft);
        assert_eq!(FamilyProfile::ARP.missing_table, MissingTablePolicy::NothingToDo);
        assert!(FamilyProfile::BRIDGE.options.legacy_counter_env);
        assert!(!FamilyProfile::IPV4.options.legacy_counter_env);
    }
}
