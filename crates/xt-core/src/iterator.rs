use tracing::debug;

use crate::family::{FamilyProfile, NamedLookup};
use crate::request::DumpRequest;
use crate::store::{RuleStore, TableDescriptor};

/// Tables selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    Tables(Vec<TableDescriptor>),
    NotFound(String),
}

/// Work out which tables a request visits, in output order.
pub fn enumerate<S: RuleStore>(
    profile: &FamilyProfile,
    request: &DumpRequest,
    store: &S,
) -> TableSelection {
    let family = profile.family;

    // Fixed-table families never look at the catalog.
    if let Some(fixed) = profile.fixed_table {
        if store.has_table(fixed) {
            return TableSelection::Tables(vec![TableDescriptor::new(family, fixed)]);
        }
        return TableSelection::NotFound(fixed.to_string());
    }

    match request.table.as_deref() {
        Some(name) => {
            let known = match profile.named_lookup {
                NamedLookup::StoreOrBuiltin => {
                    store.has_table(name) || family.builtin_table(name).is_some()
                }
                NamedLookup::StoreOnly => store.has_table(name),
            };
            if known {
                TableSelection::Tables(vec![TableDescriptor::new(family, name)])
            } else {
                TableSelection::NotFound(name.to_string())
            }
        }
        None => {
            let present = store.table_names();
            let tables: Vec<_> = family
                .catalog()
                .iter()
                .filter(|builtin| present.iter().any(|p| p == builtin.name))
                .map(|builtin| TableDescriptor::new(family, builtin.name))
                .collect();
            debug!(
                family = %family,
                count = tables.len(),
                "selected built-in tables"
            );
            TableSelection::Tables(tables)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Family;
    use crate::testing::MemoryStore;

    fn names(selection: TableSelection) -> Vec<String> {
        match selection {
            TableSelection::Tables(tables) => tables.into_iter().map(|t| t.name).collect(),
            TableSelection::NotFound(name) => panic!("unexpected NotFound({})", name),
        }
    }

    #[test]
    fn whole_family_follows_catalog_order() {
        let store = MemoryStore::new(Family::Ipv4)
            .with_table("nat")
            .with_table("custom")
            .with_table("filter")
            .with_table("mangle");
        let request = DumpRequest::new(Family::Ipv4);

        assert_eq!(
            names(enumerate(&FamilyProfile::IPV4, &request, &store)),
            ["mangle", "filter", "nat"]
        );
    }

    #[test]
    fn named_builtin_table_is_known_even_when_absent() {
        let store = MemoryStore::new(Family::Ipv4);
        let request = DumpRequest::new(Family::Ipv4).with_table("raw");

        let selection = enumerate(&FamilyProfile::IPV4, &request, &store);
        match selection {
            TableSelection::Tables(tables) => {
                assert_eq!(tables.len(), 1);
                assert!(tables[0].is_builtin);
            }
            other => panic!("unexpected selection: {:?}", other),
        }
    }

    #[test]
    fn named_unknown_table_is_not_found() {
        let store = MemoryStore::new(Family::Ipv4).with_table("filter");
        let request = DumpRequest::new(Family::Ipv4).with_table("bogus");

        assert_eq!(
            enumerate(&FamilyProfile::IPV4, &request, &store),
            TableSelection::NotFound("bogus".into())
        );
    }

    #[test]
    fn bridge_named_lookup_requires_store_table() {
        let store = MemoryStore::new(Family::Bridge).with_table("filter");
        let request = DumpRequest::new(Family::Bridge).with_table("nat");

        assert_eq!(
            enumerate(&FamilyProfile::BRIDGE, &request, &store),
            TableSelection::NotFound("nat".into())
        );
    }

    #[test]
    fn arp_only_considers_fixed_table() {
        let store = MemoryStore::new(Family::Arp).with_table("filter");
        // The request table is ignored for the fixed-table family.
        let request = DumpRequest::new(Family::Arp).with_table("nat");
        assert_eq!(
            names(enumerate(&FamilyProfile::ARP, &request, &store)),
            ["filter"]
        );

        let empty = MemoryStore::new(Family::Arp);
        assert_eq!(
            enumerate(&FamilyProfile::ARP, &DumpRequest::new(Family::Arp), &empty),
            TableSelection::NotFound("filter".into())
        );
    }
}
