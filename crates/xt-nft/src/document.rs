use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use xt_core::Family;

use crate::model::{Ruleset, RulesetStore, TableState};

/// Ruleset document on disk, one table list per family.
///
/// YAML is the native format; JSON documents load as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesetDocument {
    #[serde(default)]
    pub ip: Vec<TableState>,
    #[serde(default)]
    pub ip6: Vec<TableState>,
    #[serde(default)]
    pub bridge: Vec<TableState>,
    #[serde(default)]
    pub arp: Vec<TableState>,
}

impl RulesetDocument {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ruleset document {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse ruleset document {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn into_ruleset(self, family: Family) -> Ruleset {
        let tables = match family {
            Family::Ipv4 => self.ip,
            Family::Ipv6 => self.ip6,
            Family::Bridge => self.bridge,
            Family::Arp => self.arp,
        };
        Ruleset { tables }
    }
}

/// Offline store backed by a ruleset document.
pub struct DocumentStore;

impl DocumentStore {
    pub fn open(path: &Path, family: Family) -> Result<RulesetStore> {
        let document = RulesetDocument::from_file(path)?;
        Ok(RulesetStore::new(
            family,
            document.into_ruleset(family),
            "document",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xt_core::RuleStore;

    const DOC: &str = r#"
ip:
  - name: filter
    chains:
      - name: INPUT
        policy: DROP
        packets: 10
        bytes: 600
        rules:
          - text: "-i lo -j ACCEPT"
            packets: 4
            bytes: 240
      - name: OUTPUT
        policy: ACCEPT
bridge:
  - name: broute
    unsupported: [flowtable]
    chains:
      - name: BROUTING
        policy: ACCEPT
"#;

    #[test]
    fn selects_family_tables() {
        let doc = RulesetDocument::parse(DOC).unwrap();
        let ruleset = doc.clone().into_ruleset(Family::Ipv4);
        assert_eq!(ruleset.tables.len(), 1);
        assert_eq!(ruleset.tables[0].chains[0].rules[0].packets, 4);

        assert!(doc.clone().into_ruleset(Family::Ipv6).tables.is_empty());
        assert_eq!(doc.into_ruleset(Family::Bridge).tables[0].unsupported, ["flowtable"]);
    }

    #[test]
    fn json_documents_load_too() {
        let doc = RulesetDocument::parse(
            r#"{"arp": [{"name": "filter", "chains": [{"name": "INPUT", "policy": "ACCEPT"}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.into_ruleset(Family::Arp).tables[0].name, "filter");
    }

    #[test]
    fn open_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = DocumentStore::open(&path, Family::Ipv4).err().expect("missing file");
        assert!(format!("{:#}", err).contains("absent.yaml"));
    }

    #[test]
    fn open_builds_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, DOC).unwrap();

        let store = DocumentStore::open(&path, Family::Bridge).unwrap();
        assert_eq!(store.table_names(), ["broute"]);
        assert!(!store.is_table_compatible("broute"));
    }
}
