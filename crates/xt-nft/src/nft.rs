use std::process::Command;

use serde_json::Value;
use tracing::{debug, warn};
use xt_core::Family;

use crate::error::StoreError;
use crate::model::{ChainState, RuleState, Ruleset, RulesetStore, TableState};
use crate::translate::{translate_policy, translate_rule};

/// Live ruleset read from the `nft` tool.
pub struct NftStore;

impl NftStore {
    /// Snapshot the ruleset of `family` with `nft -j list ruleset <family>`.
    pub fn open(family: Family) -> Result<RulesetStore, StoreError> {
        let output = Command::new("nft")
            .arg("-j")
            .arg("list")
            .arg("ruleset")
            .arg(family.nft_name())
            .output()
            .map_err(StoreError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::Command(stderr.trim().to_string()));
        }

        let json_output = String::from_utf8_lossy(&output.stdout);
        let ruleset = parse_ruleset(family, &json_output)?;
        debug!(family = %family, tables = ruleset.tables.len(), "nft ruleset loaded");
        Ok(RulesetStore::new(family, ruleset, "nft"))
    }
}

/// Build a ruleset from `nft -j` output, keeping only objects of `family`.
pub fn parse_ruleset(family: Family, json: &str) -> Result<Ruleset, StoreError> {
    // nft prints nothing at all for an empty family.
    if json.trim().is_empty() {
        return Ok(Ruleset::default());
    }

    let parsed: Value = serde_json::from_str(json)?;
    let mut ruleset = Ruleset::default();

    let Some(nftables) = parsed.get("nftables").and_then(|n| n.as_array()) else {
        return Ok(ruleset);
    };

    for item in nftables {
        if let Some(table) = item.get("table") {
            if !in_family(table, family) {
                continue;
            }
            if let Some(name) = table.get("name").and_then(|n| n.as_str()) {
                ruleset.tables.push(TableState::new(name));
            }
        } else if let Some(chain) = item.get("chain") {
            if !in_family(chain, family) {
                continue;
            }
            if let (Some(table), Some(name)) = (
                chain.get("table").and_then(|t| t.as_str()),
                chain.get("name").and_then(|n| n.as_str()),
            ) {
                let policy = match (chain.get("hook"), chain.get("policy").and_then(|p| p.as_str())) {
                    (Some(_), Some(policy)) => Some(translate_policy(policy)),
                    (Some(_), None) => Some("ACCEPT".to_string()),
                    (None, _) => None,
                };
                if let Some(t) = table_mut(&mut ruleset, table) {
                    t.chains.push(ChainState::new(name, policy));
                }
            }
        } else if let Some(rule) = item.get("rule") {
            if !in_family(rule, family) {
                continue;
            }
            add_rule(&mut ruleset, family, rule);
        }
    }

    Ok(ruleset)
}

fn in_family(object: &Value, family: Family) -> bool {
    object.get("family").and_then(|f| f.as_str()) == Some(family.nft_name())
}

fn table_mut<'a>(ruleset: &'a mut Ruleset, name: &str) -> Option<&'a mut TableState> {
    ruleset.tables.iter_mut().find(|t| t.name == name)
}

fn add_rule(ruleset: &mut Ruleset, family: Family, rule: &Value) {
    let (Some(table_name), Some(chain_name)) = (
        rule.get("table").and_then(|t| t.as_str()),
        rule.get("chain").and_then(|c| c.as_str()),
    ) else {
        return;
    };
    let Some(table) = table_mut(ruleset, table_name) else {
        return;
    };

    let exprs = rule
        .get("expr")
        .and_then(|e| e.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    let comment = rule.get("comment").and_then(|c| c.as_str());

    match translate_rule(family, exprs, comment) {
        Ok(translated) => {
            if let Some(chain) = table.chain_mut(chain_name) {
                chain.rules.push(RuleState {
                    text: translated.text,
                    packets: translated.counters.packets,
                    bytes: translated.counters.bytes,
                });
            }
        }
        Err(reason) => {
            warn!(
                table = table_name,
                chain = chain_name,
                reason = %reason.0,
                "rule cannot be expressed in save format"
            );
            table.unsupported.push(reason.0);
        }
    }
}
