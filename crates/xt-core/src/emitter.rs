use std::io::Write;

use tracing::{debug, warn};

use crate::error::{DumpError, DumpResult};
use crate::format::DumpFormatFlags;
use crate::render::{self, Clock};
use crate::store::{RuleStore, TableDescriptor};

/// Result of visiting one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpOutcome {
    Emitted,
    SkippedIncompatible,
    NotFound,
    /// Not a built-in table, so nothing is written for it.
    Absent,
}

/// Identification written into header lines.
pub struct EmitContext<'a> {
    pub program: &'a str,
    pub version: &'a str,
    pub clock: &'a dyn Clock,
}

/// Write the snapshot block of one table.
///
/// A built-in table the store does not hold yet is written as an empty
/// block. The block is built in memory first so that a backend failure
/// never leaves a partial table in the output.
pub fn emit<S, W>(
    store: &S,
    table: &TableDescriptor,
    flags: DumpFormatFlags,
    ctx: &EmitContext<'_>,
    sink: &mut W,
) -> DumpResult<DumpOutcome>
where
    S: RuleStore,
    W: Write + ?Sized,
{
    let name = table.name.as_str();

    if !table.is_builtin {
        debug!(table = name, "not a built-in table, nothing to dump");
        return Ok(DumpOutcome::Absent);
    }

    let present = store.has_table(name);
    if present && !store.is_table_compatible(name) {
        warn!(table = name, "table cannot be expressed in save format");
        writeln!(sink, "{}", render::incompatible_line(name))?;
        return Ok(DumpOutcome::SkippedIncompatible);
    }

    let chains = if present {
        store
            .chains(name)
            .map_err(|e| DumpError::backend(name, e.to_string()))?
    } else {
        debug!(table = name, "built-in table not loaded, writing empty block");
        vec![]
    };

    let mut lines = Vec::with_capacity(chains.len() * 2 + 4);
    lines.push(render::generated_line(
        ctx.program,
        ctx.version,
        &ctx.clock.now(),
    ));
    lines.push(render::table_line(name));

    // Chains go first so rules can jump to any of them on restore.
    for chain in &chains {
        lines.push(render::chain_line(chain, flags));
    }

    let mut rule_count = 0;
    for chain in &chains {
        let rules = store
            .rules(name, &chain.name)
            .map_err(|e| DumpError::backend(name, e.to_string()))?;
        rule_count += rules.len();
        for rule in &rules {
            lines.push(render::rule_line(&chain.name, rule, flags));
        }
    }

    lines.push("COMMIT".to_string());
    lines.push(render::completed_line(&ctx.clock.now()));

    let mut block = lines.join("\n");
    block.push('\n');
    sink.write_all(block.as_bytes())?;

    debug!(
        table = name,
        chains = chains.len(),
        rules = rule_count,
        "table emitted"
    );
    Ok(DumpOutcome::Emitted)
}
