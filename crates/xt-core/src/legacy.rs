use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::DumpResult;
use crate::family::Family;

/// Where the kernel lists loaded legacy tables.
pub const PROC_NET: &str = "/proc/net";

fn names_file(family: Family) -> Option<(&'static str, &'static str)> {
    match family {
        Family::Ipv4 => Some(("ip_tables_names", "iptables")),
        Family::Ipv6 => Some(("ip6_tables_names", "ip6tables")),
        Family::Bridge | Family::Arp => None,
    }
}

/// Warn in the dump when legacy tables are loaded next to nftables ones.
///
/// Returns whether the warning was written.
pub fn check_legacy_tables<W: Write + ?Sized>(
    family: Family,
    proc_net: &Path,
    sink: &mut W,
) -> DumpResult<bool> {
    let Some((file, prefix)) = names_file(family) else {
        return Ok(false);
    };

    let path = proc_net.join(file);
    let present = match std::fs::read_to_string(&path) {
        Ok(content) => !content.trim().is_empty(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no legacy table list");
            false
        }
    };

    if present {
        writeln!(
            sink,
            "# Warning: {p}-legacy tables present, use {p}-legacy-save to see them",
            p = prefix
        )?;
    }
    Ok(present)
}
