// Translation of nftables JSON rule expressions into save-format text.
//
// Only the expressions the legacy tools produce themselves are understood.
// Anything else makes the rule, and so its table, untranslatable.

use std::net::IpAddr;

use ipnet::IpNet;
use serde_json::Value;
use xt_core::{Counters, Family};

/// A rule rendered into save-format text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub text: String,
    pub counters: Counters,
}

/// Why a rule could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Untranslatable(pub String);

type Result<T> = std::result::Result<T, Untranslatable>;

fn unsupported<T>(what: impl Into<String>) -> Result<T> {
    Err(Untranslatable(what.into()))
}

#[derive(Default)]
struct RuleText {
    matches: Vec<String>,
    target: Option<String>,
    counters: Counters,
    protocol: Option<String>,
    protocol_negated: bool,
    // Match module the last option was appended to, so consecutive port
    // matches share one `-m tcp`.
    module: Option<String>,
}

impl RuleText {
    fn push(&mut self, part: String) {
        self.module = None;
        self.matches.push(part);
    }

    fn push_module_option(&mut self, module: &str, option: String) {
        if self.module.as_deref() != Some(module) {
            self.matches.push(format!("-m {}", module));
            self.module = Some(module.to_string());
        }
        self.matches.push(option);
    }

    fn set_target(&mut self, target: String) -> Result<()> {
        if self.target.is_some() {
            return unsupported("multiple verdicts");
        }
        self.target = Some(target);
        Ok(())
    }

    fn finish(self, comment: Option<&str>) -> Translated {
        let mut parts = self.matches;
        if let Some(comment) = comment {
            parts.push(format!("-m comment --comment {}", quote(comment)));
        }
        if let Some(target) = self.target {
            parts.push(target);
        }
        Translated {
            text: parts.join(" "),
            counters: self.counters,
        }
    }
}

/// Render the expressions of one rule.
pub fn translate_rule(family: Family, exprs: &[Value], comment: Option<&str>) -> Result<Translated> {
    let mut rule = RuleText::default();

    for expr in exprs {
        let Some((kind, body)) = expr.as_object().and_then(|o| o.iter().next()) else {
            return unsupported("malformed expression");
        };
        match kind.as_str() {
            "match" => translate_match(family, body, &mut rule)?,
            "counter" => {
                rule.counters = Counters::new(
                    body.get("packets").and_then(Value::as_u64).unwrap_or(0),
                    body.get("bytes").and_then(Value::as_u64).unwrap_or(0),
                );
            }
            _ => {
                let target = translate_statement(family, kind, body)?;
                rule.set_target(target)?;
            }
        }
    }

    Ok(rule.finish(comment))
}

/// Upper-case chain policy as written in the save format.
pub fn translate_policy(policy: &str) -> String {
    policy.to_ascii_uppercase()
}

fn translate_statement(family: Family, kind: &str, body: &Value) -> Result<String> {
    match kind {
        "accept" => Ok("-j ACCEPT".into()),
        "drop" => Ok("-j DROP".into()),
        "return" => Ok("-j RETURN".into()),
        "continue" if family == Family::Bridge => Ok("-j CONTINUE".into()),
        "jump" => chain_target(body).map(|t| format!("-j {}", t)),
        "goto" if family.is_filter() => chain_target(body).map(|t| format!("-g {}", t)),
        "reject" if family.is_filter() => reject_target(family, body),
        "masquerade" if family.is_filter() => masquerade_target(body),
        "snat" if family.is_filter() => {
            nat_target(body).map(|to| format!("-j SNAT --to-source {}", to))
        }
        "dnat" if family.is_filter() => {
            nat_target(body).map(|to| format!("-j DNAT --to-destination {}", to))
        }
        "log" if family.is_filter() => log_target(body),
        other => unsupported(format!("{} statement", other)),
    }
}

// Statement arguments the save format has no spelling for make the rule
// untranslatable instead of being dropped.
fn only_keys(body: &Value, keys: &[&str], what: &str) -> Result<()> {
    match body {
        Value::Null => Ok(()),
        Value::Object(o) => match o.keys().find(|k| !keys.contains(&k.as_str())) {
            Some(key) => unsupported(format!("{} {}", what, key)),
            None => Ok(()),
        },
        _ => unsupported(format!("{} argument", what)),
    }
}

fn reject_target(family: Family, body: &Value) -> Result<String> {
    only_keys(body, &["type", "expr"], "reject")?;
    let kind = body.get("type").and_then(Value::as_str);
    let code = body.get("expr").and_then(Value::as_str);

    let with = match (family, kind, code) {
        (_, None, None) => return Ok("-j REJECT".into()),
        (_, Some("tcp reset"), None) => "tcp-reset",
        (Family::Ipv4, Some("icmp"), Some(code)) => match code {
            "net-unreachable" => "icmp-net-unreachable",
            "host-unreachable" => "icmp-host-unreachable",
            "prot-unreachable" => "icmp-proto-unreachable",
            "port-unreachable" => "icmp-port-unreachable",
            "net-prohibited" => "icmp-net-prohibited",
            "host-prohibited" => "icmp-host-prohibited",
            "admin-prohibited" => "icmp-admin-prohibited",
            other => return unsupported(format!("reject code {}", other)),
        },
        (Family::Ipv6, Some("icmpv6"), Some(code)) => match code {
            "no-route" => "icmp6-no-route",
            "admin-prohibited" => "icmp6-adm-prohibited",
            "addr-unreachable" => "icmp6-addr-unreachable",
            "port-unreachable" => "icmp6-port-unreachable",
            other => return unsupported(format!("reject code {}", other)),
        },
        _ => return unsupported("reject type"),
    };
    Ok(format!("-j REJECT --reject-with {}", with))
}

fn masquerade_target(body: &Value) -> Result<String> {
    only_keys(body, &["port", "flags"], "masquerade")?;
    let mut target = "-j MASQUERADE".to_string();
    if let Some(port) = body.get("port") {
        target.push_str(&format!(" --to-ports {}", port_spec(port)?));
    }
    target.push_str(&nat_flags(body, &[("random", "--random"), ("fully-random", "--random-fully")])?);
    Ok(target)
}

fn log_target(body: &Value) -> Result<String> {
    only_keys(body, &["prefix", "level"], "log")?;
    let mut target = "-j LOG".to_string();
    if let Some(prefix) = body.get("prefix") {
        let Some(prefix) = prefix.as_str() else {
            return unsupported("log prefix");
        };
        target.push_str(&format!(" --log-prefix {}", quote(prefix)));
    }
    if let Some(level) = body.get("level") {
        // Syslog levels by number; warning is the default and never printed.
        let number = match level.as_str() {
            Some("emerg") => 0,
            Some("alert") => 1,
            Some("crit") => 2,
            Some("err") => 3,
            Some("warn") => 4,
            Some("notice") => 5,
            Some("info") => 6,
            Some("debug") => 7,
            _ => return unsupported(format!("log level {}", level)),
        };
        if number != 4 {
            target.push_str(&format!(" --log-level {}", number));
        }
    }
    Ok(target)
}

fn chain_target(body: &Value) -> Result<String> {
    match body.get("target").and_then(Value::as_str) {
        Some(target) => Ok(target.to_string()),
        None => unsupported("verdict without target"),
    }
}

fn nat_target(body: &Value) -> Result<String> {
    only_keys(body, &["addr", "port", "flags"], "nat")?;
    let Some(addr) = body.get("addr").and_then(Value::as_str) else {
        return unsupported("nat without address");
    };
    let mut to = match body.get("port") {
        Some(port) if addr.contains(':') => format!("[{}]:{}", addr, port_spec(port)?),
        Some(port) => format!("{}:{}", addr, port_spec(port)?),
        None => addr.to_string(),
    };
    to.push_str(&nat_flags(
        body,
        &[
            ("random", "--random"),
            ("fully-random", "--random-fully"),
            ("persistent", "--persistent"),
        ],
    )?);
    Ok(to)
}

/// A port or `{"range": [lo, hi]}` as `lo-hi`.
fn port_spec(value: &Value) -> Result<String> {
    match value.get("range").and_then(Value::as_array) {
        Some(range) if range.len() == 2 => {
            Ok(format!("{}-{}", port_number(&range[0])?, port_number(&range[1])?))
        }
        _ => port_number(value),
    }
}

fn port_number(value: &Value) -> Result<String> {
    match value.as_u64() {
        Some(port) if port <= u64::from(u16::MAX) => Ok(port.to_string()),
        _ => unsupported("port operand"),
    }
}

/// Render `flags` through `known`, which maps nft flag names to options.
fn nat_flags(body: &Value, known: &[(&str, &str)]) -> Result<String> {
    let names: Vec<&Value> = match body.get("flags") {
        None => return Ok(String::new()),
        Some(Value::Array(flags)) => flags.iter().collect(),
        Some(flag) => vec![flag],
    };
    let mut options = String::new();
    for name in names {
        let Some(name) = name.as_str() else {
            return unsupported("nat flags");
        };
        let Some((_, option)) = known.iter().find(|(flag, _)| *flag == name) else {
            return unsupported(format!("nat flag {}", name));
        };
        options.push(' ');
        options.push_str(option);
    }
    Ok(options)
}

fn translate_match(family: Family, body: &Value, rule: &mut RuleText) -> Result<()> {
    let negated = match body.get("op").and_then(Value::as_str) {
        Some("==") | Some("in") | None => false,
        Some("!=") => true,
        Some(op) => return unsupported(format!("match operator {}", op)),
    };
    let Some(left) = body.get("left") else {
        return unsupported("match without left operand");
    };
    let right = body.get("right").unwrap_or(&Value::Null);
    let bang = if negated { "! " } else { "" };

    if let Some(meta) = left.get("meta") {
        let key = meta.get("key").and_then(Value::as_str).unwrap_or_default();
        return match (key, family) {
            ("iifname", _) => {
                rule.push(format!("{}-i {}", bang, iface(right)?));
                Ok(())
            }
            ("oifname", _) => {
                rule.push(format!("{}-o {}", bang, iface(right)?));
                Ok(())
            }
            ("ibrname", Family::Bridge) => {
                rule.push(format!("{}--logical-in {}", bang, iface(right)?));
                Ok(())
            }
            ("obrname", Family::Bridge) => {
                rule.push(format!("{}--logical-out {}", bang, iface(right)?));
                Ok(())
            }
            ("l4proto", f) if f.is_filter() => protocol_match(right, bang, rule),
            _ => unsupported(format!("meta {}", key)),
        };
    }

    if let Some(payload) = left.get("payload") {
        let protocol = payload.get("protocol").and_then(Value::as_str).unwrap_or_default();
        let field = payload.get("field").and_then(Value::as_str).unwrap_or_default();
        return match (family, protocol, field) {
            (Family::Ipv4, "ip", "saddr") | (Family::Ipv6, "ip6", "saddr") => {
                rule.push(format!("{}-s {}", bang, prefix(right)?));
                Ok(())
            }
            (Family::Ipv4, "ip", "daddr") | (Family::Ipv6, "ip6", "daddr") => {
                rule.push(format!("{}-d {}", bang, prefix(right)?));
                Ok(())
            }
            (Family::Ipv4, "ip", "protocol") | (Family::Ipv6, "ip6", "nexthdr") => {
                protocol_match(right, bang, rule)
            }
            (f, "tcp" | "udp", "sport" | "dport") if f.is_filter() => {
                port_match(protocol, field, right, bang, rule)
            }
            (Family::Bridge, "ether", "saddr") => {
                rule.push(format!("{}-s {}", bang, scalar(right)?));
                Ok(())
            }
            (Family::Bridge, "ether", "daddr") => {
                rule.push(format!("{}-d {}", bang, scalar(right)?));
                Ok(())
            }
            (Family::Bridge, "ether", "type") => {
                rule.push(format!("{}-p {}", bang, ether_type(&scalar(right)?)));
                Ok(())
            }
            (Family::Arp, "arp", "operation") => {
                rule.push(format!("{}--opcode {}", bang, arp_opcode(&scalar(right)?)));
                Ok(())
            }
            _ => unsupported(format!("{} {} match", protocol, field)),
        };
    }

    if let Some(ct) = left.get("ct") {
        let key = ct.get("key").and_then(Value::as_str).unwrap_or_default();
        if key == "state" && family.is_filter() {
            let states: Vec<String> = set_items(right)?
                .iter()
                .map(|s| s.to_ascii_uppercase())
                .collect();
            rule.push_module_option("conntrack", format!("{}--ctstate {}", bang, states.join(",")));
            return Ok(());
        }
        return unsupported(format!("ct {}", key));
    }

    unsupported("match on unknown expression")
}

fn protocol_match(right: &Value, bang: &str, rule: &mut RuleText) -> Result<()> {
    let proto = scalar(right)?;
    rule.push(format!("{}-p {}", bang, proto));
    if bang.is_empty() {
        rule.protocol = Some(proto);
    } else {
        rule.protocol_negated = true;
    }
    Ok(())
}

fn port_match(proto: &str, field: &str, right: &Value, bang: &str, rule: &mut RuleText) -> Result<()> {
    // `! -p tcp` followed by a tcp port has no consistent spelling.
    if rule.protocol_negated {
        return unsupported(format!("{} {} after negated protocol", proto, field));
    }
    if rule.protocol.as_deref() != Some(proto) {
        rule.push(format!("-p {}", proto));
        rule.protocol = Some(proto.to_string());
    }
    let ports = match right.get("range").and_then(Value::as_array) {
        Some(range) if range.len() == 2 => format!("{}:{}", scalar(&range[0])?, scalar(&range[1])?),
        _ => scalar(right)?,
    };
    rule.push_module_option(proto, format!("{}--{} {}", bang, field, ports));
    Ok(())
}

fn scalar(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => unsupported("non-scalar operand"),
    }
}

fn set_items(value: &Value) -> Result<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(o) => match o.get("set").and_then(Value::as_array) {
            Some(items) => items,
            None => return unsupported("anonymous set"),
        },
        other => return Ok(vec![scalar(other)?]),
    };
    items.iter().map(scalar).collect()
}

// nft spells interface wildcards `eth*`, the save format `eth+`.
fn iface(value: &Value) -> Result<String> {
    let name = scalar(value)?;
    Ok(match name.strip_suffix('*') {
        Some(stem) => format!("{}+", stem),
        None => name,
    })
}

fn prefix(value: &Value) -> Result<String> {
    let net = match value {
        Value::String(s) => {
            let addr: IpAddr = s
                .parse()
                .map_err(|_| Untranslatable(format!("address {}", s)))?;
            IpNet::from(addr)
        }
        Value::Object(o) => {
            let Some(p) = o.get("prefix") else {
                return unsupported("address operand");
            };
            let addr: IpAddr = p
                .get("addr")
                .and_then(Value::as_str)
                .and_then(|a| a.parse().ok())
                .ok_or_else(|| Untranslatable("prefix address".into()))?;
            let len = p
                .get("len")
                .and_then(Value::as_u64)
                .and_then(|l| u8::try_from(l).ok())
                .ok_or_else(|| Untranslatable("prefix length".into()))?;
            IpNet::new(addr, len).map_err(|_| Untranslatable(format!("prefix {}/{}", addr, len)))?
        }
        _ => return unsupported("address operand"),
    };
    Ok(net.to_string())
}

fn ether_type(name: &str) -> String {
    match name {
        "ip" => "IPv4".into(),
        "ip6" => "IPv6".into(),
        "arp" => "ARP".into(),
        "vlan" => "802_1Q".into(),
        other => other.to_string(),
    }
}

fn arp_opcode(name: &str) -> String {
    match name {
        "request" => "1".into(),
        "reply" => "2".into(),
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
