// Line layout of the save format.

use chrono::{DateTime, Local, TimeZone};

use crate::format::DumpFormatFlags;
use crate::store::{ChainRecord, RuleRecord};

/// Source of the timestamps written into header and footer lines.
pub trait Clock {
    fn now(&self) -> String;
}

/// Wall clock in the local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        ctime(&Local::now())
    }
}

/// Format a time the way `ctime(3)` does, without the trailing newline.
pub fn ctime<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%a %b %e %H:%M:%S %Y").to_string()
}

pub fn generated_line(program: &str, version: &str, timestamp: &str) -> String {
    format!("# Generated by {} v{} on {}", program, version, timestamp)
}

pub fn completed_line(timestamp: &str) -> String {
    format!("# Completed on {}", timestamp)
}

pub fn table_line(table: &str) -> String {
    format!("*{}", table)
}

pub fn incompatible_line(table: &str) -> String {
    format!("# Table '{}' is incompatible, use the native tool.", table)
}

/// `:<chain> <POLICY|->` with optional `[packets:bytes]`.
pub fn chain_line(chain: &ChainRecord, flags: DumpFormatFlags) -> String {
    let policy = chain.policy.as_deref().unwrap_or("-");
    let mut line = format!(":{} {}", chain.name, policy);
    if flags.counters() {
        line.push_str(&format!(
            " [{}:{}]",
            chain.counters.packets, chain.counters.bytes
        ));
    }
    line
}

/// `-A <chain> <text>` with optional trailing counters.
pub fn rule_line(chain: &str, rule: &RuleRecord, flags: DumpFormatFlags) -> String {
    let mut line = format!("-A {}", chain);
    if !rule.text.is_empty() {
        line.push(' ');
        line.push_str(&rule.text);
    }
    if flags.counters() {
        let c = rule.counters;
        if flags.legacy_syntax() {
            line.push_str(&format!(" , pcnt = {} -- bcnt = {}", c.packets, c.bytes));
        } else {
            line.push_str(&format!(" -c {} {}", c.packets, c.bytes));
        }
    }
    line
}
