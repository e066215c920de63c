use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Args, Parser};
use xt_core::{DumpRequest, Family, FamilyProfile};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save tool personalities of the multi-call binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEnd {
    Iptables,
    Ip6tables,
    Ebtables,
    Arptables,
}

impl FrontEnd {
    pub const ALL: [FrontEnd; 4] = [
        FrontEnd::Iptables,
        FrontEnd::Ip6tables,
        FrontEnd::Ebtables,
        FrontEnd::Arptables,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrontEnd::Iptables => "iptables-save",
            FrontEnd::Ip6tables => "ip6tables-save",
            FrontEnd::Ebtables => "ebtables-save",
            FrontEnd::Arptables => "arptables-save",
        }
    }

    /// Match a program name such as `iptables-save` or `iptables-nft-save`.
    pub fn from_program(program: &str) -> Option<Self> {
        let name = program.replace("-nft-", "-");
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn default_family(&self) -> Family {
        match self {
            FrontEnd::Iptables => Family::Ipv4,
            FrontEnd::Ip6tables => Family::Ipv6,
            FrontEnd::Ebtables => Family::Bridge,
            FrontEnd::Arptables => Family::Arp,
        }
    }
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Read rules from a ruleset document instead of the live ruleset
    #[arg(long = "from", value_name = "PATH")]
    pub from: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(disable_version_flag = true, about = "Dump iptables/ip6tables rules in save format")]
pub struct FilterArgs {
    /// Include packet and byte counters
    #[arg(short, long)]
    pub counters: bool,
    /// Dump only this table
    #[arg(short, long, value_name = "TABLE")]
    pub table: Option<String>,
    /// Write output to a file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,
    /// Dump IPv4 rules
    #[arg(short = '4', long = "ipv4", overrides_with = "ipv6")]
    pub ipv4: bool,
    /// Dump IPv6 rules
    #[arg(short = '6', long = "ipv6", overrides_with = "ipv4")]
    pub ipv6: bool,
    /// Exit successfully once the dump is written
    #[arg(short, long)]
    pub dump: bool,
    /// Binary output (not implemented)
    #[arg(short, long)]
    pub binary: bool,
    /// Module loader program (ignored)
    #[arg(short = 'M', long, value_name = "PROGRAM")]
    pub modprobe: Option<String>,
    /// Print version and exit
    #[arg(short = 'V', long)]
    pub version: bool,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug)]
#[command(disable_version_flag = true, about = "Dump ebtables rules in save format")]
pub struct BridgeArgs {
    /// Include packet and byte counters
    #[arg(short, long)]
    pub counters: bool,
    /// Dump only this table
    #[arg(short, long, value_name = "TABLE")]
    pub table: Option<String>,
    /// Module loader program (ignored)
    #[arg(short = 'M', long, value_name = "PROGRAM")]
    pub modprobe: Option<String>,
    /// Print version and exit
    #[arg(short = 'V', long)]
    pub version: bool,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug)]
#[command(disable_version_flag = true, about = "Dump arptables rules in save format")]
pub struct ArpArgs {
    /// Include packet and byte counters
    #[arg(short, long)]
    pub counters: bool,
    /// Module loader program (ignored)
    #[arg(short = 'M', long, value_name = "PROGRAM")]
    pub modprobe: Option<String>,
    /// Print version and exit
    #[arg(short = 'V', long)]
    pub version: bool,
    #[command(flatten)]
    pub source: SourceArgs,
}

/// A fully parsed dump invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub profile: FamilyProfile,
    pub request: DumpRequest,
    pub output: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub force_success: bool,
    pub binary: bool,
    pub modprobe: Option<String>,
}

#[derive(Debug)]
pub enum Command {
    Dump(Invocation),
    Version(String),
}

/// Reasons parsing stops without a dump.
#[derive(Debug)]
pub enum ParseFailure {
    /// No front end could be chosen from the program name or first argument.
    UnknownFrontEnd,
    /// Argument error or help request from clap.
    Clap { program: String, error: clap::Error },
}

fn basename(arg: &OsString) -> String {
    Path::new(arg)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Pick the front end from `argv[0]` or, failing that, the first argument.
pub fn split_front_end(args: Vec<OsString>) -> Option<(FrontEnd, Vec<OsString>)> {
    let mut args = args.into_iter();
    let argv0 = args.next()?;

    if let Some(front_end) = FrontEnd::from_program(&basename(&argv0)) {
        let rest = std::iter::once(OsString::from(basename(&argv0))).chain(args);
        return Some((front_end, rest.collect()));
    }

    let first = args.next()?;
    let front_end = FrontEnd::from_program(&first.to_string_lossy())?;
    let rest = std::iter::once(first).chain(args);
    Some((front_end, rest.collect()))
}

pub fn parse(args: Vec<OsString>) -> Result<Command, ParseFailure> {
    let (front_end, args) = split_front_end(args).ok_or(ParseFailure::UnknownFrontEnd)?;
    let program = basename(&args[0]);
    let clap_failure = |error| ParseFailure::Clap {
        program: program.clone(),
        error,
    };

    let version = || Command::Version(format!("{} v{} (nf_tables)", program, VERSION));

    let invocation = match front_end {
        FrontEnd::Iptables | FrontEnd::Ip6tables => {
            let a = FilterArgs::try_parse_from(&args).map_err(clap_failure)?;
            if a.version {
                return Ok(version());
            }
            let family = if a.ipv6 {
                Family::Ipv6
            } else if a.ipv4 {
                Family::Ipv4
            } else {
                front_end.default_family()
            };
            let mut request = DumpRequest::new(family).with_counters(a.counters);
            request.table = a.table;
            Invocation {
                program: program.clone(),
                profile: FamilyProfile::for_family(family),
                request,
                output: a.file,
                source: a.source.from,
                force_success: a.dump,
                binary: a.binary,
                modprobe: a.modprobe,
            }
        }
        FrontEnd::Ebtables => {
            let a = BridgeArgs::try_parse_from(&args).map_err(clap_failure)?;
            if a.version {
                return Ok(version());
            }
            let mut request = DumpRequest::new(Family::Bridge).with_counters(a.counters);
            request.table = a.table;
            Invocation {
                program: program.clone(),
                profile: FamilyProfile::BRIDGE,
                request,
                output: None,
                source: a.source.from,
                force_success: false,
                binary: false,
                modprobe: a.modprobe,
            }
        }
        FrontEnd::Arptables => {
            let a = ArpArgs::try_parse_from(&args).map_err(clap_failure)?;
            if a.version {
                return Ok(version());
            }
            Invocation {
                program: program.clone(),
                profile: FamilyProfile::ARP,
                request: DumpRequest::new(Family::Arp).with_counters(a.counters),
                output: None,
                source: a.source.from,
                force_success: false,
                binary: false,
                modprobe: a.modprobe,
            }
        }
    };

    Ok(Command::Dump(invocation))
}
