mod cli;

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::error::ErrorKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xt_core::format::{LEGACY_COUNTER_ENV, legacy_toggle_enabled};
use xt_core::legacy::PROC_NET;
use xt_core::{Clock, DumpError, DumpFormatFlags, EmitContext, Orchestrator, OutputSink, SystemClock};
use xt_nft::{DocumentStore, NftStore, RulesetStore};

use cli::{Command, Invocation, ParseFailure, VERSION};

/// Process-level inputs that tests replace.
struct Environment<'a> {
    legacy_counter_env: Option<String>,
    clock: &'a dyn Clock,
    proc_net: &'a Path,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let env = Environment {
        legacy_counter_env: std::env::var(LEGACY_COUNTER_ENV).ok(),
        clock: &SystemClock,
        proc_net: Path::new(PROC_NET),
    };

    let code = run_cli(std::env::args_os().collect(), &env, &mut io::stderr());
    std::process::exit(code);
}

fn run_cli(args: Vec<OsString>, env: &Environment<'_>, diag: &mut dyn Write) -> i32 {
    let invocation = match cli::parse(args) {
        Ok(Command::Dump(invocation)) => invocation,
        Ok(Command::Version(line)) => {
            println!("{}", line);
            return 0;
        }
        Err(failure) => return report_parse_failure(failure, diag),
    };

    if invocation.binary {
        note(diag, "-b/--binary option is not implemented");
    }
    if let Some(program) = &invocation.modprobe {
        debug!(program = %program, "module loader option ignored");
    }

    // Redirection happens once, before anything is emitted.
    let mut sink = match OutputSink::acquire(invocation.output.as_deref()) {
        Ok(sink) => sink,
        Err(e) => {
            note(diag, &format!("Failed to open file, error: {}", source_message(&e)));
            return 1;
        }
    };

    let result = dump(&invocation, env, &mut sink, diag).and_then(|code| {
        sink.finish().context("failed to flush output")?;
        Ok(code)
    });

    match result {
        Ok(_) if invocation.force_success => 0,
        Ok(code) => code,
        Err(e) => {
            note(diag, &failure_message(&invocation, &e));
            1
        }
    }
}

/// Run the dump for a parsed invocation and return its exit code.
fn dump(
    invocation: &Invocation,
    env: &Environment<'_>,
    sink: &mut dyn Write,
    diag: &mut dyn Write,
) -> anyhow::Result<i32> {
    let profile = invocation.profile;
    let legacy_env_set = profile.options.legacy_counter_env
        && legacy_toggle_enabled(env.legacy_counter_env.as_deref());
    let flags = DumpFormatFlags::resolve(invocation.request.counters, legacy_env_set);
    debug!(program = %invocation.program, ?flags, "starting dump");

    let orchestrator = Orchestrator::new(
        profile,
        EmitContext {
            program: &invocation.program,
            version: VERSION,
            clock: env.clock,
        },
    )
    .with_proc_net(env.proc_net);

    let report = orchestrator.run(
        &invocation.request,
        flags,
        |family| open_store(invocation.source.as_deref(), family),
        sink,
        diag,
    )?;
    Ok(report.exit_code())
}

fn open_store(source: Option<&Path>, family: xt_core::Family) -> Result<RulesetStore, String> {
    match source {
        Some(path) => DocumentStore::open(path, family).map_err(|e| format!("{:#}", e)),
        None => NftStore::open(family).map_err(|e| e.to_string()),
    }
}

fn failure_message(invocation: &Invocation, err: &anyhow::Error) -> String {
    match err.downcast_ref::<DumpError>() {
        Some(DumpError::Init(reason)) => format!(
            "{}/{} Failed to initialize nft: {}",
            invocation.program, VERSION, reason
        ),
        _ => format!("{}: {:#}", invocation.program, err),
    }
}

// Nothing useful is left to do when the error stream itself fails.
fn note(diag: &mut dyn Write, message: &str) {
    if let Err(e) = writeln!(diag, "{}", message) {
        debug!(error = %e, "could not write to the error stream");
    }
}

fn source_message(err: &DumpError) -> String {
    match err {
        DumpError::Output(io) => io.to_string(),
        other => other.to_string(),
    }
}

fn report_parse_failure(failure: ParseFailure, diag: &mut dyn Write) -> i32 {
    match failure {
        ParseFailure::UnknownFrontEnd => {
            let names: Vec<_> = cli::FrontEnd::ALL.iter().map(|f| f.name()).collect();
            note(diag, &format!("usage: xtsave <{}> [options]", names.join("|")));
            1
        }
        ParseFailure::Clap { program, error } => match error.kind() {
            ErrorKind::DisplayHelp => {
                let _ = error.print();
                0
            }
            _ => {
                note(
                    diag,
                    &format!(
                        "{}Look at manual page `{}.8' for more information.",
                        error, program
                    ),
                );
                1
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> String {
            "Sat Oct 17 09:30:00 2026".to_string()
        }
    }

    const DOC: &str = r#"
ip:
  - name: nat
    unsupported: [flowtable]
    chains:
      - name: POSTROUTING
        policy: ACCEPT
  - name: filter
    chains:
      - name: INPUT
        policy: DROP
        packets: 100
        bytes: 8000
        rules:
          - text: "-i lo -j ACCEPT"
            packets: 4
            bytes: 240
      - name: OUTPUT
        policy: ACCEPT
bridge:
  - name: filter
    chains:
      - name: FORWARD
        policy: ACCEPT
        rules:
          - text: "-i eth0 -j DROP"
            packets: 2
            bytes: 120
"#;

    struct Fixture {
        dir: tempfile::TempDir,
        doc: String,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let doc = dir.path().join("rules.yaml");
            std::fs::write(&doc, DOC).unwrap();
            Self {
                doc: doc.to_string_lossy().into_owned(),
                dir,
            }
        }

        fn env(&self, legacy: Option<&str>) -> Environment<'_> {
            Environment {
                legacy_counter_env: legacy.map(str::to_string),
                clock: &FixedClock,
                // An empty directory: no legacy tables.
                proc_net: self.dir.path(),
            }
        }

        fn args(&self, list: &[&str]) -> Vec<OsString> {
            list.iter()
                .map(OsString::from)
                .chain([OsString::from("--from"), OsString::from(&self.doc)])
                .collect()
        }

        /// Dump straight into memory, bypassing redirection.
        fn dump(&self, list: &[&str], legacy: Option<&str>) -> (i32, String, String) {
            let invocation = match cli::parse(self.args(list)).unwrap() {
                Command::Dump(invocation) => invocation,
                Command::Version(_) => panic!("unexpected version request"),
            };
            let mut out = Vec::new();
            let mut err = Vec::new();
            let code = dump(&invocation, &self.env(legacy), &mut out, &mut err).unwrap();
            (
                code,
                String::from_utf8(out).unwrap(),
                String::from_utf8(err).unwrap(),
            )
        }
    }

    #[test]
    fn redirected_output_matches_direct_output() {
        let fx = Fixture::new();
        let target = fx.dir.path().join("saved.v4");
        let target_arg = target.to_str().unwrap();
        let mut diag = Vec::new();

        let code = run_cli(
            fx.args(&["iptables-save", "-c", "-f", target_arg]),
            &fx.env(None),
            &mut diag,
        );
        assert_eq!(code, 0);

        let (_, direct, _) = fx.dump(&["iptables-save", "-c"], None);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), direct);
    }

    #[test]
    fn whole_family_dump_with_incompatible_table() {
        let fx = Fixture::new();
        let (code, out, _) = fx.dump(&["iptables-save", "-c"], None);

        assert_eq!(code, 0);
        assert_eq!(
            out,
            "# Generated by iptables-save v1.8.11 on Sat Oct 17 09:30:00 2026\n\
             *filter\n\
             :INPUT DROP [100:8000]\n\
             :OUTPUT ACCEPT [0:0]\n\
             -A INPUT -i lo -j ACCEPT -c 4 240\n\
             COMMIT\n\
             # Completed on Sat Oct 17 09:30:00 2026\n\
             # Table 'nat' is incompatible, use the native tool.\n"
        );
    }

    #[test]
    fn missing_table_exit_codes_per_family() {
        let fx = Fixture::new();

        let (code, out, err) = fx.dump(&["iptables-save", "-t", "broute"], None);
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(err, "Table 'broute' does not exist\n");

        // The bridge front end reports the miss inline and still succeeds.
        let (code, out, err) = fx.dump(&["ebtables-save", "-t", "nat"], None);
        assert_eq!(code, 0);
        assert_eq!(out, "Table 'nat' does not exist\n");
        assert!(err.is_empty());

        let (code, out, err) = fx.dump(&["iptables-save", "-t", "raw"], None);
        assert_eq!(code, 0);
        assert!(out.contains("*raw\nCOMMIT\n"));
        assert!(err.is_empty());

        let (code, out, err) = fx.dump(&["arptables-save"], None);
        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn bridge_legacy_counter_toggle() {
        let fx = Fixture::new();

        let (_, out, _) = fx.dump(&["ebtables-save"], Some("yes"));
        assert!(out.contains("-A FORWARD -i eth0 -j DROP , pcnt = 2 -- bcnt = 120\n"));

        let (_, out, _) = fx.dump(&["ebtables-save", "-c"], Some("yes"));
        assert!(out.contains("-A FORWARD -i eth0 -j DROP -c 2 120\n"));

        let (_, out, _) = fx.dump(&["ebtables-save"], Some("no"));
        assert!(out.contains("-A FORWARD -i eth0 -j DROP\n"));

        // Only the bridge front end looks at the toggle.
        let (_, out, _) = fx.dump(&["iptables-save"], Some("yes"));
        assert!(out.contains("-A INPUT -i lo -j ACCEPT\n"));
    }

    #[test]
    fn dump_flag_forces_success() {
        let fx = Fixture::new();
        let mut diag = Vec::new();
        let code = run_cli(
            fx.args(&["iptables-save", "-d", "-t", "bogus"]),
            &fx.env(None),
            &mut diag,
        );
        assert_eq!(code, 0);
    }

    #[test]
    fn init_failure_is_reported() {
        let fx = Fixture::new();
        let mut diag = Vec::new();
        let args = ["iptables-save", "--from", "/nonexistent/rules.yaml"]
            .iter()
            .map(OsString::from)
            .collect();
        let code = run_cli(args, &fx.env(None), &mut diag);

        assert_eq!(code, 1);
        let diag = String::from_utf8(diag).unwrap();
        assert!(diag.starts_with(&format!("iptables-save/{} Failed to initialize nft:", VERSION)));
    }

    #[test]
    fn unopenable_output_file() {
        let fx = Fixture::new();
        let target = fx.dir.path().join("missing-dir").join("out");
        let target_arg = target.to_str().unwrap();
        let mut diag = Vec::new();
        let code = run_cli(
            fx.args(&["iptables-save", "-f", target_arg]),
            &fx.env(None),
            &mut diag,
        );
        assert_eq!(code, 1);
        assert!(String::from_utf8(diag).unwrap().starts_with("Failed to open file, error:"));
    }

    #[test]
    fn malformed_arguments_point_to_manual() {
        let fx = Fixture::new();
        let mut diag = Vec::new();
        let code = run_cli(
            vec!["arptables-save".into(), "--table".into(), "filter".into()],
            &fx.env(None),
            &mut diag,
        );
        assert_eq!(code, 1);
        assert!(
            String::from_utf8(diag)
                .unwrap()
                .ends_with("Look at manual page `arptables-save.8' for more information.\n")
        );
    }
}
