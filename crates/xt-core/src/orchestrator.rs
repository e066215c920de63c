use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::emitter::{self, DumpOutcome, EmitContext};
use crate::error::{DumpError, DumpResult};
use crate::family::{Family, FamilyProfile, MissingTablePolicy};
use crate::format::DumpFormatFlags;
use crate::iterator::{self, TableSelection};
use crate::legacy;
use crate::request::DumpRequest;
use crate::store::RuleStore;

/// Per-table outcomes of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub family: Family,
    pub tables: Vec<(String, DumpOutcome)>,
    failed: bool,
}

impl RunReport {
    fn new(family: Family) -> Self {
        Self {
            family,
            tables: vec![],
            failed: false,
        }
    }

    pub fn count(&self, outcome: DumpOutcome) -> usize {
        self.tables.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn is_success(&self) -> bool {
        !self.failed
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed { 1 } else { 0 }
    }
}

/// Drives one dump run for a family front end.
pub struct Orchestrator<'a> {
    profile: FamilyProfile,
    ctx: EmitContext<'a>,
    proc_net: PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(profile: FamilyProfile, ctx: EmitContext<'a>) -> Self {
        Self {
            profile,
            ctx,
            proc_net: PathBuf::from(legacy::PROC_NET),
        }
    }

    /// Directory probed for legacy table lists.
    pub fn with_proc_net(mut self, path: impl AsRef<Path>) -> Self {
        self.proc_net = path.as_ref().to_path_buf();
        self
    }

    pub fn profile(&self) -> &FamilyProfile {
        &self.profile
    }

    /// Open the store, dump the selected tables and fold their outcomes.
    ///
    /// Table blocks go to `sink`. A fatal missing table is reported on
    /// `diag`, a soft one inline on `sink`.
    /// The store is dropped before returning on every path.
    pub fn run<S, E, F, W, D>(
        &self,
        request: &DumpRequest,
        flags: DumpFormatFlags,
        open: F,
        sink: &mut W,
        diag: &mut D,
    ) -> DumpResult<RunReport>
    where
        S: RuleStore,
        E: Display,
        F: FnOnce(Family) -> Result<S, E>,
        W: Write + ?Sized,
        D: Write + ?Sized,
    {
        let family = self.profile.family;
        let store = open(family).map_err(|e| DumpError::Init(e.to_string()))?;
        debug!(family = %family, "store opened");

        let mut report = RunReport::new(family);

        let tables = match iterator::enumerate(&self.profile, request, &store) {
            TableSelection::Tables(tables) => tables,
            TableSelection::NotFound(name) => {
                self.report_missing(&name, &mut report, sink, diag)?;
                return Ok(report);
            }
        };

        for table in &tables {
            let outcome = emitter::emit(&store, table, flags, &self.ctx, &mut *sink)?;
            report.tables.push((table.name.clone(), outcome));
        }
        drop(store);

        if self.profile.legacy_probe {
            legacy::check_legacy_tables(family, &self.proc_net, sink)?;
        }

        info!(
            family = %family,
            emitted = report.count(DumpOutcome::Emitted),
            incompatible = report.count(DumpOutcome::SkippedIncompatible),
            "dump finished"
        );
        Ok(report)
    }

    fn report_missing<W, D>(
        &self,
        name: &str,
        report: &mut RunReport,
        sink: &mut W,
        diag: &mut D,
    ) -> DumpResult<()>
    where
        W: Write + ?Sized,
        D: Write + ?Sized,
    {
        match self.profile.missing_table {
            MissingTablePolicy::Fatal => {
                writeln!(diag, "Table '{}' does not exist", name)?;
                report.tables.push((name.to_string(), DumpOutcome::NotFound));
                report.failed = true;
            }
            MissingTablePolicy::Soft => {
                writeln!(sink, "Table '{}' does not exist", name)?;
                report.tables.push((name.to_string(), DumpOutcome::NotFound));
            }
            MissingTablePolicy::NothingToDo => {
                debug!(table = name, "table not loaded, nothing to dump");
            }
        }
        Ok(())
    }
}
