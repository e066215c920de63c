pub mod emitter;
pub mod error;
pub mod family;
pub mod format;
pub mod iterator;
pub mod legacy;
pub mod orchestrator;
pub mod render;
pub mod request;
pub mod sink;
pub mod store;

#[cfg(test)]
mod testing;

pub use emitter::{DumpOutcome, EmitContext};
pub use error::{DumpError, DumpResult};
pub use family::{BuiltinTable, Family, FamilyProfile, MissingTablePolicy};
pub use format::DumpFormatFlags;
pub use orchestrator::{Orchestrator, RunReport};
pub use render::{Clock, SystemClock};
pub use request::DumpRequest;
pub use sink::OutputSink;
pub use store::{ChainRecord, Counters, RuleRecord, RuleStore, TableDescriptor};
