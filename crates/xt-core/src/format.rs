use std::ops::BitOr;

/// Environment toggle that selects the legacy counter syntax for bridge dumps.
pub const LEGACY_COUNTER_ENV: &str = "EBTABLES_SAVE_COUNTER";

/// Rendering flags for one run. Built once, then passed to every emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpFormatFlags(u8);

impl DumpFormatFlags {
    pub const INCLUDE_COUNTERS: DumpFormatFlags = DumpFormatFlags(0b01);
    pub const LEGACY_COUNTER_SYNTAX: DumpFormatFlags = DumpFormatFlags(0b10);

    pub const fn empty() -> Self {
        DumpFormatFlags(0)
    }

    pub const fn contains(&self, other: DumpFormatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn counters(&self) -> bool {
        self.contains(Self::INCLUDE_COUNTERS)
    }

    pub fn legacy_syntax(&self) -> bool {
        self.contains(Self::LEGACY_COUNTER_SYNTAX)
    }

    /// Derive flags from the counters option and the legacy toggle.
    ///
    /// An explicit counters request always wins and selects the modern
    /// syntax. The legacy toggle alone still includes counters, in the
    /// legacy syntax.
    pub fn resolve(counters_given: bool, legacy_env_set: bool) -> Self {
        if counters_given {
            Self::INCLUDE_COUNTERS
        } else if legacy_env_set {
            Self::INCLUDE_COUNTERS | Self::LEGACY_COUNTER_SYNTAX
        } else {
            Self::empty()
        }
    }
}

impl BitOr for DumpFormatFlags {
    type Output = DumpFormatFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        DumpFormatFlags(self.0 | rhs.0)
    }
}

/// Whether a value of the legacy counter variable turns the toggle on.
pub fn legacy_toggle_enabled(value: Option<&str>) -> bool {
    value == Some("yes")
}
