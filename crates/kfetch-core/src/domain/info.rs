//! Info flags, masks and the field selector
//!
//! A mask is a set of [`InfoFlag`]s encoded as a signed 32-bit integer, the
//! same width a client writes to the channel. Only the low six bits have a
//! meaning; any other bit is carried along and never matched.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

// ============================================================================
// InfoFlag
// ============================================================================

/// One selectable info field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoFlag {
    /// Kernel release string
    Release,
    /// Online / present CPU counts
    NumCpus,
    /// CPU model name
    CpuModel,
    /// Free / total memory
    Mem,
    /// Minutes since boot
    Uptime,
    /// Number of processes
    NumProcs,
}

/// Fixed order in which set flags are rendered, one per art row.
///
/// This is deliberately not the bit order: a client that sets several flags
/// always gets them in this sequence.
pub const FIELD_PRIORITY: [InfoFlag; InfoFlag::COUNT] = [
    InfoFlag::Release,
    InfoFlag::CpuModel,
    InfoFlag::NumCpus,
    InfoFlag::Mem,
    InfoFlag::NumProcs,
    InfoFlag::Uptime,
];

impl InfoFlag {
    /// Number of known flags
    pub const COUNT: usize = 6;

    /// All flags in bit (declaration) order
    pub const ALL: [InfoFlag; InfoFlag::COUNT] = [
        InfoFlag::Release,
        InfoFlag::NumCpus,
        InfoFlag::CpuModel,
        InfoFlag::Mem,
        InfoFlag::Uptime,
        InfoFlag::NumProcs,
    ];

    /// Bit value of this flag inside a mask
    #[must_use]
    pub const fn bit(self) -> i32 {
        match self {
            InfoFlag::Release => 1 << 0,
            InfoFlag::NumCpus => 1 << 1,
            InfoFlag::CpuModel => 1 << 2,
            InfoFlag::Mem => 1 << 3,
            InfoFlag::Uptime => 1 << 4,
            InfoFlag::NumProcs => 1 << 5,
        }
    }

    /// Position of this flag in [`FIELD_PRIORITY`]
    #[must_use]
    pub const fn priority(self) -> usize {
        match self {
            InfoFlag::Release => 0,
            InfoFlag::CpuModel => 1,
            InfoFlag::NumCpus => 2,
            InfoFlag::Mem => 3,
            InfoFlag::NumProcs => 4,
            InfoFlag::Uptime => 5,
        }
    }

    /// Short lowercase name, as used in config and JSON output
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            InfoFlag::Release => "release",
            InfoFlag::NumCpus => "num_cpus",
            InfoFlag::CpuModel => "cpu_model",
            InfoFlag::Mem => "mem",
            InfoFlag::Uptime => "uptime",
            InfoFlag::NumProcs => "num_procs",
        }
    }
}

impl Display for InfoFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// InfoMask
// ============================================================================

/// Set of info flags, stored as the raw integer a client wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfoMask(i32);

impl InfoMask {
    /// No fields at all
    pub const EMPTY: InfoMask = InfoMask(0);

    /// Every known field
    pub const FULL: InfoMask = InfoMask((1 << InfoFlag::COUNT) - 1);

    /// Wraps a raw mask value without validation
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw integer value
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns true if `flag` is set
    #[must_use]
    pub const fn contains(self, flag: InfoFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Returns a copy with `flag` set
    #[must_use]
    pub const fn with(self, flag: InfoFlag) -> Self {
        Self(self.0 | flag.bit())
    }

    /// Returns true if no known flag is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::FULL.0 == 0
    }

    /// Bits set outside the six known flags
    #[must_use]
    pub const fn unknown_bits(self) -> i32 {
        self.0 & !Self::FULL.0
    }

    /// Number of known flags set
    #[must_use]
    pub const fn len(self) -> usize {
        (self.0 & Self::FULL.0).count_ones() as usize
    }

    /// Known flags present, in render priority order
    pub fn flags(self) -> impl Iterator<Item = InfoFlag> {
        FIELD_PRIORITY
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }

    /// Takes the next flag to render and clears it from this working copy.
    ///
    /// Flags are taken in [`FIELD_PRIORITY`] order. Returns `None` once no
    /// known bit is left; unknown bits are never returned and never cleared.
    pub fn select_and_consume(&mut self) -> Option<InfoFlag> {
        let flag = FIELD_PRIORITY
            .into_iter()
            .find(|flag| self.contains(*flag))?;
        self.0 &= !flag.bit();
        Some(flag)
    }
}

impl FromIterator<InfoFlag> for InfoMask {
    fn from_iter<I: IntoIterator<Item = InfoFlag>>(iter: I) -> Self {
        iter.into_iter().fold(InfoMask::EMPTY, InfoMask::with)
    }
}

impl From<InfoFlag> for InfoMask {
    fn from(flag: InfoFlag) -> Self {
        Self(flag.bit())
    }
}

impl Display for InfoMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
