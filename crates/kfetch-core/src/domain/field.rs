//! Field values and their textual form
//!
//! Each info field renders independently to one line of text that is placed
//! to the right of an art row. Text is capped at [`FIELD_TEXT_MAX`] bytes.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::info::InfoFlag;

/// Longest text a single field may contribute, in bytes
pub const FIELD_TEXT_MAX: usize = 512;

/// Appended to any value cut short by a length cap
pub const TRUNCATION_MARK: &str = "...";

/// Shown in place of a value the facts provider failed to deliver
pub const UNKNOWN_VALUE: &str = "unknown";

/// A fetched info field, ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldValue {
    Release { release: String },
    CpuModel { model: String },
    NumCpus { online: u32, total: u32 },
    Mem { free_mb: u64, total_mb: u64 },
    NumProcs { count: u64 },
    Uptime { minutes: u64 },
    /// The provider failed; the flag is kept so the row stays in place
    Unavailable { flag: InfoFlag },
}

impl FieldValue {
    /// Which flag produced this value
    #[must_use]
    pub fn flag(&self) -> InfoFlag {
        match self {
            FieldValue::Release { .. } => InfoFlag::Release,
            FieldValue::CpuModel { .. } => InfoFlag::CpuModel,
            FieldValue::NumCpus { .. } => InfoFlag::NumCpus,
            FieldValue::Mem { .. } => InfoFlag::Mem,
            FieldValue::NumProcs { .. } => InfoFlag::NumProcs,
            FieldValue::Uptime { .. } => InfoFlag::Uptime,
            FieldValue::Unavailable { flag } => *flag,
        }
    }

    /// Rendered text, capped at [`FIELD_TEXT_MAX`] bytes
    #[must_use]
    pub fn text(&self) -> String {
        bounded(&self.to_string(), FIELD_TEXT_MAX).into_owned()
    }
}

fn label(flag: InfoFlag) -> &'static str {
    match flag {
        InfoFlag::Release => "Kernel",
        InfoFlag::CpuModel => "CPU",
        InfoFlag::NumCpus => "CPUs",
        InfoFlag::Mem => "Mem",
        InfoFlag::NumProcs => "Procs",
        InfoFlag::Uptime => "Uptime",
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\t", label(self.flag()))?;
        match self {
            FieldValue::Release { release } => f.write_str(release),
            FieldValue::CpuModel { model } => f.write_str(model),
            FieldValue::NumCpus { online, total } => write!(f, "{} / {}", online, total),
            FieldValue::Mem { free_mb, total_mb } => write!(f, "{} MB / {} MB", free_mb, total_mb),
            FieldValue::NumProcs { count } => write!(f, "{}", count),
            // Singular up to and including one minute.
            FieldValue::Uptime { minutes } if *minutes <= 1 => write!(f, "{} min", minutes),
            FieldValue::Uptime { minutes } => write!(f, "{} mins", minutes),
            FieldValue::Unavailable { .. } => f.write_str(UNKNOWN_VALUE),
        }
    }
}

/// Caps `text` at `max` bytes, marking the cut with [`TRUNCATION_MARK`].
///
/// The cut lands on a char boundary, so the result may be a few bytes
/// shorter than `max`.
pub fn bounded(text: &str, max: usize) -> Cow<'_, str> {
    if text.len() <= max {
        return Cow::Borrowed(text);
    }
    let mut cut = max.saturating_sub(TRUNCATION_MARK.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARK))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_text_forms() {
        let cases = [
            (
                FieldValue::Release {
                    release: "6.1.0-13-amd64".into(),
                },
                "Kernel:\t6.1.0-13-amd64",
            ),
            (
                FieldValue::CpuModel {
                    model: "AMD Ryzen 7 5800X".into(),
                },
                "CPU:\tAMD Ryzen 7 5800X",
            ),
            (FieldValue::NumCpus { online: 4, total: 8 }, "CPUs:\t4 / 8"),
            (
                FieldValue::Mem {
                    free_mb: 512,
                    total_mb: 2048,
                },
                "Mem:\t512 MB / 2048 MB",
            ),
            (FieldValue::NumProcs { count: 211 }, "Procs:\t211"),
            (
                FieldValue::Unavailable {
                    flag: InfoFlag::Mem,
                },
                "Mem:\tunknown",
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(value.text(), expected);
        }
    }

    #[test]
    fn test_uptime_pluralization_boundary() {
        assert_eq!(FieldValue::Uptime { minutes: 0 }.text(), "Uptime:\t0 min");
        assert_eq!(FieldValue::Uptime { minutes: 1 }.text(), "Uptime:\t1 min");
        assert_eq!(FieldValue::Uptime { minutes: 2 }.text(), "Uptime:\t2 mins");
        assert_eq!(
            FieldValue::Uptime { minutes: 1440 }.text(),
            "Uptime:\t1440 mins"
        );
    }

    #[test]
    fn test_long_value_is_truncated_with_mark() {
        let value = FieldValue::CpuModel {
            model: "x".repeat(4 * FIELD_TEXT_MAX),
        };
        let text = value.text();
        assert!(text.len() <= FIELD_TEXT_MAX);
        assert!(text.ends_with(TRUNCATION_MARK));
        assert!(text.starts_with("CPU:\txxx"));
    }

    #[test]
    fn test_bounded_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = bounded(&text, 8);
        assert!(cut.len() <= 8);
        assert!(cut.ends_with(TRUNCATION_MARK));
        assert_eq!(bounded("short", 8), "short");
    }

    #[test]
    fn test_value_reports_its_flag() {
        assert_eq!(FieldValue::NumProcs { count: 1 }.flag(), InfoFlag::NumProcs);
        assert_eq!(
            FieldValue::Unavailable {
                flag: InfoFlag::Uptime
            }
            .flag(),
            InfoFlag::Uptime
        );
    }
}
