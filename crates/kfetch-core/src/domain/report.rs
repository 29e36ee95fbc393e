//! Report layout and the bounded report buffer
//!
//! A report is a fixed seven-row ASCII-art picture with a hostname banner
//! above it and up to six info fields to the right of the lower rows:
//!
//! ```text
//!                     node1
//!         .-.         -----
//!        (.. |        Kernel:	6.1.0
//!        <>  |        CPU:	AMD Ryzen 7 5800X
//!       / --- \       CPUs:	8 / 8
//!      ( |   | |      Mem:	1024 MB / 15872 MB
//!    |\\_)___/\)/\    Procs:	301
//!   <__)------(__/    Uptime:	86 mins
//! ```
//!
//! The whole report, NUL terminator included, fits in [`REPORT_CAPACITY`]
//! bytes. Anything that would not fit is cut off and the report is flagged.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::errors::KfetchError;
use super::field::{bounded, TRUNCATION_MARK};
use super::info::InfoFlag;

/// Size of the buffer handed back to a reader, NUL terminator included
pub const REPORT_CAPACITY: usize = 1024;

/// Longest hostname shown in the banner, in bytes (HOST_NAME_MAX)
pub const HOSTNAME_MAX: usize = 64;

/// Width of every art column, in bytes
pub const ART_WIDTH: usize = 20;

/// Art row drawn next to the hostname underline
const ART_HEAD: &str = "        .-.         ";

/// Art rows that each carry at most one info field
const ART_ROWS: [&str; InfoFlag::COUNT] = [
    "       (.. |        ",
    "       <>  |        ",
    "      / --- \\       ",
    "     ( |   | |      ",
    "   |\\\\_)___/\\)/\\    ",
    "  <__)------(__/    ",
];

// ============================================================================
// ReportBuffer
// ============================================================================

/// Fixed-capacity text buffer that fails closed.
///
/// Appends past the capacity are cut at a char boundary and every later
/// append is dropped. One byte is always kept free for the NUL terminator.
#[derive(Debug)]
pub struct ReportBuffer {
    text: String,
    capacity: usize,
    truncated: bool,
}

impl ReportBuffer {
    /// Creates an empty buffer holding at most `capacity - 1` bytes of text
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    /// Bytes of text still available before the terminator slot
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(1).saturating_sub(self.text.len())
    }

    /// Appends `s`, or as much of it as fits
    pub fn push_str(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        let room = self.remaining();
        if s.len() <= room {
            self.text.push_str(s);
            return;
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
    }

    /// Appends `n` copies of `c`
    pub fn push_repeated(&mut self, c: char, n: usize) {
        let mut tmp = [0u8; 4];
        let s = c.encode_utf8(&mut tmp);
        for _ in 0..n {
            self.push_str(s);
        }
    }

    /// Empties the buffer so it can be rebuilt
    pub fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    /// Current text length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns true if some append did not fit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Freezes the buffer into a [`Report`]
    pub fn finish(self) -> Report {
        Report {
            text: self.text,
            truncated: self.truncated,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// One fully rendered snapshot, as produced by a single read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    text: String,
    truncated: bool,
}

impl Report {
    /// Lays out a report around `hostname`.
    ///
    /// `next_field` is called once per art row, top to bottom, and returns
    /// the text to place to the right of that row, if any.
    pub fn compose<F>(hostname: &str, mut next_field: F) -> Report
    where
        F: FnMut() -> Option<String>,
    {
        let hostname = bounded(hostname, HOSTNAME_MAX);
        let mut buf = ReportBuffer::with_capacity(REPORT_CAPACITY);

        buf.push_repeated(' ', ART_WIDTH);
        buf.push_str(&hostname);
        buf.push_str("\n");

        buf.push_str(ART_HEAD);
        buf.push_repeated('-', hostname.len());
        buf.push_str("\n");

        for row in ART_ROWS {
            buf.push_str(row);
            if let Some(text) = next_field() {
                buf.push_str(&text);
            }
            buf.push_str("\n");
        }

        buf.finish()
    }

    /// Report text without the NUL terminator
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true if the report was cut to fit the buffer
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes handed to a reader: the text plus one NUL byte
    pub fn wire_len(&self) -> usize {
        self.text.len() + 1
    }

    /// Text followed by the NUL terminator
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.wire_len());
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.push(0);
        bytes
    }

    /// Copies the NUL-terminated report into `dst`.
    ///
    /// Returns the number of bytes written. A destination too small for the
    /// whole report is a transfer fault; nothing is written in that case.
    pub fn copy_to(&self, dst: &mut [u8]) -> Result<usize, KfetchError> {
        let len = self.wire_len();
        if dst.len() < len {
            return Err(KfetchError::Fault(format!(
                "reader buffer holds {} bytes, report needs {}",
                dst.len(),
                len
            )));
        }
        dst[..self.text.len()].copy_from_slice(self.text.as_bytes());
        dst[len - 1] = 0;
        Ok(len)
    }

    /// Field text of each info row, `None` for rows left bare.
    ///
    /// Always yields one entry per art row, unless truncation removed rows.
    pub fn field_rows(&self) -> Vec<Option<&str>> {
        self.text
            .lines()
            .skip(2)
            .map(|line| {
                let field = line.get(ART_WIDTH..).unwrap_or("");
                (!field.is_empty()).then_some(field)
            })
            .collect()
    }

    /// Hostname as shown in the banner
    pub fn hostname(&self) -> &str {
        self.text
            .lines()
            .next()
            .and_then(|line| line.get(ART_WIDTH..))
            .unwrap_or("")
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        if self.truncated && !self.text.ends_with('\n') {
            writeln!(f, "{}", TRUNCATION_MARK)?;
        }
        Ok(())
    }
}
