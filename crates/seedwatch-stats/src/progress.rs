//! Progress rendering
//!
//! Turns a snapshot and its predecessor into a one-line report for logs and
//! notifications ([`describe`]) or into table cells for dashboards
//! ([`to_row`]).

use crate::bytes::{readable_signed, readable_unsigned};
use crate::delta::Delta;
use crate::ratio::RatioTargets;
use crate::snapshot::Snapshot;

/// Timestamp layout of dashboard rows
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Leading cell of a dashboard row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMarker {
    /// First sample of a tracker, absolute values only
    First,
    /// Buffer grew or held since the previous sample
    Gain,
    /// Buffer shrank since the previous sample
    Loss,
}

impl RowMarker {
    /// Cell text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "*",
            Self::Gain => "+",
            Self::Loss => "-",
        }
    }

    /// Parse a cell back into a marker
    #[must_use]
    pub fn from_cell(cell: &str) -> Option<Self> {
        match cell {
            "*" => Some(Self::First),
            "+" => Some(Self::Gain),
            "-" => Some(Self::Loss),
            _ => None,
        }
    }
}

/// One-line progress report
///
/// Without a previous sample only absolute values are shown; otherwise each
/// value is followed by its signed change.
#[must_use]
pub fn describe(current: &Snapshot, previous: Option<&Snapshot>, targets: &RatioTargets) -> String {
    let buffers = current.buffers(targets);
    let Some(previous) = previous else {
        return format!(
            "Buffer: {} | Ratio: {:.3} | Up: {} | Down: {} | Warning Buffer: {}",
            readable_signed(buffers.buffer),
            current.ratio,
            readable_unsigned(current.uploaded),
            readable_unsigned(current.downloaded),
            readable_signed(buffers.warning_buffer),
        );
    };

    let d = Delta::diff(current, previous, targets);
    format!(
        "Buffer: {} ({}) | Ratio: {:.3} ({:+.3}) | Up: {} ({}) | Down: {} ({}) | Warning Buffer: {} ({})",
        readable_signed(buffers.buffer),
        readable_signed(d.buffer),
        current.ratio,
        d.ratio,
        readable_unsigned(current.uploaded),
        readable_signed(d.uploaded),
        readable_unsigned(current.downloaded),
        readable_signed(d.downloaded),
        readable_signed(buffers.warning_buffer),
        readable_signed(d.warning_buffer),
    )
}

/// Dashboard cells: marker, time, up, down, buffer, warning buffer, ratio
#[must_use]
pub fn to_row(current: &Snapshot, previous: Option<&Snapshot>, targets: &RatioTargets) -> Vec<String> {
    let buffers = current.buffers(targets);
    let time = current.timestamp.format(ROW_TIMESTAMP_FORMAT).to_string();

    let Some(previous) = previous else {
        return vec![
            RowMarker::First.as_str().to_string(),
            time,
            readable_unsigned(current.uploaded),
            readable_unsigned(current.downloaded),
            readable_signed(buffers.buffer),
            readable_signed(buffers.warning_buffer),
            format!("{:.3}", current.ratio),
        ];
    };

    let d = Delta::diff(current, previous, targets);
    let marker = if d.buffer >= 0 {
        RowMarker::Gain
    } else {
        RowMarker::Loss
    };
    vec![
        marker.as_str().to_string(),
        time,
        format!("{} ({})", readable_unsigned(current.uploaded), readable_signed(d.uploaded)),
        format!("{} ({})", readable_unsigned(current.downloaded), readable_signed(d.downloaded)),
        format!("{} ({})", readable_signed(buffers.buffer), readable_signed(d.buffer)),
        format!("{} ({})", readable_signed(buffers.warning_buffer), readable_signed(d.warning_buffer)),
        format!("{:.3} ({:+.3})", current.ratio, d.ratio),
    ]
}
