//! Human-readable byte quantities

use std::fmt;

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;

/// Byte quantity rendered with binary units and three decimals
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ByteSize(pub f64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b >= TB {
            write!(f, "{:.3}TB", b / TB)
        } else if b >= GB {
            write!(f, "{:.3}GB", b / GB)
        } else if b >= MB {
            write!(f, "{:.3}MB", b / MB)
        } else if b >= KB {
            write!(f, "{:.3}KB", b / KB)
        } else {
            write!(f, "{:.3}B", b)
        }
    }
}

/// Render an unsigned counter
#[must_use]
pub fn readable_unsigned(value: u64) -> String {
    ByteSize(value as f64).to_string()
}

/// Render a signed quantity, always carrying its sign
#[must_use]
pub fn readable_signed(value: i64) -> String {
    let magnitude = ByteSize(value.unsigned_abs() as f64);
    if value >= 0 {
        format!("+{magnitude}")
    } else {
        format!("-{magnitude}")
    }
}
