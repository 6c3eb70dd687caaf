//! Human-readable file sizes.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Render a byte count for display, base 1024 with two decimals ("1.50 MB").
///
/// Counts below 1 KB are shown as whole bytes.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}
