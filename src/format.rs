//! The text payload handed to readers.
//!
//! Downstream consumers scan it with a fixed pattern, so the layout
//! `Temperature: <int>.<digit> C, Pressure: <int> hPa\n` must not change.

use core::fmt::{self, Write};

use heapless::String;

use crate::compensation::CompensatedReading;

/// Upper bound on the rendered payload, the longest possible one
/// (`Temperature: -214748364.8 C, Pressure: -21474836 hPa\n`) is 53 bytes.
pub const PAYLOAD_CAPACITY: usize = 64;

/// The canonical payload.
///
/// Negative temperatures keep their sign on the whole part and print the
/// tenths as a positive digit, -5 renders as `-0.5`.
impl fmt::Display for CompensatedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.temperature_decidegrees < 0 { "-" } else { "" };
        let magnitude = self.temperature_decidegrees.unsigned_abs();
        writeln!(
            f,
            "Temperature: {}{}.{} C, Pressure: {} hPa",
            sign,
            magnitude / 10,
            magnitude % 10,
            self.pressure_pascals / 100
        )
    }
}

/// Renders `reading` without allocating.
pub fn render(reading: &CompensatedReading) -> String<PAYLOAD_CAPACITY> {
    let mut payload = String::new();
    // Cannot fail, PAYLOAD_CAPACITY covers the full i32 range.
    let written = write!(payload, "{}", reading);
    debug_assert!(written.is_ok(), "payload exceeds {} bytes", PAYLOAD_CAPACITY);
    payload
}
