//! T-time display formatting

use core::fmt::Write;

use heapless::String;

/// Capacity of a formatted T-time string
pub const T_STRING_LEN: usize = 16;

/// Render a T-time as `T-MM:SS` or `T+MM:SS`
///
/// The seconds field of a non-negative time counts the second in progress,
/// so the zero instant reads `T+00:01`. Consoles on the range rely on this
/// convention; keep it.
pub fn format_t_time(t_ms: i64) -> String<T_STRING_LEN> {
    let negative = t_ms < 0;
    let abs_ms = t_ms.unsigned_abs();

    let minutes = abs_ms / 60_000;
    let mut seconds = (abs_ms / 1_000) % 60;
    if !negative {
        seconds += 1;
    }

    let sign = if negative { '-' } else { '+' };
    let mut out = String::new();
    let _ = write!(out, "T{}{:02}:{:02}", sign, minutes, seconds);
    out
}
