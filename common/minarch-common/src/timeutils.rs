//! Time helpers for frame pacing and the debug HUD.

use std::sync::OnceLock;
use std::time::Instant;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Monotonic microseconds since the first call in this process. Used by the
/// fast-forward governor, which works in integer microseconds.
#[must_use]
pub fn current_time_micros() -> u64 {
    epoch().elapsed().as_micros() as u64
}

/// Monotonic milliseconds since the first call in this process.
#[must_use]
pub fn current_time_millis() -> u64 {
    epoch().elapsed().as_millis() as u64
}

/// Read this process's cumulative CPU ticks (utime + stime) from
/// `/proc/self/stat`. Returns 0 when the file is unavailable or malformed,
/// which disables the CPU-usage line of the HUD.
#[must_use]
pub fn process_cpu_ticks() -> u64 {
    let Ok(stat) = std::fs::read_to_string("/proc/self/stat") else {
        return 0;
    };

    parse_cpu_ticks(&stat).unwrap_or_else(|| {
        log::debug!("Unable to parse /proc/self/stat contents");
        0
    })
}

fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    // The comm field (2nd) may contain spaces; fields are counted from the
    // closing paren. utime and stime are fields 14 and 15 overall.
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let mut fields = after_comm.split_ascii_whitespace();
    let utime: u64 = fields.nth(11)?.parse().ok()?;
    let stime: u64 = fields.next()?.parse().ok()?;
    Some(utime + stime)
}
