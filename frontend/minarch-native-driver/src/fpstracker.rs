//! FPS and CPU accounting for the debug HUD. Counters roll over once per
//! wall-clock second.

use minarch_common::timeutils;

#[derive(Debug, Clone, Default)]
pub struct FpsTracker {
    sec_start: u64,
    run_ticks: u32,
    present_ticks: u32,
    last_cpu_ticks: u64,
    /// Emulator frames per second over the last window.
    pub fps: f64,
    /// Emulator run calls per second (diverges from fps while fast
    /// forwarding drops presents).
    pub cps: f64,
    /// Process CPU usage percentage.
    pub cpu_percent: f64,
}

impl FpsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { sec_start: timeutils::current_time_millis(), ..Self::default() }
    }

    /// Count one emulator run call.
    pub fn record_run(&mut self) {
        self.run_ticks += 1;
        self.roll_over();
    }

    /// Count one presented frame.
    pub fn record_present(&mut self) {
        self.present_ticks += 1;
    }

    fn roll_over(&mut self) {
        let now = timeutils::current_time_millis();
        let elapsed = now - self.sec_start;
        if elapsed < 1000 {
            return;
        }

        let seconds = elapsed as f64 / 1000.0;
        self.fps = f64::from(self.present_ticks) / seconds;
        self.cps = f64::from(self.run_ticks) / seconds;

        let cpu_ticks = timeutils::process_cpu_ticks();
        if cpu_ticks > 0 && self.last_cpu_ticks > 0 {
            // Ticks are typically 100 per second, so the delta reads as %
            self.cpu_percent = (cpu_ticks - self.last_cpu_ticks) as f64 / seconds;
        }
        self.last_cpu_ticks = cpu_ticks;

        self.sec_start = now;
        self.run_ticks = 0;
        self.present_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_stay_zero_before_first_window() {
        let mut tracker = FpsTracker::new();
        tracker.record_present();
        tracker.record_run();
        assert_eq!(tracker.fps, 0.0);
        assert_eq!(tracker.cps, 0.0);
    }
}
