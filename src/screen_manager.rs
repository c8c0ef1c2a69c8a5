//! Sampling-clock scheduling and panel-layout/focus bookkeeping. Actual
//! terminal I/O (reading crossterm events, drawing via ratatui) lives in
//! `main.rs`/`ui.rs`; this module is the clock-and-focus model behind it,
//! kept free of any terminal dependency so it can be driven by tests.

use crate::settings::Settings;

/// Mouse click, already classified by the row/column it landed in.
/// Replaces the reference's negative-offset header-click sentinel with a
/// typed enum — equivalent information, no magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    HeaderClick(u16),
    BodyClick(u16),
    BarClick(u16),
}

/// Classifies a terminal mouse position given the panel's vertical
/// layout: row 0 is the header (if present), the last row is the
/// function bar, everything else is the body.
pub fn classify_mouse(row: u16, col: u16, has_header: bool, body_rows: u16) -> PanelEvent {
    let bar_row = (if has_header { 1 } else { 0 }) + body_rows;
    if row == bar_row {
        PanelEvent::BarClick(col)
    } else if has_header && row == 0 {
        PanelEvent::HeaderClick(col)
    } else {
        let body_row = row.saturating_sub(if has_header { 1 } else { 0 });
        PanelEvent::BodyClick(body_row)
    }
}

pub struct ScreenManager {
    old_time: f64,
    sort_timeout: i32,
    pub rescan: bool,
    pub redraw: bool,
    pub timed_out: bool,
    idle_countdown: Option<i32>,
}

impl ScreenManager {
    pub fn new() -> Self {
        ScreenManager {
            old_time: 0.0,
            sort_timeout: 0,
            rescan: false,
            redraw: true,
            timed_out: true,
            idle_countdown: None,
        }
    }

    /// Step 2a: `now` is monotonic seconds at 0.1s resolution.
    /// `timed_out` covers both "delay elapsed" and "clock jumped", the
    /// latter guarding against suspend/resume and NTP steps.
    pub fn check_recalculation(&mut self, now: f64, settings: &Settings) -> bool {
        let elapsed = now - self.old_time;
        self.timed_out = elapsed > settings.delay as f64 / 10.0 || elapsed < 0.0 || elapsed > 25.5;
        let should_scan = self.rescan || self.timed_out;
        if should_scan {
            self.old_time = now;
        }
        self.rescan = false;
        should_scan
    }

    /// Whether this recalculation should re-sort: tree view always
    /// resorts (tree structure can change independent of sort key), flat
    /// view only once the sort timeout has lapsed.
    pub fn should_resort(&mut self, tree_view: bool) -> bool {
        let due = self.sort_timeout <= 0 || tree_view;
        if due {
            self.sort_timeout = 1;
        }
        due
    }

    /// Step 2e: on an `ERR` (no input ready) tick. Once two consecutive
    /// timeouts land without `timed_out` (meaning the delay tick hasn't
    /// fired), a 100-tick idle countdown begins; reaching zero signals
    /// the background eviction pathway should run once more and exit.
    pub fn on_input_timeout(&mut self) -> bool {
        self.sort_timeout -= 1;
        if self.timed_out {
            self.idle_countdown = None;
            return false;
        }
        let countdown = self.idle_countdown.get_or_insert(100);
        *countdown -= 1;
        if *countdown <= 0 {
            self.idle_countdown = None;
            true
        } else {
            false
        }
    }

    pub fn request_rescan(&mut self) {
        self.rescan = true;
    }
}

impl Default for ScreenManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_recalculation_fires_after_delay_elapses() {
        let mut sm = ScreenManager::new();
        let mut settings = Settings::default();
        settings.delay = 15; // 1.5s
        assert!(sm.check_recalculation(0.0, &settings));
        assert!(!sm.check_recalculation(0.5, &settings));
        assert!(sm.check_recalculation(2.0, &settings));
    }

    #[test]
    fn backwards_clock_jump_forces_timeout() {
        let mut sm = ScreenManager::new();
        let settings = Settings::default();
        sm.check_recalculation(100.0, &settings);
        assert!(sm.check_recalculation(10.0, &settings));
    }

    #[test]
    fn idle_countdown_reaches_zero_after_100_quiet_timeouts() {
        let mut sm = ScreenManager::new();
        sm.timed_out = false;
        for _ in 0..99 {
            assert!(!sm.on_input_timeout());
        }
        assert!(sm.on_input_timeout());
    }

    #[test]
    fn timed_out_tick_resets_idle_countdown() {
        let mut sm = ScreenManager::new();
        sm.timed_out = false;
        sm.on_input_timeout();
        sm.on_input_timeout();
        sm.timed_out = true;
        assert!(!sm.on_input_timeout());
        sm.timed_out = false;
        for _ in 0..99 {
            assert!(!sm.on_input_timeout());
        }
        assert!(sm.on_input_timeout());
    }

    #[test]
    fn classify_mouse_maps_rows_to_zones() {
        assert_eq!(classify_mouse(0, 5, true, 20), PanelEvent::HeaderClick(5));
        assert_eq!(classify_mouse(21, 5, true, 20), PanelEvent::BarClick(5));
        assert_eq!(classify_mouse(3, 5, true, 20), PanelEvent::BodyClick(2));
    }
}
