//! Top-level application state: owns every subsystem and exposes the
//! few entry points `main.rs`'s event loop needs (`tick`, `handle_key`).

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::actions::{self, Action, KeyKind, Reaction};
use crate::cli::StartupOptions;
use crate::disk_table::DiskTable;
use crate::error::{AppError, AppResult};
use crate::fields::FieldId;
use crate::function_bar::FunctionBar;
use crate::incremental_input::{IncKey, IncMode, IncOutcome, IncSet};
use crate::info_screen::{InfoKind, InfoScreen};
use crate::meter::{self, MeterReading, MeterSet, SnapshotMeter};
use crate::panel::{Panel, PanelKey};
use crate::platform::linux::LinuxPlatformSource;
use crate::platform::PlatformSource;
use crate::process::Pid;
use crate::sampling::SamplingEngine;
use crate::screen_manager::ScreenManager;
use crate::settings::{MeterMode, Settings};
use crate::sort_filter::{Filters, SortFilterPipeline};
use crate::user_table::UserTable;

pub const APP_NAME: &str = "rtop";

pub struct App {
    pub settings: Settings,
    pub users: UserTable,
    pub sampling: SamplingEngine,
    pub disks: DiskTable,
    pub source: Box<dyn PlatformSource>,
    pub meters: MeterSet,
    pub panel: Panel<Pid>,
    pub function_bar: FunctionBar,
    pub incset: IncSet,
    pub screen: ScreenManager,
    pub info_stack: Vec<InfoScreen>,
    pub user_filter: Option<u32>,
    pub pid_whitelist: Option<HashSet<Pid>>,
    pub running: bool,
    settings_path: PathBuf,
}

fn now_monotonic() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Loads settings, migrating `$HOME/.htoprc` on first run the way the
/// reference's `loadSettings` does: read once, write to the new path,
/// unlink the legacy file.
fn load_settings_with_migration() -> Settings {
    let rc_path = Settings::rc_path(APP_NAME);
    if rc_path.exists() {
        return Settings::load(&rc_path);
    }
    let legacy = Settings::legacy_path();
    if legacy.exists() {
        let mut settings = Settings::load(&legacy);
        if settings.save(&rc_path).is_ok() {
            let _ = std::fs::remove_file(&legacy);
        }
        return settings;
    }
    Settings::default()
}

impl App {
    pub fn new(opts: StartupOptions) -> AppResult<Self> {
        let source = LinuxPlatformSource::new().map_err(AppError::ProcfsUnavailable)?;
        let mut settings = load_settings_with_migration();

        if opts.no_color {
            settings.color_scheme = "monochrome".to_owned();
        }
        if let Some(delay) = opts.delay {
            settings.delay = delay;
            settings.explicit_delay = opts.explicit_delay;
        }
        if let Some(field) = opts.sort_key {
            settings.sort_key = field;
        }
        if opts.tree {
            settings.tree_view = true;
        }
        settings.set_pid_width_from_max_pid(source.max_pid());
        settings.set_page_size_kib(source.page_size_kib());

        let user_filter = opts.user.as_deref().and_then(|name| {
            let mut users = UserTable::new();
            users.find_uid_by_name(name)
        });
        let pid_whitelist = opts.pid_whitelist.map(|v| v.into_iter().collect());

        let mut app = App {
            settings,
            users: UserTable::new(),
            sampling: SamplingEngine::new(),
            disks: DiskTable::new(),
            source: Box::new(source),
            meters: MeterSet::new(),
            panel: Panel::new(),
            function_bar: FunctionBar::blank(),
            incset: IncSet::new(),
            screen: ScreenManager::new(),
            info_stack: Vec::new(),
            user_filter,
            pid_whitelist,
            running: true,
            settings_path: Settings::rc_path(APP_NAME),
        };
        app.function_bar = app.rebuild_function_bar();
        app.scan_and_recompute(true);
        Ok(app)
    }

    /// One pass of the sampling/sort/filter pipeline. `skip_processes`
    /// mirrors the `PlatformSource::enumerate` parameter of the same name.
    fn scan_and_recompute(&mut self, skip_processes_if_due: bool) {
        let resort = self.screen.should_resort(self.settings.tree_view);
        let skip = skip_processes_if_due && !resort && !self.screen.rescan;
        self.sampling.scan(self.source.as_mut(), self.settings.delay as f64 / 10.0, skip);
        self.recompute_panel();
        self.rebuild_meters();
    }

    fn recompute_panel(&mut self) {
        let filters = Filters {
            user_id: self.user_filter,
            inc_filter: if self.incset.filter().is_empty() {
                None
            } else {
                Some(self.incset.filter())
            },
            pid_whitelist: self.pid_whitelist.as_ref(),
        };
        let order = SortFilterPipeline::build(&mut self.sampling.table, &self.settings, &filters);
        self.panel.set_selected_len(order.len());
        self.panel.set_items(order);
        if let Some(following) = self.sampling.table.following {
            self.panel.follow(following, |&pid| pid);
        }
    }

    fn rebuild_meters(&mut self) {
        let (left_classes, right_classes) = meter::default_layout(self.source.cpu_count());
        let agg = self.sampling.table.aggregates;
        let load = self.source.load_average();
        let uptime = self.source.uptime_seconds();
        let cpu_count = agg.cpu_count.max(1) as f64;
        let busy_percent: f64 = self
            .sampling
            .table
            .iter()
            .map(|r| r.percent_cpu)
            .sum::<f64>()
            .clamp(0.0, cpu_count * 100.0);

        let build = |class: crate::platform::MeterClass| -> Box<dyn crate::meter::Meter> {
            use crate::platform::MeterClass::*;
            match class {
                LeftCpus | RightCpus | AllCpus => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Bar,
                    "CPU",
                    vec![MeterReading {
                        label: "CPU".to_owned(),
                        value: busy_percent,
                        max: cpu_count * 100.0,
                    }],
                )),
                Memory => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Bar,
                    "Mem",
                    vec![MeterReading {
                        label: "Mem".to_owned(),
                        value: agg.used_mem_kib as f64,
                        max: agg.total_mem_kib.max(1) as f64,
                    }],
                )),
                Swap => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Bar,
                    "Swp",
                    vec![MeterReading {
                        label: "Swp".to_owned(),
                        value: agg.used_swap_kib as f64,
                        max: agg.total_swap_kib.max(1) as f64,
                    }],
                )),
                Tasks => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Text,
                    "Tasks",
                    vec![MeterReading {
                        label: "Tasks".to_owned(),
                        value: agg.total_tasks as f64,
                        max: agg.total_tasks as f64,
                    }],
                )),
                LoadAverage => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Text,
                    "Load average",
                    vec![
                        MeterReading { label: "1m".to_owned(), value: load.0, max: f64::MAX },
                        MeterReading { label: "5m".to_owned(), value: load.1, max: f64::MAX },
                        MeterReading { label: "15m".to_owned(), value: load.2, max: f64::MAX },
                    ],
                )),
                Uptime => Box::new(SnapshotMeter::new(
                    class,
                    MeterMode::Text,
                    "Uptime",
                    vec![MeterReading {
                        label: "Uptime".to_owned(),
                        value: uptime.unwrap_or(0) as f64,
                        max: f64::MAX,
                    }],
                )),
            }
        };

        self.meters.left = left_classes.into_iter().map(build).collect();
        self.meters.right = right_classes.into_iter().map(build).collect();
    }

    fn rebuild_function_bar(&self) -> FunctionBar {
        FunctionBar::new(
            ["Help", "Setup", "Search", "Filter", "Tree", "SortBy", "Nice -", "Nice +", "Kill", "Quit"],
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        )
    }

    /// Called once per loop iteration; drives the scheduling clock and
    /// re-scans when due. Returns the reaction the last action produced
    /// so the caller knows whether a redraw is warranted.
    pub fn tick(&mut self) -> Reaction {
        let now = now_monotonic();
        if self.screen.check_recalculation(now, &self.settings) {
            self.scan_and_recompute(true);
            return Reaction::RECALCULATE;
        }
        if self.screen.on_input_timeout() {
            self.sampling.table.sweep_stale();
        }
        Reaction::OK
    }

    /// Dispatches one key event through the incremental-input editor
    /// first (if active), then the Panel's own navigation keys, then the
    /// action-binding table.
    pub fn handle_key(&mut self, key: KeyKind) -> Reaction {
        if self.incset.active().is_some() {
            return self.handle_incremental_key(key);
        }

        let Some(action) = actions::binding_for(key, self.settings.vi_mode) else {
            return Reaction::OK;
        };

        let reaction = match action {
            Action::IncSearch => {
                self.incset.activate(IncMode::Search);
                Reaction::REFRESH
            }
            Action::IncFilter => {
                self.incset.activate(IncMode::Filter);
                Reaction::REFRESH
            }
            Action::NextMatch | Action::PrevMatch => {
                let cursor = self.panel.selected_index();
                let labels: Vec<String> = self
                    .panel
                    .items()
                    .iter()
                    .map(|&pid| {
                        self.sampling
                            .table
                            .get_by_pid(pid)
                            .map(|r| r.cmdline.clone())
                            .unwrap_or_default()
                    })
                    .collect();
                let found = if action == Action::NextMatch {
                    self.incset.next(&labels, cursor, |s| s.as_str())
                } else {
                    self.incset.prev(&labels, cursor, |s| s.as_str())
                };
                if let Some(i) = found {
                    self.panel.set_selected(i);
                }
                Reaction::REFRESH
            }
            Action::OpenFilesScreen
            | Action::TraceScreen
            | Action::EnvScreen
            | Action::ArgScreen
            | Action::KernelStackScreen => {
                self.push_info_screen(action);
                Reaction::REFRESH | Reaction::REDRAW_BAR
            }
            Action::SignalPicker => {
                for pid in self.target_pids() {
                    self.source.send_signal(pid, 15);
                }
                Reaction::RECALCULATE
            }
            Action::RenicePlus | Action::ReniceMinus => {
                let delta = if action == Action::RenicePlus { -1 } else { 1 };
                for pid in self.target_pids() {
                    let Some(nice) = self.sampling.table.get_by_pid(pid).map(|r| r.nice) else {
                        continue;
                    };
                    let target = (nice + delta).clamp(-20, 19);
                    self.source.set_priority(pid, target);
                }
                Reaction::RECALCULATE
            }
            Action::AffinityPicker => {
                // No modal CPU picker exists in this crate (see
                // DESIGN.md); the key pins the target processes to CPU 0.
                let cpu_count = self.source.cpu_count().max(1) as usize;
                let mut mask = vec![false; cpu_count];
                mask[0] = true;
                for pid in self.target_pids() {
                    self.source.set_affinity(pid, &mask);
                }
                Reaction::REFRESH
            }
            Action::Quit => {
                self.running = false;
                Reaction::QUIT
            }
            _ => actions::apply(action, &mut self.settings, &mut self.sampling.table),
        };

        if reaction.contains(Reaction::RECALCULATE) {
            self.scan_and_recompute(false);
        }
        if reaction.contains(Reaction::SAVE_SETTINGS) {
            let _ = self.settings.save(&self.settings_path);
        }
        reaction
    }

    fn handle_incremental_key(&mut self, key: KeyKind) -> Reaction {
        let inc_key = match key {
            KeyKind::Char(c) => IncKey::Printable(c),
            KeyKind::Backspace | KeyKind::Ctrl('H') => IncKey::Backspace,
            KeyKind::Enter => IncKey::Enter,
            KeyKind::Esc => IncKey::Esc,
            _ => return Reaction::OK,
        };
        match self.incset.handle_key(inc_key) {
            IncOutcome::Confirmed | IncOutcome::Cancelled => {
                self.recompute_panel();
                Reaction::REFRESH
            }
            IncOutcome::Handled => {
                self.recompute_panel();
                Reaction::REFRESH
            }
            IncOutcome::Ignored => Reaction::OK,
        }
    }

    /// Processes to apply a renice/signal/affinity action to: every
    /// tagged process, or the followed/selected one if none are tagged.
    fn target_pids(&self) -> Vec<Pid> {
        let tagged = self.sampling.table.tagged_pids();
        if !tagged.is_empty() {
            return tagged;
        }
        self.panel.selected().copied().into_iter().collect()
    }

    fn push_info_screen(&mut self, action: Action) {
        let Some(&pid) = self.panel.selected() else { return };
        let kind = match action {
            Action::OpenFilesScreen => InfoKind::OpenFiles,
            Action::TraceScreen => InfoKind::Trace,
            Action::EnvScreen => InfoKind::Env,
            Action::ArgScreen => InfoKind::Arg,
            Action::KernelStackScreen => InfoKind::KernelStack,
            _ => return,
        };
        let comm = self
            .sampling
            .table
            .get_by_pid(pid)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        let mut screen = InfoScreen::new(kind, pid);
        if kind == InfoKind::Trace {
            let _ = screen.start_trace();
        } else {
            screen.refresh(&comm, self.source.as_ref());
        }
        self.info_stack.push(screen);
    }

    pub fn sort_field_label(&self) -> &'static str {
        self.settings.sort_key.header_label()
    }

    /// Navigation keys (arrows, paging, wheel) bypass the action table
    /// and go straight to the Panel; `main.rs` routes them here directly.
    pub fn handle_panel_key(&mut self, key: PanelKey, repeat: i32) -> Reaction {
        self.panel.on_key(key, repeat);
        if let Some(&pid) = self.panel.selected() {
            self.sampling.table.following = Some(pid);
        }
        Reaction::REFRESH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_used_by_rebuild_meters_matches_cpu_count() {
        // rebuild_meters itself requires a live /proc platform source, so
        // this only exercises the layout-selection helper it calls.
        let (left, _right) = meter::default_layout(1);
        assert_eq!(left[0], crate::platform::MeterClass::AllCpus);
    }

    #[test]
    fn sort_field_label_reflects_settings() {
        let settings = Settings::default();
        assert_eq!(settings.sort_key.header_label(), "CPU%");
    }
}
