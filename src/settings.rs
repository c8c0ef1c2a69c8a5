//! Process-wide configuration and htoprc persistence.

use crate::fields::FieldId;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterMode {
    Bar,
    Text,
    Graph,
    Led,
}

impl MeterMode {
    fn as_str(self) -> &'static str {
        match self {
            MeterMode::Bar => "bar",
            MeterMode::Text => "text",
            MeterMode::Graph => "graph",
            MeterMode::Led => "led",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "bar" => MeterMode::Bar,
            "text" => MeterMode::Text,
            "graph" => MeterMode::Graph,
            "led" => MeterMode::Led,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub fields: Vec<FieldId>,
    pub sort_key: FieldId,
    pub sort_direction: i32,
    pub tree_view: bool,
    pub hide_kernel_processes: bool,
    pub hide_thread_processes: bool,
    pub shadow_other_users: bool,
    pub show_thread_names: bool,
    pub show_program_path: bool,
    pub highlight_base_name: bool,
    pub highlight_megabytes: bool,
    pub highlight_threads: bool,
    pub highlight_kernel_processes: bool,
    pub header_margin: bool,
    pub detailed_cpu_time: bool,
    pub cpu_count_from_zero: bool,
    pub update_process_names: bool,
    pub vi_mode: bool,
    pub use_mouse: bool,
    pub account_guest_in_cpu_meter: bool,
    pub delay: u32,
    pub explicit_delay: bool,
    pub color_scheme: String,
    pub left_meters: Vec<String>,
    pub right_meters: Vec<String>,
    pub left_meter_modes: Vec<MeterMode>,
    pub right_meter_modes: Vec<MeterMode>,
    pub sort_strcmp: bool,
    /// Dirty bit: set on any mutation, cleared after a successful save.
    pub changed: bool,
    /// Column width for PID-family fields, derived once from the
    /// platform's `max_pid()` at startup rather than fixed. Not
    /// persisted in htoprc; recomputed every run.
    pub pid_width: usize,
    /// Memory page size in KiB, derived once from the platform source at
    /// startup. Not persisted in htoprc; the single source of truth for
    /// scaling page-counted fields (`MResident`/`MSize`).
    pub page_size_kib: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fields: crate::fields::DEFAULT_FIELDS.to_vec(),
            sort_key: FieldId::PercentCpu,
            sort_direction: -1,
            tree_view: false,
            hide_kernel_processes: false,
            hide_thread_processes: false,
            shadow_other_users: false,
            show_thread_names: false,
            show_program_path: true,
            highlight_base_name: false,
            highlight_megabytes: false,
            highlight_threads: false,
            highlight_kernel_processes: false,
            header_margin: true,
            detailed_cpu_time: false,
            cpu_count_from_zero: false,
            update_process_names: false,
            vi_mode: false,
            use_mouse: true,
            account_guest_in_cpu_meter: false,
            delay: 15,
            explicit_delay: false,
            color_scheme: "default".to_owned(),
            left_meters: vec!["LeftCPUs".to_owned(), "Memory".to_owned(), "Swap".to_owned()],
            right_meters: vec![
                "RightCPUs".to_owned(),
                "Tasks".to_owned(),
                "LoadAverage".to_owned(),
                "Uptime".to_owned(),
            ],
            left_meter_modes: vec![MeterMode::Bar, MeterMode::Bar, MeterMode::Bar],
            right_meter_modes: vec![
                MeterMode::Bar,
                MeterMode::Text,
                MeterMode::Text,
                MeterMode::Text,
            ],
            sort_strcmp: false,
            changed: false,
            pid_width: 6,
            page_size_kib: 4,
        }
    }
}

impl Settings {
    /// Derives `pid_width` from the platform's maximum pid, the way
    /// `Process_setupColumnWidths` sizes the PID-family columns once at
    /// startup instead of using a fixed width.
    pub fn set_pid_width_from_max_pid(&mut self, max_pid: u32) {
        let digits = max_pid.max(1).ilog10() as usize + 1;
        self.pid_width = digits.max(5).min(10);
    }

    /// Adopts the platform's real page size, replacing the 4KiB default
    /// used before the platform source is available.
    pub fn set_page_size_kib(&mut self, page_size_kib: u64) {
        self.page_size_kib = page_size_kib.max(1);
    }

    /// `$HTOPRC`, else `$HOME/.config/<name>/<name>rc`.
    pub fn rc_path(name: &str) -> PathBuf {
        if let Ok(p) = std::env::var("HTOPRC") {
            return PathBuf::from(p);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_owned());
        PathBuf::from(home)
            .join(".config")
            .join(name)
            .join(format!("{name}rc"))
    }

    pub fn legacy_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_owned());
        PathBuf::from(home).join(".htoprc")
    }

    /// Loads settings from `path`. A missing file is not an error; it
    /// yields defaults. Unparseable individual keys are ignored.
    pub fn load(path: &Path) -> Settings {
        let mut settings = Settings::default();
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to read settings file {}: {e}", path.display());
                }
                return settings;
            }
        };
        settings.apply_text(&text);
        settings.changed = false;
        settings
    }

    fn apply_text(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.apply_key(key.trim(), value.trim());
        }
    }

    fn apply_key(&mut self, key: &str, value: &str) {
        match key {
            "fields" => {
                let fields: Vec<FieldId> = value
                    .split_whitespace()
                    .filter_map(|s| s.parse::<u32>().ok())
                    .filter_map(FieldId::from_u32)
                    .collect();
                if !fields.is_empty() {
                    self.fields = fields;
                }
            }
            "sort_key" => {
                if let Ok(offset) = value.parse::<i64>() {
                    if let Some(f) = FieldId::from_legacy_offset(offset) {
                        self.sort_key = f;
                    }
                }
            }
            "sort_direction" => {
                if let Ok(d) = value.parse::<i32>() {
                    self.sort_direction = if d >= 0 { 1 } else { -1 };
                }
            }
            "tree_view" => self.tree_view = parse_bool(value),
            "hide_kernel_processes" => self.hide_kernel_processes = parse_bool(value),
            "hide_thread_processes" => self.hide_thread_processes = parse_bool(value),
            "shadow_other_users" => self.shadow_other_users = parse_bool(value),
            "show_thread_names" => self.show_thread_names = parse_bool(value),
            "show_program_path" => self.show_program_path = parse_bool(value),
            "highlight_base_name" => self.highlight_base_name = parse_bool(value),
            "highlight_megabytes" => self.highlight_megabytes = parse_bool(value),
            "highlight_threads" => self.highlight_threads = parse_bool(value),
            "highlight_kernel_processes" => self.highlight_kernel_processes = parse_bool(value),
            "header_margin" => self.header_margin = parse_bool(value),
            "detailed_cpu_time" => self.detailed_cpu_time = parse_bool(value),
            "cpu_count_from_zero" => self.cpu_count_from_zero = parse_bool(value),
            "update_process_names" => self.update_process_names = parse_bool(value),
            "vi_mode" => self.vi_mode = parse_bool(value),
            "use_mouse" => self.use_mouse = parse_bool(value),
            "account_guest_in_cpu_meter" => self.account_guest_in_cpu_meter = parse_bool(value),
            "delay" => {
                if let Ok(d) = value.parse::<u32>() {
                    self.delay = d.clamp(1, 100);
                }
            }
            "color_scheme" => self.color_scheme = value.to_owned(),
            "left_meters" => {
                self.left_meters = value.split_whitespace().map(str::to_owned).collect()
            }
            "right_meters" => {
                self.right_meters = value.split_whitespace().map(str::to_owned).collect()
            }
            "left_meter_modes" => {
                self.left_meter_modes = value
                    .split_whitespace()
                    .filter_map(MeterMode::parse)
                    .collect()
            }
            "right_meter_modes" => {
                self.right_meter_modes = value
                    .split_whitespace()
                    .filter_map(MeterMode::parse)
                    .collect()
            }
            _ => {}
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let fields = self
            .fields
            .iter()
            .map(|f| (*f as u32).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!("fields={fields}\n"));
        out.push_str(&format!("sort_key={}\n", self.sort_key.to_legacy_offset()));
        out.push_str(&format!("sort_direction={}\n", self.sort_direction));
        out.push_str(&format!("tree_view={}\n", bool_str(self.tree_view)));
        out.push_str(&format!(
            "hide_kernel_processes={}\n",
            bool_str(self.hide_kernel_processes)
        ));
        out.push_str(&format!(
            "hide_thread_processes={}\n",
            bool_str(self.hide_thread_processes)
        ));
        out.push_str(&format!(
            "shadow_other_users={}\n",
            bool_str(self.shadow_other_users)
        ));
        out.push_str(&format!(
            "show_thread_names={}\n",
            bool_str(self.show_thread_names)
        ));
        out.push_str(&format!(
            "show_program_path={}\n",
            bool_str(self.show_program_path)
        ));
        out.push_str(&format!(
            "highlight_base_name={}\n",
            bool_str(self.highlight_base_name)
        ));
        out.push_str(&format!(
            "highlight_megabytes={}\n",
            bool_str(self.highlight_megabytes)
        ));
        out.push_str(&format!(
            "highlight_threads={}\n",
            bool_str(self.highlight_threads)
        ));
        out.push_str(&format!(
            "highlight_kernel_processes={}\n",
            bool_str(self.highlight_kernel_processes)
        ));
        out.push_str(&format!("header_margin={}\n", bool_str(self.header_margin)));
        out.push_str(&format!(
            "detailed_cpu_time={}\n",
            bool_str(self.detailed_cpu_time)
        ));
        out.push_str(&format!(
            "cpu_count_from_zero={}\n",
            bool_str(self.cpu_count_from_zero)
        ));
        out.push_str(&format!(
            "update_process_names={}\n",
            bool_str(self.update_process_names)
        ));
        out.push_str(&format!("vi_mode={}\n", bool_str(self.vi_mode)));
        out.push_str(&format!("use_mouse={}\n", bool_str(self.use_mouse)));
        out.push_str(&format!(
            "account_guest_in_cpu_meter={}\n",
            bool_str(self.account_guest_in_cpu_meter)
        ));
        out.push_str(&format!("delay={}\n", self.delay));
        out.push_str(&format!("color_scheme={}\n", self.color_scheme));
        out.push_str(&format!("left_meters={}\n", self.left_meters.join(" ")));
        out.push_str(&format!("right_meters={}\n", self.right_meters.join(" ")));
        out.push_str(&format!(
            "left_meter_modes={}\n",
            self.left_meter_modes
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        out.push_str(&format!(
            "right_meter_modes={}\n",
            self.right_meter_modes
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        out
    }

    pub fn save(&mut self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).inspect_err(|e| {
                log::error!("failed to create settings directory {}: {e}", parent.display());
            })?;
        }
        fs::write(path, self.to_text()).inspect_err(|e| {
            log::error!("failed to write settings file {}: {e}", path.display());
        })?;
        self.changed = false;
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes")
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_recognized_fields() {
        let mut s = Settings::default();
        s.tree_view = true;
        s.sort_direction = 1;
        s.delay = 30;
        s.color_scheme = "midnight".to_owned();
        let text = s.to_text();

        let mut reloaded = Settings::default();
        reloaded.apply_text(&text);

        assert_eq!(reloaded.tree_view, s.tree_view);
        assert_eq!(reloaded.sort_direction, s.sort_direction);
        assert_eq!(reloaded.delay, s.delay);
        assert_eq!(reloaded.color_scheme, s.color_scheme);
        assert_eq!(reloaded.sort_key, s.sort_key);
    }

    #[test]
    fn legacy_sort_key_offset_is_plus_one() {
        let mut s = Settings::default();
        s.apply_key("sort_key", "46");
        assert_eq!(s.sort_key, FieldId::PercentCpu);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let s = Settings::load(Path::new("/nonexistent/path/for/rtop/test"));
        assert_eq!(s.sort_key, Settings::default().sort_key);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut s = Settings::default();
        s.apply_key("totally_unknown_key", "whatever");
        assert_eq!(s.sort_key, Settings::default().sort_key);
    }

    #[test]
    fn pid_width_grows_with_max_pid() {
        let mut s = Settings::default();
        s.set_pid_width_from_max_pid(99999);
        assert_eq!(s.pid_width, 5);
        s.set_pid_width_from_max_pid(4_194_304);
        assert_eq!(s.pid_width, 7);
    }

    #[test]
    fn page_size_kib_adopts_platform_value() {
        let mut s = Settings::default();
        assert_eq!(s.page_size_kib, 4);
        s.set_page_size_kib(16);
        assert_eq!(s.page_size_kib, 16);
    }
}
