//! `ProcessRecord`: per-process data plus its one-line field formatter.

use crate::fields::FieldId;
use crate::rich_string::{ColorPair, RichString};
use crate::settings::Settings;
use crate::user_table::UserTable;

pub type Pid = i32;

/// IO priority: a scheduling class with an optional level, matching the
/// Linux ionice classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPriority {
    None,
    RealTime(u8),
    BestEffort(u8),
    Idle,
}

impl IoPriority {
    pub fn label(self) -> String {
        match self {
            IoPriority::None => "-".to_owned(),
            IoPriority::RealTime(level) => format!("R{level}"),
            IoPriority::BestEffort(level) => format!("B{level}"),
            IoPriority::Idle => "id".to_owned(),
        }
    }

    pub fn is_realtime(self) -> bool {
        matches!(self, IoPriority::RealTime(_))
    }
}

/// Sentinel for "no device" tty, matching the kernel's `NODEV`.
pub const NO_DEVICE: u64 = u64::MAX;

/// Sentinel for counters the platform could not read due to privilege.
pub const NO_PERM: i64 = -1;

#[derive(Debug, Clone)]
pub struct IoCounters {
    pub read_bytes: i64,
    pub write_bytes: i64,
    pub rchar: i64,
    pub wchar: i64,
    pub syscr: i64,
    pub syscw: i64,
    pub cancelled_write_bytes: i64,
    pub read_rate: f64,
    pub write_rate: f64,
    pub rchar_rate: f64,
    pub wchar_rate: f64,
}

impl Default for IoCounters {
    fn default() -> Self {
        IoCounters {
            read_bytes: NO_PERM,
            write_bytes: NO_PERM,
            rchar: NO_PERM,
            wchar: NO_PERM,
            syscr: NO_PERM,
            syscw: NO_PERM,
            cancelled_write_bytes: NO_PERM,
            read_rate: -1.0,
            write_rate: -1.0,
            rchar_rate: -1.0,
            wchar_rate: -1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    // identity
    pub pid: Pid,
    pub tgid: Pid,
    pub ppid: Pid,
    pub pgrp: Pid,
    pub session: Pid,
    pub tpgid: Pid,
    pub tty_dev: u64,
    pub ruid: u32,
    pub euid: u32,

    // classification
    pub state: char,
    pub is_kernel: bool,

    // scheduling
    pub priority: i64,
    pub nice: i64,
    pub io_priority: IoPriority,
    pub processor: i32,
    pub nlwp: i64,

    // resources
    pub virt_pages: u64,
    pub resident_pages: u64,
    pub percent_cpu: f64,
    pub percent_mem: f64,
    pub cpu_time_hundredths: u64,

    // lineage timing
    pub starttime_ctime: i64,

    // accounting
    pub minflt: u64,
    pub majflt: u64,
    pub io: IoCounters,

    // presentation
    pub name: String,
    pub cmdline: String,
    pub argv0_len: i32,

    // state flags
    pub tagged: bool,
    pub show_children: bool,
    pub visible: bool,
    pub indent_bitmask: i32,

    // scan bookkeeping
    pub created_this_scan: bool,
    pub updated_this_scan: bool,
    pub seen_in_tree_loop: bool,

    // internal: previous sample used for rate computation
    pub(crate) prev_cpu_time_hundredths: u64,
    pub(crate) prev_sample_monotonic: f64,
    pub(crate) prev_io: Option<(IoCounters, f64)>,
}

impl ProcessRecord {
    /// Creates a fresh record for `pid`, as seen for the first time this
    /// scan.
    pub fn new(pid: Pid, now: f64) -> Self {
        ProcessRecord {
            pid,
            tgid: pid,
            ppid: 0,
            pgrp: 0,
            session: 0,
            tpgid: 0,
            tty_dev: NO_DEVICE,
            ruid: 0,
            euid: 0,
            state: 'R',
            is_kernel: false,
            priority: 0,
            nice: 0,
            io_priority: IoPriority::None,
            processor: -1,
            nlwp: 1,
            virt_pages: 0,
            resident_pages: 0,
            percent_cpu: 0.0,
            percent_mem: 0.0,
            cpu_time_hundredths: 0,
            starttime_ctime: 0,
            minflt: 0,
            majflt: 0,
            io: IoCounters::default(),
            name: String::new(),
            cmdline: String::new(),
            argv0_len: -1,
            tagged: false,
            show_children: true,
            visible: true,
            indent_bitmask: 0,
            created_this_scan: true,
            updated_this_scan: false,
            seen_in_tree_loop: false,
            prev_cpu_time_hundredths: 0,
            prev_sample_monotonic: now,
            prev_io: None,
        }
    }

    /// Logical parent pid per the tgid/ppid convention: the main thread's
    /// parent is `ppid`; any other thread's parent is its own thread group.
    pub fn parent_pid(&self) -> Pid {
        if self.tgid == self.pid {
            self.ppid
        } else {
            self.tgid
        }
    }

    pub fn is_child_of(&self, pid: Pid) -> bool {
        self.tgid == pid || (self.tgid == self.pid && self.ppid == pid)
    }

    pub fn is_extra_thread(&self) -> bool {
        self.tgid != self.pid
    }

    /// htop's sort_state trick: 'I' (idle) sorts after everything else.
    fn sort_state(state: char) -> i32 {
        if state == 'I' {
            0x100
        } else {
            state as i32
        }
    }

    /// Comparator keyed by `settings.sort_key`/`settings.sort_direction`.
    /// Antisymmetric by construction: direction swaps which operand plays
    /// p1/p2 and the PID tie-break keeps it total.
    pub fn compare(a: &ProcessRecord, b: &ProcessRecord, settings: &Settings) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        let (p1, p2) = if settings.sort_direction == 1 {
            (a, b)
        } else {
            (b, a)
        };
        let ord = match settings.sort_key {
            FieldId::PercentCpu => p2
                .percent_cpu
                .partial_cmp(&p1.percent_cpu)
                .unwrap_or(Ordering::Equal),
            FieldId::PercentMem => p2.resident_pages.cmp(&p1.resident_pages),
            FieldId::Comm | FieldId::Cmdline => {
                if settings.sort_strcmp {
                    p1.name.cmp(&p2.name)
                } else {
                    p1.name.to_lowercase().cmp(&p2.name.to_lowercase())
                }
            }
            FieldId::MajFlt => p2.majflt.cmp(&p1.majflt),
            FieldId::MinFlt => p2.minflt.cmp(&p1.minflt),
            FieldId::MResident => p2.resident_pages.cmp(&p1.resident_pages),
            FieldId::MSize => p2.virt_pages.cmp(&p1.virt_pages),
            FieldId::Nice => p1.nice.cmp(&p2.nice),
            FieldId::Nlwp => p1.nlwp.cmp(&p2.nlwp),
            FieldId::Pgrp => p1.pgrp.cmp(&p2.pgrp),
            FieldId::Pid => p1.pid.cmp(&p2.pid),
            FieldId::Ppid => p1.ppid.cmp(&p2.ppid),
            FieldId::Priority => p1.priority.cmp(&p2.priority),
            FieldId::Processor => p1.processor.cmp(&p2.processor),
            FieldId::Session => p1.session.cmp(&p2.session),
            FieldId::StartTime => {
                if p1.starttime_ctime == p2.starttime_ctime {
                    p1.pid.cmp(&p2.pid)
                } else {
                    p1.starttime_ctime.cmp(&p2.starttime_ctime)
                }
            }
            FieldId::State => Self::sort_state(p1.state).cmp(&Self::sort_state(p2.state)),
            FieldId::RealUid => p1.ruid.cmp(&p2.ruid),
            FieldId::EffectiveUid => p1.euid.cmp(&p2.euid),
            FieldId::Time => p2.cpu_time_hundredths.cmp(&p1.cpu_time_hundredths),
            FieldId::Tgid => p1.tgid.cmp(&p2.tgid),
            FieldId::Tpgid => p1.tpgid.cmp(&p2.tpgid),
            _ => p1.pid.cmp(&p2.pid),
        };
        // Ties always break on PID, so equal-key records still order
        // deterministically (and antisymmetrically) across direction flips.
        ord.then_with(|| p1.pid.cmp(&p2.pid))
    }

    /// Appends a fixed-width colored rendering of `field` to `out`.
    pub fn write_field(
        &self,
        field: FieldId,
        settings: &Settings,
        users: &mut UserTable,
        out: &mut RichString,
    ) {
        match field {
            FieldId::PercentCpu => {
                let text = if self.percent_cpu > 999.9 {
                    format!("{:>4} ", self.percent_cpu as u32)
                } else if self.percent_cpu > 99.9 {
                    format!("{:>3}. ", self.percent_cpu as u32)
                } else {
                    format!("{:>4.1} ", self.percent_cpu)
                };
                out.append(ColorPair::Default, &text);
            }
            FieldId::PercentMem => {
                let text = if self.percent_mem > 99.9 {
                    "100. ".to_owned()
                } else {
                    format!("{:>4.1} ", self.percent_mem)
                };
                out.append(ColorPair::Default, &text);
            }
            FieldId::Comm | FieldId::Cmdline => self.write_command(settings, out),
            FieldId::MajFlt => color_number(out, self.majflt as i64, settings.highlight_megabytes),
            FieldId::MinFlt => color_number(out, self.minflt as i64, settings.highlight_megabytes),
            FieldId::MResident => human_number(
                out,
                self.resident_pages * settings.page_size_kib,
                settings.highlight_megabytes,
            ),
            FieldId::MSize => human_number(
                out,
                self.virt_pages * settings.page_size_kib,
                settings.highlight_megabytes,
            ),
            FieldId::Nice => {
                let color = if self.nice < 0 {
                    ColorPair::HighPriority
                } else if self.nice > 0 {
                    ColorPair::LowPriority
                } else {
                    ColorPair::Default
                };
                out.append(color, &format!("{:>3} ", self.nice));
            }
            FieldId::Nlwp => out.append(ColorPair::Default, &format!("{:>4} ", self.nlwp)),
            FieldId::Pgrp => out.append(ColorPair::Default, &format!("{:>1$} ", self.pgrp, settings.pid_width)),
            FieldId::Pid => out.append(ColorPair::Default, &format!("{:>1$} ", self.pid, settings.pid_width)),
            FieldId::Ppid => out.append(ColorPair::Default, &format!("{:>1$} ", self.ppid, settings.pid_width)),
            FieldId::Priority => {
                let text = if self.priority <= -100 {
                    " RT ".to_owned()
                } else {
                    format!("{:>3} ", self.priority)
                };
                out.append(ColorPair::Default, &text);
            }
            FieldId::Processor => {
                let text = if self.processor < 0 {
                    "  - ".to_owned()
                } else {
                    format!("{:>3} ", self.processor)
                };
                out.append(ColorPair::Default, &text);
            }
            FieldId::Session => out.append(ColorPair::Default, &format!("{:>1$} ", self.session, settings.pid_width)),
            FieldId::State => {
                let color = match self.state {
                    'R' | 'O' => ColorPair::Running,
                    'D' => ColorPair::DiskIoOrKernel,
                    'Z' => ColorPair::Zombie,
                    _ => ColorPair::Default,
                };
                out.append(color, &format!("{} ", self.state));
            }
            FieldId::RealUid => out.append(ColorPair::Default, &format!("{:>6} ", self.ruid)),
            FieldId::EffectiveUid => out.append(ColorPair::Default, &format!("{:>6} ", self.euid)),
            FieldId::Time => print_time(out, self.cpu_time_hundredths),
            FieldId::Tgid => out.append(ColorPair::Default, &format!("{:>1$} ", self.tgid, settings.pid_width)),
            FieldId::Tpgid => out.append(ColorPair::Default, &format!("{:>1$} ", self.tpgid, settings.pid_width)),
            FieldId::Tty => {
                if self.tty_dev == NO_DEVICE {
                    out.append(ColorPair::Shadow, "      ? ");
                } else {
                    let major = self.tty_dev >> 8;
                    let minor = self.tty_dev & 0xff;
                    out.append(ColorPair::Default, &format!("{major:>3}:{minor:<3} "));
                }
            }
            FieldId::RealUser => {
                let name = users.get_name(self.ruid).to_owned();
                out.append(ColorPair::Default, &format!("{name:<9} "));
            }
            FieldId::EffectiveUser => {
                let name = users.get_name(self.euid).to_owned();
                out.append(ColorPair::Default, &format!("{name:<9} "));
            }
            FieldId::IoPriority => {
                let color = if self.io_priority.is_realtime() {
                    ColorPair::HighPriority
                } else {
                    ColorPair::Default
                };
                out.append(color, &format!("{:>3} ", self.io_priority.label()));
            }
            FieldId::IoReadRate => output_rate(out, self.io.read_rate),
            FieldId::IoWriteRate => output_rate(out, self.io.write_rate),
            FieldId::IoRate => output_rate(out, self.io.read_rate.max(0.0) + self.io.write_rate.max(0.0)),
            _ => out.append(ColorPair::Default, "- "),
        }
    }

    /// Tree-mode ancestry prefix: continuation rails for each ancestor
    /// level still open, then this node's own connector and
    /// expand/collapse marker. Matches the COMM-field tree branch of
    /// `Process_writeField`; a no-op outside tree view or for roots
    /// (`indent_bitmask == 0`).
    fn write_tree_prefix(&self, settings: &Settings, out: &mut RichString) {
        if !settings.tree_view || self.indent_bitmask == 0 {
            return;
        }
        let last_item = self.indent_bitmask < 0;
        let indent = self.indent_bitmask.unsigned_abs();
        let max_indent = 32 - indent.leading_zeros();
        for level in 0..max_indent.saturating_sub(1) {
            if indent & (1 << level) != 0 {
                out.append(ColorPair::ProcessTree, "\u{2502}  ");
            } else {
                out.append(ColorPair::ProcessTree, "   ");
            }
        }
        let connector = if last_item {
            if settings.sort_direction == 1 { "\u{2514}" } else { "\u{250c}" }
        } else {
            "\u{251c}"
        };
        let marker = if self.show_children { "\u{2500}" } else { "+" };
        out.append(ColorPair::ProcessTree, &format!("{connector}{marker} "));
    }

    /// Command body with optional basename highlighting, matching
    /// `showProgramPath`/`highlightBaseName`.
    fn write_command(&self, settings: &Settings, out: &mut RichString) {
        self.write_tree_prefix(settings, out);
        let chars: Vec<char> = self.cmdline.chars().collect();
        let argv0_len = if self.argv0_len >= 0 {
            (self.argv0_len as usize).min(chars.len())
        } else {
            chars.len()
        };

        let mut start: i64 = out.len() as i64;
        let mut text = self.cmdline.clone();
        let mut finish: Option<i64> = None;

        if settings.highlight_base_name || !settings.show_program_path {
            let mut basename = 0usize;
            let mut colon_finish: Option<usize> = None;
            for (i, ch) in chars.iter().enumerate().take(argv0_len) {
                if *ch == '/' {
                    basename = i + 1;
                } else if *ch == ':' {
                    colon_finish = Some(i + 1);
                    break;
                }
            }
            let finish_rel = match colon_finish {
                Some(f) => f as i64,
                None => {
                    if settings.show_program_path {
                        start += basename as i64;
                    } else {
                        text = chars[basename..].iter().collect();
                    }
                    (argv0_len.saturating_sub(basename)) as i64
                }
            };
            finish = Some(finish_rel + start - 1);
        }

        out.append(ColorPair::Default, &text);
        if settings.highlight_base_name {
            if let Some(f) = finish {
                let start = start.max(0) as usize;
                let f = f.max(0) as usize;
                let f = f.min(out.len().saturating_sub(1));
                if start <= f {
                    out.set_attrn(ColorPair::BaseName, start, f);
                }
            }
        }
    }
}

/// Decimal-SI humanizer for page-scaled sizes (K/M/G), matching
/// `Process_humanNumber`.
fn human_number(out: &mut RichString, number_kib: u64, coloring: bool) {
    let large = if coloring {
        ColorPair::LargeNumber
    } else {
        ColorPair::Normal
    };
    let megabytes = if coloring {
        ColorPair::Megabytes
    } else {
        ColorPair::Normal
    };
    const ONE_K: u64 = 1000;
    const ONE_M: u64 = 1000 * ONE_K;
    const ONE_G_BINARY: u64 = 1024 * 1024;

    if number_kib >= 10 * ONE_M {
        if number_kib >= 100 * ONE_M {
            out.append(large, &format!("{:>4}G ", number_kib / ONE_G_BINARY));
        } else {
            out.append(
                large,
                &format!("{:>4.1}G ", number_kib as f64 / ONE_G_BINARY as f64),
            );
        }
    } else if number_kib >= 10_000 {
        out.append(megabytes, &format!("{:>4}M ", number_kib / 1024));
    } else if number_kib >= 1_000 {
        out.append(megabytes, &format!("{}", number_kib / 1000));
        out.append(ColorPair::Normal, &format!("{:03}K ", number_kib % 1000));
    } else {
        out.append(ColorPair::Normal, &format!("{number_kib:>4}K "));
    }
}

/// Fixed-width humanizer for raw counters (fault counts), matching
/// `Process_colorNumber`. Negative input renders "no perm".
fn color_number(out: &mut RichString, number: i64, coloring: bool) {
    let large = if coloring {
        ColorPair::LargeNumber
    } else {
        ColorPair::Normal
    };
    let megabytes = if coloring {
        ColorPair::Megabytes
    } else {
        ColorPair::Normal
    };
    if number < 0 {
        out.append(ColorPair::Shadow, "    no perm ");
        return;
    }
    let text = format!("{number:>11} ");
    // Match the original's three-color split of an 11-digit field.
    let chars: Vec<char> = text.chars().collect();
    let seg = |v: &[char]| v.iter().collect::<String>();
    out.append(large, &seg(&chars[0..2]));
    out.append(megabytes, &seg(&chars[2..5]));
    out.append(ColorPair::Normal, &seg(&chars[5..8]));
    out.append(ColorPair::Shadow, &seg(&chars[8..]));
}

/// TIME+ column: hours/minutes/seconds(.hundredths), matching
/// `Process_printTime`.
fn print_time(out: &mut RichString, total_hundredths: u64) {
    let total_seconds = total_hundredths / 100;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    let hundredths = total_hundredths - total_seconds * 100;
    if hours >= 100 {
        out.append(ColorPair::LargeNumber, &format!("{hours:>7}h "));
    } else if hours > 0 {
        out.append(ColorPair::LargeNumber, &format!("{hours:>2}h"));
        out.append(ColorPair::Default, &format!("{minutes:02}:{seconds:02} "));
    } else {
        out.append(
            ColorPair::Default,
            &format!("{minutes:>2}:{seconds:02}.{hundredths:02} "),
        );
    }
}

/// I/O rate humanizer (B/s, KiB/s, MiB/s, GiB/s), matching
/// `Process_outputRate`. Negative rate renders "no perm".
fn output_rate(out: &mut RichString, rate: f64) {
    const KIB: f64 = 1024.0;
    if rate < 0.0 {
        out.append(ColorPair::Shadow, "    no perm ");
    } else if rate < KIB {
        out.append(ColorPair::Normal, &format!("{rate:>8.2}B/s "));
    } else if rate < KIB * KIB {
        out.append(ColorPair::Normal, &format!("{:>6.1}KiB/s ", rate / KIB));
    } else if rate < KIB * KIB * KIB {
        out.append(ColorPair::Megabytes, &format!("{:>6.1}MiB/s ", rate / KIB / KIB));
    } else {
        out.append(
            ColorPair::LargeNumber,
            &format!("{:>6.1}GiB/s ", rate / KIB / KIB / KIB),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: Pid) -> ProcessRecord {
        ProcessRecord::new(pid, 0.0)
    }

    #[test]
    fn parent_pid_uses_tgid_ppid_convention() {
        let mut r = record(100);
        r.tgid = 100;
        r.ppid = 1;
        assert_eq!(r.parent_pid(), 1);

        let mut thread = record(101);
        thread.tgid = 100;
        thread.ppid = 1;
        assert_eq!(thread.parent_pid(), 100);
    }

    #[test]
    fn compare_is_antisymmetric() {
        let mut settings = Settings::default();
        settings.sort_key = FieldId::PercentCpu;
        settings.sort_direction = 1;

        let mut a = record(1);
        a.percent_cpu = 10.0;
        let mut b = record(2);
        b.percent_cpu = 20.0;

        let fwd = ProcessRecord::compare(&a, &b, &settings);
        let rev = ProcessRecord::compare(&b, &a, &settings);
        assert_eq!(fwd, rev.reverse());

        settings.sort_direction = -1;
        let fwd2 = ProcessRecord::compare(&a, &b, &settings);
        assert_eq!(fwd2, fwd.reverse());
    }

    #[test]
    fn percent_cpu_formatting_thresholds() {
        let settings = Settings::default();
        let mut users = UserTable::new();

        let mut r = record(1);
        r.percent_cpu = 1000.5;
        let mut out = RichString::new();
        r.write_field(FieldId::PercentCpu, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "1000 ");

        r.percent_cpu = 150.2;
        let mut out = RichString::new();
        r.write_field(FieldId::PercentCpu, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "150. ");

        r.percent_cpu = 12.34;
        let mut out = RichString::new();
        r.write_field(FieldId::PercentCpu, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "12.3 ");
    }

    #[test]
    fn percent_mem_caps_at_100() {
        let settings = Settings::default();
        let mut users = UserTable::new();
        let mut r = record(1);
        r.percent_mem = 99.95;
        let mut out = RichString::new();
        r.write_field(FieldId::PercentMem, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "100. ");
    }

    #[test]
    fn print_time_splits_hours_minutes_seconds() {
        let mut out = RichString::new();
        print_time(&mut out, 3661_00);
        assert_eq!(out.to_plain_string(), " 1h01:01 ");

        let mut out = RichString::new();
        print_time(&mut out, 61_37);
        assert_eq!(out.to_plain_string(), " 1:01.37 ");
    }

    #[test]
    fn io_rate_no_perm_sentinel() {
        let mut out = RichString::new();
        output_rate(&mut out, -1.0);
        assert_eq!(out.to_plain_string(), "    no perm ");
    }

    #[test]
    fn tree_prefix_absent_outside_tree_view_or_at_root() {
        let mut settings = Settings::default();
        let mut users = UserTable::new();
        let mut r = record(1);
        r.cmdline = "init".to_owned();
        r.indent_bitmask = -1;

        let mut out = RichString::new();
        r.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "init");

        settings.tree_view = true;
        r.indent_bitmask = 0;
        let mut out = RichString::new();
        r.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "init");
    }

    #[test]
    fn tree_prefix_draws_connector_and_rails() {
        let mut settings = Settings::default();
        settings.tree_view = true;
        settings.sort_direction = 1;
        let mut users = UserTable::new();

        let mut last_child = record(3);
        last_child.cmdline = "bash".to_owned();
        last_child.indent_bitmask = -1;
        let mut out = RichString::new();
        last_child.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "\u{2514}\u{2500} bash");

        settings.sort_direction = -1;
        let mut out = RichString::new();
        last_child.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "\u{250c}\u{2500} bash");

        let mut mid_sibling = record(4);
        mid_sibling.cmdline = "sleep".to_owned();
        mid_sibling.indent_bitmask = 1;
        let mut out = RichString::new();
        mid_sibling.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "\u{251c}\u{2500} sleep");

        let mut collapsed = record(5);
        collapsed.cmdline = "nested".to_owned();
        collapsed.indent_bitmask = -3;
        collapsed.show_children = false;
        let mut out = RichString::new();
        collapsed.write_field(FieldId::Comm, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "\u{2502}  \u{250c}+ nested");
    }

    #[test]
    fn m_resident_scales_by_settings_page_size() {
        let mut settings = Settings::default();
        settings.page_size_kib = 4;
        let mut users = UserTable::new();
        let mut r = record(1);
        r.resident_pages = 250;

        let mut out = RichString::new();
        r.write_field(FieldId::MResident, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "1000K ");

        settings.page_size_kib = 40;
        let mut out = RichString::new();
        r.write_field(FieldId::MResident, &settings, &mut users, &mut out);
        assert_eq!(out.to_plain_string(), "   9M ");
    }
}
