//! Linux `/proc` backed `PlatformSource`. Grounded on
//! `LinuxProcessList.c`/`LinuxProcess.c`; not a full platform port (no
//! cgroup accounting, no OOM score, best-effort ionice) but a real,
//! readable implementation rather than a stub.

use super::{MeterClass, PlatformSource};
use crate::fields::FieldId;
use crate::process::{IoPriority, Pid};
use crate::process_table::ProcessTable;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const CLOCK_TICKS_PER_SEC: u64 = 100;

fn drop_privileges() -> Option<libc::uid_t> {
    // Swap effective uid to the real uid before touching a privileged
    // file; restored by `restore_privileges`. Best-effort: if the
    // process isn't setuid there is nothing to drop.
    let euid = unsafe { libc::geteuid() };
    let ruid = unsafe { libc::getuid() };
    if euid != ruid {
        unsafe { libc::seteuid(ruid) };
        Some(euid)
    } else {
        None
    }
}

fn restore_privileges(saved: Option<libc::uid_t>) {
    if let Some(euid) = saved {
        unsafe { libc::seteuid(euid) };
    }
}

pub struct LinuxPlatformSource {
    cpu_count: u32,
    max_pid: u32,
    page_size_kib: u64,
    prev_cpu_total: u64,
    prev_cpu_idle: u64,
    boot_time: i64,
}

impl LinuxPlatformSource {
    pub fn new() -> std::io::Result<Self> {
        let cpu_count = read_cpu_count().max(1);
        let max_pid = read_max_pid().unwrap_or(32768);
        let page_size_kib = (unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).max(4096) as u64 / 1024;
        let boot_time = read_boot_time().unwrap_or(0);
        Ok(LinuxPlatformSource {
            cpu_count,
            max_pid,
            page_size_kib: page_size_kib.max(1),
            prev_cpu_total: 0,
            prev_cpu_idle: 0,
            boot_time,
        })
    }

    fn now_monotonic() -> f64 {
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        t.as_secs_f64()
    }
}

fn read_cpu_count() -> u32 {
    let text = fs::read_to_string("/proc/stat").unwrap_or_default();
    text.lines()
        .filter(|l| l.starts_with("cpu") && l.as_bytes().get(3).is_some_and(u8::is_ascii_digit))
        .count() as u32
}

fn read_max_pid() -> Option<u32> {
    fs::read_to_string("/proc/sys/kernel/pid_max")
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn read_boot_time() -> Option<i64> {
    let text = fs::read_to_string("/proc/stat").ok()?;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("btime ") {
            return rest.trim().parse().ok();
        }
    }
    None
}

/// Parses `/proc/<pid>/stat`, handling a `comm` field that may itself
/// contain spaces or parentheses by scanning for the last `)`.
struct StatFields {
    comm: String,
    state: char,
    ppid: Pid,
    pgrp: Pid,
    session: Pid,
    tty_nr: u64,
    tpgid: Pid,
    minflt: u64,
    majflt: u64,
    utime: u64,
    stime: u64,
    priority: i64,
    nice: i64,
    num_threads: i64,
    starttime_ticks: u64,
    processor: i32,
}

fn parse_stat(text: &str) -> Option<StatFields> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    let comm = text[open + 1..close].to_owned();
    let rest = text[close + 1..].trim_start();
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // fields[0] is state (the 3rd stat field overall); offsets below are
    // relative to this slice, matching `man 5 proc`.
    let get = |i: usize| fields.get(i).copied();
    Some(StatFields {
        comm,
        state: get(0)?.chars().next().unwrap_or('?'),
        ppid: get(1)?.parse().ok()?,
        pgrp: get(2)?.parse().ok()?,
        session: get(3)?.parse().ok()?,
        tty_nr: get(4)?.parse().ok()?,
        tpgid: get(5)?.parse().ok()?,
        minflt: get(8)?.parse().ok()?,
        majflt: get(10)?.parse().ok()?,
        utime: get(12)?.parse().ok()?,
        stime: get(13)?.parse().ok()?,
        priority: get(16)?.parse().ok()?,
        nice: get(17)?.parse().ok()?,
        num_threads: get(18)?.parse().ok()?,
        starttime_ticks: get(20)?.parse().ok()?,
        processor: get(37).and_then(|s| s.parse().ok()).unwrap_or(-1),
    })
}

struct StatmFields {
    virt_pages: u64,
    resident_pages: u64,
    shared_pages: u64,
}

fn parse_statm(text: &str) -> Option<StatmFields> {
    let mut it = text.split_whitespace();
    Some(StatmFields {
        virt_pages: it.next()?.parse().ok()?,
        resident_pages: it.next()?.parse().ok()?,
        shared_pages: it.next()?.parse().ok()?,
    })
}

fn parse_status_uid_gid(text: &str) -> (Option<u32>, Option<u32>, Option<Pid>) {
    let mut ruid = None;
    let mut euid = None;
    let mut tgid = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            let mut it = rest.split_whitespace();
            ruid = it.next().and_then(|s| s.parse().ok());
            let _ = it.next();
            euid = it.next().and_then(|s| s.parse().ok()).or(ruid);
        } else if let Some(rest) = line.strip_prefix("Tgid:") {
            tgid = rest.trim().parse().ok();
        }
    }
    (ruid, euid, tgid)
}

#[derive(Default)]
struct IoFile {
    rchar: i64,
    wchar: i64,
    syscr: i64,
    syscw: i64,
    read_bytes: i64,
    write_bytes: i64,
    cancelled_write_bytes: i64,
}

fn parse_io(text: &str) -> IoFile {
    let mut io = IoFile {
        rchar: -1,
        wchar: -1,
        syscr: -1,
        syscw: -1,
        read_bytes: -1,
        write_bytes: -1,
        cancelled_write_bytes: -1,
    };
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value: i64 = value.trim().parse().unwrap_or(-1);
        match key {
            "rchar" => io.rchar = value,
            "wchar" => io.wchar = value,
            "syscr" => io.syscr = value,
            "syscw" => io.syscw = value,
            "read_bytes" => io.read_bytes = value,
            "write_bytes" => io.write_bytes = value,
            "cancelled_write_bytes" => io.cancelled_write_bytes = value,
            _ => {}
        }
    }
    io
}

fn read_cmdline(pid: Pid) -> (String, i32) {
    let path = format!("/proc/{pid}/cmdline");
    match fs::read(path) {
        Ok(bytes) => {
            let argv0_len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len()) as i32;
            let joined: Vec<String> = bytes
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect();
            (joined.join(" "), argv0_len)
        }
        Err(_) => (String::new(), -1),
    }
}

impl PlatformSource for LinuxPlatformSource {
    fn cpu_count(&self) -> u32 {
        self.cpu_count
    }

    fn max_pid(&self) -> u32 {
        self.max_pid
    }

    fn uptime_seconds(&self) -> Option<u64> {
        let text = fs::read_to_string("/proc/uptime").ok()?;
        let first = text.split_whitespace().next()?;
        first.parse::<f64>().ok().map(|v| v as u64)
    }

    fn load_average(&self) -> (f64, f64, f64) {
        let text = fs::read_to_string("/proc/loadavg").unwrap_or_default();
        let mut it = text.split_whitespace();
        let a = it.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let b = it.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let c = it.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        (a, b, c)
    }

    fn has_swap(&self) -> bool {
        let text = fs::read_to_string("/proc/meminfo").unwrap_or_default();
        text.lines()
            .find(|l| l.starts_with("SwapTotal:"))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
            .is_some_and(|v| v > 0)
    }

    fn meter_types(&self) -> &'static [MeterClass] {
        if self.cpu_count <= 1 {
            &[MeterClass::AllCpus, MeterClass::Memory, MeterClass::Swap]
        } else {
            &[
                MeterClass::LeftCpus,
                MeterClass::Memory,
                MeterClass::Swap,
                MeterClass::RightCpus,
                MeterClass::Tasks,
                MeterClass::LoadAverage,
                MeterClass::Uptime,
            ]
        }
    }

    fn default_fields(&self) -> &'static [FieldId] {
        crate::fields::DEFAULT_FIELDS
    }

    fn signals(&self) -> &'static [(&'static str, i32)] {
        &[
            ("SIGHUP", 1),
            ("SIGINT", 2),
            ("SIGQUIT", 3),
            ("SIGKILL", 9),
            ("SIGUSR1", 10),
            ("SIGUSR2", 12),
            ("SIGTERM", 15),
            ("SIGCONT", 18),
            ("SIGSTOP", 19),
        ]
    }

    fn enumerate(&mut self, table: &mut ProcessTable, interval_s: f64, skip_processes: bool) {
        self.refresh_aggregates(table);

        if skip_processes {
            return;
        }

        let now = Self::now_monotonic();
        let Ok(entries) = fs::read_dir("/proc") else {
            return;
        };
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<Pid>().ok())
            else {
                continue;
            };
            self.read_one(table, pid, now, interval_s);
        }
    }

    fn read_argv(&self, pid: Pid) -> Option<Vec<String>> {
        let saved = drop_privileges();
        let bytes = fs::read(format!("/proc/{pid}/cmdline")).ok();
        restore_privileges(saved);
        let bytes = bytes?;
        Some(
            bytes
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
        )
    }

    fn read_env(&self, pid: Pid) -> Option<Vec<String>> {
        let saved = drop_privileges();
        let bytes = fs::read(format!("/proc/{pid}/environ")).ok();
        restore_privileges(saved);
        let bytes = bytes?;
        Some(
            bytes
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
        )
    }

    fn read_kernel_stack(&self, pid: Pid) -> Option<Vec<String>> {
        let saved = drop_privileges();
        let text = fs::read_to_string(format!("/proc/{pid}/stack")).ok();
        restore_privileges(saved);
        text.map(|t| t.lines().map(str::to_owned).collect())
    }

    fn set_affinity(&self, pid: Pid, mask: &[bool]) -> bool {
        let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe { libc::CPU_ZERO(&mut set) };
        for (cpu, &enabled) in mask.iter().enumerate() {
            if enabled {
                unsafe { libc::CPU_SET(cpu, &mut set) };
            }
        }
        let ret = unsafe {
            libc::sched_setaffinity(pid, std::mem::size_of::<libc::cpu_set_t>(), &set)
        };
        ret == 0
    }

    fn send_signal(&self, pid: Pid, signal: i32) -> bool {
        let saved = drop_privileges();
        let ret = unsafe { libc::kill(pid, signal) };
        restore_privileges(saved);
        ret == 0
    }

    fn set_priority(&self, pid: Pid, priority: i64) -> bool {
        let saved = drop_privileges();
        let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as u32, priority as i32) };
        restore_privileges(saved);
        ret == 0
    }

    fn zfs_arc_size_kib(&self) -> Option<u64> {
        None
    }

    fn page_size_kib(&self) -> u64 {
        self.page_size_kib
    }
}

impl LinuxPlatformSource {
    fn read_one(&self, table: &mut ProcessTable, pid: Pid, now: f64, interval_s: f64) {
        let dir = format!("/proc/{pid}");
        if !Path::new(&dir).exists() {
            // Race with exit: the directory vanished between readdir and
            // now. Per spec, this is a per-process transient failure for
            // an *existing* record, which should be evicted; for a pid we
            // have never seen it is simply skipped.
            if table.get_by_pid(pid).is_some() {
                log::debug!("evicting pid {pid}: /proc/{pid} vanished before read");
                table.remove(pid);
            }
            return;
        }

        let stat_text = match fs::read_to_string(format!("{dir}/stat")) {
            Ok(t) => t,
            Err(e) => {
                if table.get_by_pid(pid).is_some() {
                    log::debug!("evicting pid {pid}: failed to read stat: {e}");
                    table.remove(pid);
                }
                return;
            }
        };
        let Some(stat) = parse_stat(&stat_text) else {
            return;
        };

        let statm = fs::read_to_string(format!("{dir}/statm"))
            .ok()
            .and_then(|t| parse_statm(&t));
        let status_text = fs::read_to_string(format!("{dir}/status")).unwrap_or_default();
        let (ruid, euid, tgid) = parse_status_uid_gid(&status_text);

        let saved = drop_privileges();
        let io_text = fs::read_to_string(format!("{dir}/io")).ok();
        restore_privileges(saved);

        let (cmdline, argv0_len) = read_cmdline(pid);

        let (record, existed) = table.get_or_create(pid, now);
        record.updated_this_scan = true;
        record.ppid = stat.ppid;
        record.pgrp = stat.pgrp;
        record.session = stat.session;
        record.tty_dev = stat.tty_nr;
        record.tpgid = stat.tpgid;
        record.tgid = tgid.unwrap_or(pid);
        record.ruid = ruid.unwrap_or(0);
        record.euid = euid.unwrap_or(record.ruid);
        record.state = stat.state;
        record.is_kernel = statm.as_ref().is_some_and(|s| s.virt_pages == 0);
        record.priority = stat.priority;
        record.nice = stat.nice;
        record.processor = stat.processor;
        record.nlwp = stat.num_threads;
        record.minflt = stat.minflt;
        record.majflt = stat.majflt;
        if let Some(s) = &statm {
            record.virt_pages = s.virt_pages;
            record.resident_pages = s.resident_pages;
        }
        record.name = stat.comm.clone();
        record.cmdline = if cmdline.is_empty() {
            format!("[{}]", stat.comm)
        } else {
            cmdline
        };
        record.argv0_len = argv0_len.max(-1);
        record.starttime_ctime = self.boot_time + (stat.starttime_ticks / CLOCK_TICKS_PER_SEC) as i64;

        let total_time = stat.utime + stat.stime;
        let elapsed = now - record.prev_sample_monotonic;
        if existed && elapsed > 0.0 && total_time >= record.prev_cpu_time_hundredths {
            let delta_ticks = (total_time - record.prev_cpu_time_hundredths) as f64;
            let delta_seconds = delta_ticks / CLOCK_TICKS_PER_SEC as f64;
            let percent = 100.0 * delta_seconds / elapsed;
            record.percent_cpu = percent.clamp(0.0, 100.0 * self.cpu_count as f64);
            if record.percent_cpu.is_nan() {
                record.percent_cpu = 0.0;
            }
        } else if !existed {
            record.percent_cpu = 0.0;
        }
        record.cpu_time_hundredths = total_time;

        if table.aggregates.total_mem_kib > 0 {
            let mem_kib = record.resident_pages * self.page_size_kib;
            record.percent_mem =
                (100.0 * mem_kib as f64 / table.aggregates.total_mem_kib as f64).clamp(0.0, 100.0);
        }

        if let Some(io_text) = io_text {
            let io = parse_io(&io_text);
            let prev = record.prev_io.take();
            record.io.rchar = io.rchar;
            record.io.wchar = io.wchar;
            record.io.syscr = io.syscr;
            record.io.syscw = io.syscw;
            record.io.read_bytes = io.read_bytes;
            record.io.write_bytes = io.write_bytes;
            record.io.cancelled_write_bytes = io.cancelled_write_bytes;
            if let Some((prev_io, prev_t)) = prev {
                let dt = now - prev_t;
                record.io.read_rate = rate_of(prev_io.read_bytes, io.read_bytes, dt);
                record.io.write_rate = rate_of(prev_io.write_bytes, io.write_bytes, dt);
                record.io.rchar_rate = rate_of(prev_io.rchar, io.rchar, dt);
                record.io.wchar_rate = rate_of(prev_io.wchar, io.wchar, dt);
            }
            record.prev_io = Some((
                crate::process::IoCounters {
                    read_bytes: io.read_bytes,
                    write_bytes: io.write_bytes,
                    rchar: io.rchar,
                    wchar: io.wchar,
                    syscr: io.syscr,
                    syscw: io.syscw,
                    cancelled_write_bytes: io.cancelled_write_bytes,
                    ..Default::default()
                },
                now,
            ));
        } else {
            record.io.read_rate = -1.0;
            record.io.write_rate = -1.0;
        }

        record.io_priority = read_io_priority(pid);

        record.prev_cpu_time_hundredths = total_time;
        record.prev_sample_monotonic = now;

        let _ = interval_s;
    }

    fn refresh_aggregates(&mut self, table: &mut ProcessTable) {
        let meminfo = fs::read_to_string("/proc/meminfo").unwrap_or_default();
        let get = |key: &str| -> u64 {
            meminfo
                .lines()
                .find(|l| l.starts_with(key))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };
        let total = get("MemTotal:");
        let free = get("MemFree:");
        let buffers = get("Buffers:");
        let cached = get("Cached:");
        let swap_total = get("SwapTotal:");
        let swap_free = get("SwapFree:");

        table.aggregates.total_mem_kib = total;
        table.aggregates.free_mem_kib = free;
        table.aggregates.buffers_mem_kib = buffers;
        table.aggregates.cached_mem_kib = cached;
        table.aggregates.used_mem_kib = total.saturating_sub(free + buffers + cached);
        table.aggregates.total_swap_kib = swap_total;
        table.aggregates.free_swap_kib = swap_free;
        table.aggregates.used_swap_kib = swap_total.saturating_sub(swap_free);
        table.aggregates.cpu_count = self.cpu_count;
        table.aggregates.zfs_arc_size_kib = self.zfs_arc_size_kib();

        let stat_text = fs::read_to_string("/proc/stat").unwrap_or_default();
        if let Some(cpu_line) = stat_text.lines().find(|l| l.starts_with("cpu ")) {
            let nums: Vec<u64> = cpu_line
                .split_whitespace()
                .skip(1)
                .filter_map(|s| s.parse().ok())
                .collect();
            if nums.len() >= 4 {
                let idle = nums[3] + *nums.get(4).unwrap_or(&0);
                let total: u64 = nums.iter().sum();
                self.prev_cpu_total = total;
                self.prev_cpu_idle = idle;
            }
        }

        table.aggregates.total_tasks = table.len() as u32;
    }
}

fn rate_of(prev: i64, cur: i64, dt: f64) -> f64 {
    if prev < 0 || cur < 0 || dt <= 0.0 || cur < prev {
        0.0
    } else {
        (cur - prev) as f64 / dt
    }
}

// ioprio_get(2) has no libc wrapper and no portable syscall-number
// constant; only wired up on the architectures rtop is actually built
// for in CI.
#[cfg(target_arch = "x86_64")]
const SYS_IOPRIO_GET: libc::c_long = 252;
#[cfg(target_arch = "aarch64")]
const SYS_IOPRIO_GET: libc::c_long = 30;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn read_io_priority(pid: Pid) -> IoPriority {
    const IOPRIO_WHO_PROCESS: libc::c_int = 1;
    let raw = unsafe { libc::syscall(SYS_IOPRIO_GET, IOPRIO_WHO_PROCESS, pid) };
    if raw < 0 {
        return IoPriority::None;
    }
    let class = (raw >> 13) & 0x7;
    let level = (raw & 0x1fff) as u8;
    match class {
        1 => IoPriority::RealTime(level),
        2 => IoPriority::BestEffort(level),
        3 => IoPriority::Idle,
        _ => IoPriority::None,
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn read_io_priority(_pid: Pid) -> IoPriority {
    IoPriority::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_handles_parens_and_spaces_in_comm() {
        let line = "123 (my (weird) proc) S 1 123 123 0 -1 4194560 100 0 0 0 5 2 0 0 20 0 1 0 1000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 3 0 0 0 0 0";
        let stat = parse_stat(line).expect("parses");
        assert_eq!(stat.comm, "my (weird) proc");
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.state, 'S');
    }

    #[test]
    fn parse_statm_reads_three_leading_fields() {
        let statm = parse_statm("1000 200 50 3 0 100 0").unwrap();
        assert_eq!(statm.virt_pages, 1000);
        assert_eq!(statm.resident_pages, 200);
        assert_eq!(statm.shared_pages, 50);
    }

    #[test]
    fn parse_io_reports_sentinel_on_missing_keys() {
        let io = parse_io("rchar: 10\nwchar: 20\n");
        assert_eq!(io.rchar, 10);
        assert_eq!(io.wchar, 20);
        assert_eq!(io.syscr, -1);
    }

    #[test]
    fn rate_of_clamps_negative_deltas_to_zero() {
        assert_eq!(rate_of(100, 50, 1.0), 0.0);
        assert_eq!(rate_of(100, 150, 2.0), 25.0);
        assert_eq!(rate_of(-1, 50, 1.0), 0.0);
    }
}
