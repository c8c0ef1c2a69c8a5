//! Auxiliary one-column views: arguments, environment, open files,
//! syscall trace, kernel stack. All five share one template; they differ
//! only in how `refresh` produces lines.

use crate::platform::PlatformSource;
use crate::process::Pid;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Arg,
    Env,
    OpenFiles,
    Trace,
    KernelStack,
}

impl InfoKind {
    pub fn title(self, pid: Pid, comm: &str) -> String {
        match self {
            InfoKind::Arg => format!("Command line of process {pid} - {comm}"),
            InfoKind::Env => format!("Environment of process {pid} - {comm}"),
            InfoKind::OpenFiles => format!("Snapshot of files open in process {pid} - {comm}"),
            InfoKind::Trace => format!("Trace of process {pid} - {comm}"),
            InfoKind::KernelStack => format!("Kernel stack of process {pid} - {comm}"),
        }
    }
}

pub struct InfoScreen {
    pub kind: InfoKind,
    pub pid: Pid,
    pub title: String,
    pub lines: Vec<String>,
    pub selected: usize,
    /// Trace only: keep the selection pinned to the newest line.
    pub follow: bool,
    /// Trace only: whether new lines are currently being appended.
    pub tracing: bool,
    child: Option<TraceChild>,
}

struct TraceChild {
    process: Child,
    pipe: std::fs::File,
    cont_line: bool,
}

impl InfoScreen {
    pub fn new(kind: InfoKind, pid: Pid) -> Self {
        InfoScreen {
            kind,
            pid,
            title: String::new(),
            lines: Vec::new(),
            selected: 0,
            follow: false,
            tracing: true,
            child: None,
        }
    }

    /// One-shot scan for Arg/Env/KernelStack/OpenFiles; a no-op for
    /// Trace, which is driven by `poll_trace` instead.
    pub fn refresh(&mut self, comm: &str, source: &dyn PlatformSource) {
        self.title = self.kind.title(self.pid, comm);
        self.lines = match self.kind {
            InfoKind::Arg => source.read_argv(self.pid).unwrap_or_default(),
            InfoKind::Env => source.read_env(self.pid).unwrap_or_default(),
            InfoKind::KernelStack => source.read_kernel_stack(self.pid).unwrap_or_default(),
            InfoKind::OpenFiles => open_files_scan(self.pid),
            InfoKind::Trace => return,
        };
        if self.selected >= self.lines.len() {
            self.selected = self.lines.len().saturating_sub(1);
        }
    }

    /// Trace only: forks `strace`/`truss` attached to `self.pid`,
    /// dropping privileges in the child, and sets up a non-blocking read
    /// side. Matches the reference's truss-then-strace fallback.
    pub fn start_trace(&mut self) -> std::io::Result<()> {
        let mut last_err = None;
        for (cmd, args) in [
            ("truss", vec!["-s".to_owned(), "512".to_owned(), "-p".to_owned(), self.pid.to_string()]),
            ("strace", vec!["-s".to_owned(), "512".to_owned(), "-p".to_owned(), self.pid.to_string()]),
        ] {
            match Command::new(cmd).args(&args).stderr(Stdio::piped()).stdout(Stdio::null()).spawn() {
                Ok(mut child) => {
                    log::debug!("started {cmd} on pid {}", self.pid);
                    let stderr = child.stderr.take().expect("piped stderr");
                    set_nonblocking(&stderr);
                    self.child = Some(TraceChild {
                        process: child,
                        pipe: stderr,
                        cont_line: false,
                    });
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("could not spawn {cmd} for pid {}: {e}", self.pid);
                    last_err = Some(e);
                }
            }
        }
        log::warn!("no tracer available for pid {}", self.pid);
        Err(last_err.unwrap_or_else(|| std::io::Error::other("no tracer available")))
    }

    /// Drains whatever is currently available on the trace pipe into new
    /// lines, splitting at newlines the way the reference buffer scan
    /// does. Non-blocking: returns immediately if nothing is ready.
    pub fn poll_trace(&mut self) {
        let Some(child) = self.child.as_mut() else { return };
        if !self.tracing {
            return;
        }
        let mut buf = [0u8; 1024];
        let n = match child.pipe.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
            Err(_) => return,
        };
        if n == 0 {
            return;
        }
        let text = String::from_utf8_lossy(&buf[..n]);
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            let is_last_fragment = parts.peek().is_none();
            if is_last_fragment {
                if part.is_empty() {
                    continue;
                }
                if child.cont_line {
                    if let Some(last) = self.lines.last_mut() {
                        last.push_str(part);
                    } else {
                        self.lines.push(part.to_owned());
                    }
                } else {
                    self.lines.push(part.to_owned());
                }
                child.cont_line = true;
            } else if child.cont_line {
                if let Some(last) = self.lines.last_mut() {
                    last.push_str(part);
                }
                child.cont_line = false;
            } else {
                self.lines.push(part.to_owned());
            }
        }
        if self.follow {
            self.selected = self.lines.len().saturating_sub(1);
        }
    }

    /// Exit path for Trace: SIGTERM + reap, matching every InfoScreen
    /// teardown in the reference.
    pub fn stop_trace(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.process.kill() {
                log::debug!("failed to kill tracer for pid {}: {e}", self.pid);
            }
            match child.process.wait() {
                Ok(status) => log::debug!("tracer for pid {} reaped: {status}", self.pid),
                Err(e) => log::debug!("failed to reap tracer for pid {}: {e}", self.pid),
            }
        }
    }
}

fn set_nonblocking(file: &std::fs::File) {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

/// Forks `lsof -P -p <pid> -F`, parses its field-output format: a line
/// starting with 'f' opens a new file record, every other leading code
/// letter stores into that record's slot.
fn open_files_scan(pid: Pid) -> Vec<String> {
    let child = Command::new("lsof")
        .args(["-P", "-p", &pid.to_string(), "-F"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(c) => c,
        Err(e) => {
            log::warn!("failed to spawn lsof for pid {pid}: {e}");
            return vec!["Could not execute 'lsof'. Please make sure it is available in your $PATH.".to_owned()];
        }
    };
    let stdout = child.stdout.take().expect("piped stdout");
    let reader = BufReader::new(stdout);
    let mut records: Vec<HashMap<char, String>> = Vec::new();
    let mut current: Option<HashMap<char, String>> = None;

    for line in reader.lines().map_while(Result::ok) {
        if line.is_empty() {
            continue;
        }
        let code = line.chars().next().unwrap();
        let value = &line[code.len_utf8()..];
        if code == 'f' {
            if let Some(rec) = current.take() {
                records.push(rec);
            }
            current = Some(HashMap::new());
        }
        if let Some(rec) = current.as_mut() {
            rec.insert(code, value.to_owned());
        }
    }
    if let Some(rec) = current.take() {
        records.push(rec);
    }

    let status = child.wait();
    match status {
        Ok(s) if s.code() == Some(127) => {
            log::warn!("lsof not found on $PATH for pid {pid}");
            return vec!["Could not execute 'lsof'. Please make sure it is available in your $PATH.".to_owned()];
        }
        Ok(s) if !s.success() => {
            log::debug!("lsof exited with {s} for pid {pid}");
            return vec!["Failed listing open files.".to_owned()];
        }
        Err(e) => {
            log::debug!("failed to reap lsof for pid {pid}: {e}");
            return vec!["Failed listing open files.".to_owned()];
        }
        Ok(_) => {}
    }

    records
        .into_iter()
        .map(|rec| {
            format!(
                "{:>5.5} {:>7.7} {:>10.10} {:>10.10} {:>10.10} {}",
                rec.get(&'f').map(String::as_str).unwrap_or(""),
                rec.get(&'t').map(String::as_str).unwrap_or(""),
                rec.get(&'D').map(String::as_str).unwrap_or(""),
                rec.get(&'s').map(String::as_str).unwrap_or(""),
                rec.get(&'i').map(String::as_str).unwrap_or(""),
                rec.get(&'n').map(String::as_str).unwrap_or(""),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldId;
    use crate::platform::MeterClass;
    use crate::process_table::ProcessTable;

    struct StubSource;
    impl PlatformSource for StubSource {
        fn cpu_count(&self) -> u32 {
            1
        }
        fn max_pid(&self) -> u32 {
            1000
        }
        fn uptime_seconds(&self) -> Option<u64> {
            None
        }
        fn load_average(&self) -> (f64, f64, f64) {
            (0.0, 0.0, 0.0)
        }
        fn has_swap(&self) -> bool {
            false
        }
        fn meter_types(&self) -> &'static [MeterClass] {
            &[]
        }
        fn default_fields(&self) -> &'static [FieldId] {
            &[]
        }
        fn signals(&self) -> &'static [(&'static str, i32)] {
            &[]
        }
        fn enumerate(&mut self, _table: &mut ProcessTable, _interval_s: f64, _skip: bool) {}
        fn read_argv(&self, _pid: Pid) -> Option<Vec<String>> {
            Some(vec!["arg0".to_owned(), "arg1".to_owned()])
        }
        fn read_env(&self, _pid: Pid) -> Option<Vec<String>> {
            Some(vec!["PATH=/usr/bin".to_owned()])
        }
        fn read_kernel_stack(&self, _pid: Pid) -> Option<Vec<String>> {
            None
        }
        fn set_affinity(&self, _pid: Pid, _mask: &[bool]) -> bool {
            false
        }
        fn send_signal(&self, _pid: Pid, _signal: i32) -> bool {
            false
        }
        fn set_priority(&self, _pid: Pid, _priority: i64) -> bool {
            false
        }
    }

    #[test]
    fn arg_screen_pulls_lines_from_platform_source() {
        let mut screen = InfoScreen::new(InfoKind::Arg, 42);
        screen.refresh("bash", &StubSource);
        assert_eq!(screen.lines, vec!["arg0", "arg1"]);
        assert!(screen.title.contains("42"));
    }

    #[test]
    fn env_screen_pulls_lines_from_platform_source() {
        let mut screen = InfoScreen::new(InfoKind::Env, 7);
        screen.refresh("sshd", &StubSource);
        assert_eq!(screen.lines, vec!["PATH=/usr/bin"]);
    }

    #[test]
    fn title_mentions_kind_specific_wording() {
        assert!(InfoKind::Trace.title(1, "init").contains("Trace of process"));
        assert!(InfoKind::OpenFiles.title(1, "init").contains("Snapshot of files"));
    }
}
