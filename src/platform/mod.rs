//! The boundary the core consumes to reach the kernel. Implementations
//! are leaves: the interface is specified, they are not.

pub mod linux;

use crate::fields::FieldId;
use crate::process_table::ProcessTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterClass {
    LeftCpus,
    RightCpus,
    AllCpus,
    Memory,
    Swap,
    Tasks,
    LoadAverage,
    Uptime,
}

pub trait PlatformSource {
    fn cpu_count(&self) -> u32;
    fn max_pid(&self) -> u32;
    fn uptime_seconds(&self) -> Option<u64>;
    fn load_average(&self) -> (f64, f64, f64);
    fn has_swap(&self) -> bool;
    fn meter_types(&self) -> &'static [MeterClass];
    fn default_fields(&self) -> &'static [FieldId];
    fn signals(&self) -> &'static [(&'static str, i32)];

    /// Enumerates processes, filling every attribute except derived rates
    /// (which `SamplingEngine` computes from this-and-previous snapshots).
    /// `skip_processes` means only system-wide counters need a refresh.
    fn enumerate(&mut self, table: &mut ProcessTable, interval_s: f64, skip_processes: bool);

    fn read_argv(&self, pid: crate::process::Pid) -> Option<Vec<String>>;
    fn read_env(&self, pid: crate::process::Pid) -> Option<Vec<String>>;
    fn read_kernel_stack(&self, pid: crate::process::Pid) -> Option<Vec<String>>;
    fn set_affinity(&self, pid: crate::process::Pid, mask: &[bool]) -> bool;
    fn send_signal(&self, pid: crate::process::Pid, signal: i32) -> bool;
    fn set_priority(&self, pid: crate::process::Pid, priority: i64) -> bool;

    /// ZFS ARC size in KiB, if this platform has a kstat-equivalent.
    fn zfs_arc_size_kib(&self) -> Option<u64> {
        None
    }

    /// Memory page size in KiB, used to scale page-counted process
    /// fields (`MResident`/`MSize`). Platforms override this with the
    /// real `sysconf`-derived value; 4 is a conservative fallback.
    fn page_size_kib(&self) -> u64 {
        4
    }
}
