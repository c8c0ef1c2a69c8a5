//! Drives a `PlatformSource`, computes deltas, marks stale records,
//! evicts the ones the last scan didn't see.

use crate::platform::PlatformSource;
use crate::process_table::ProcessTable;

pub struct SamplingEngine {
    pub table: ProcessTable,
}

impl SamplingEngine {
    pub fn new() -> Self {
        SamplingEngine {
            table: ProcessTable::new(),
        }
    }

    /// One scan: mark stale, reset aggregates, enumerate, sweep.
    ///
    /// `skip_processes` is set when a DiskTable scan already happened this
    /// tick and only system-wide counters need a refresh.
    pub fn scan(&mut self, source: &mut dyn PlatformSource, interval_s: f64, skip_processes: bool) {
        self.table.mark_all_stale();
        self.table.reset_aggregates();
        source.enumerate(&mut self.table, interval_s, skip_processes);
        if !skip_processes {
            self.table.sweep_stale();
        }
    }
}

impl Default for SamplingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldId;
    use crate::platform::MeterClass;
    use crate::process::Pid;

    /// A fake platform source with a fixed population, used to exercise
    /// `SamplingEngine` without touching the real filesystem.
    struct FakeSource {
        pids: Vec<Pid>,
    }

    impl PlatformSource for FakeSource {
        fn cpu_count(&self) -> u32 {
            4
        }
        fn max_pid(&self) -> u32 {
            32768
        }
        fn uptime_seconds(&self) -> Option<u64> {
            Some(100)
        }
        fn load_average(&self) -> (f64, f64, f64) {
            (0.1, 0.2, 0.3)
        }
        fn has_swap(&self) -> bool {
            false
        }
        fn meter_types(&self) -> &'static [MeterClass] {
            &[MeterClass::AllCpus, MeterClass::Memory]
        }
        fn default_fields(&self) -> &'static [FieldId] {
            crate::fields::DEFAULT_FIELDS
        }
        fn signals(&self) -> &'static [(&'static str, i32)] {
            &[("SIGTERM", 15)]
        }
        fn enumerate(&mut self, table: &mut ProcessTable, _interval_s: f64, skip_processes: bool) {
            if skip_processes {
                return;
            }
            for &pid in &self.pids {
                let (record, _existed) = table.get_or_create(pid, 0.0);
                record.updated_this_scan = true;
            }
        }
        fn read_argv(&self, _pid: Pid) -> Option<Vec<String>> {
            None
        }
        fn read_env(&self, _pid: Pid) -> Option<Vec<String>> {
            None
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
    fn scan_evicts_records_no_longer_enumerated() {
        let mut engine = SamplingEngine::new();
        let mut source = FakeSource { pids: vec![1, 2, 3] };
        engine.scan(&mut source, 1.0, false);
        assert_eq!(engine.table.len(), 3);

        source.pids = vec![1, 3];
        engine.scan(&mut source, 1.0, false);
        assert_eq!(engine.table.len(), 2);
        assert!(engine.table.get_by_pid(2).is_none());
    }

    #[test]
    fn skip_processes_leaves_table_untouched() {
        let mut engine = SamplingEngine::new();
        let mut source = FakeSource { pids: vec![1, 2] };
        engine.scan(&mut source, 1.0, false);
        engine.scan(&mut source, 1.0, true);
        assert_eq!(engine.table.len(), 2);
    }

    proptest::proptest! {
        #[test]
        fn index_stays_consistent_across_arbitrary_scans(
            scans in proptest::collection::vec(
                proptest::collection::hash_set(1i32..50, 0..20), 0..10
            )
        ) {
            let mut engine = SamplingEngine::new();
            for pids in scans {
                let mut source = FakeSource { pids: pids.into_iter().collect() };
                engine.scan(&mut source, 1.0, false);
                assert!(engine.table.index_consistent());
            }
        }
    }
}
