//! Block-device subsystem, parallel to `ProcessTable` but keyed by device
//! name and without tree mode.

use std::collections::HashMap;

pub type DeviceName = String;

#[derive(Debug, Clone)]
pub struct DiskRecord {
    pub name: DeviceName,
    pub phys_path: Option<String>,
    pub devid: Option<String>,
    pub block_size: u32,
    pub queue_length: u64,

    pub read_ops: u64,
    pub write_ops: u64,
    pub read_blocks: u64,
    pub write_blocks: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,

    pub read_ops_rate: f64,
    pub write_ops_rate: f64,
    pub read_bytes_rate: f64,
    pub write_bytes_rate: f64,

    /// 10ms ticks the device spent servicing requests, total.
    pub oper_time_cs: u64,
    pub creation_time: i64,
    pub percent_busy: f64,

    pub(crate) updated_this_scan: bool,
    pub(crate) prev_sample: Option<(u64, u64, u64, u64, u64, f64)>,
}

impl DiskRecord {
    pub fn new(name: DeviceName, now: i64) -> Self {
        DiskRecord {
            name,
            phys_path: None,
            devid: None,
            block_size: 512,
            queue_length: 0,
            read_ops: 0,
            write_ops: 0,
            read_blocks: 0,
            write_blocks: 0,
            read_bytes: 0,
            write_bytes: 0,
            read_ops_rate: 0.0,
            write_ops_rate: 0.0,
            read_bytes_rate: 0.0,
            write_bytes_rate: 0.0,
            oper_time_cs: 0,
            creation_time: now,
            percent_busy: 0.0,
            updated_this_scan: false,
            prev_sample: None,
        }
    }

    /// Recomputes the four per-interval rates and `percent_busy` from the
    /// previous sample, clamping negative deltas (counter reset) to 0.
    pub fn update_rates(&mut self, interval_s: f64) {
        if interval_s <= 0.0 {
            return;
        }
        if let Some((pr_ops, pw_ops, pr_blk, pw_blk, p_oper_cs, _)) = self.prev_sample {
            self.read_ops_rate = rate_of(pr_ops, self.read_ops, interval_s);
            self.write_ops_rate = rate_of(pw_ops, self.write_ops, interval_s);
            self.read_bytes_rate = rate_of(pr_blk, self.read_blocks, interval_s) * self.block_size as f64;
            self.write_bytes_rate = rate_of(pw_blk, self.write_blocks, interval_s) * self.block_size as f64;
            let busy_delta = self.oper_time_cs.saturating_sub(p_oper_cs) as f64 / 100.0;
            self.percent_busy = (busy_delta / interval_s * 100.0).clamp(0.0, 100.0);
        }
        self.prev_sample = Some((
            self.read_ops,
            self.write_ops,
            self.read_blocks,
            self.write_blocks,
            self.oper_time_cs,
            self.percent_busy,
        ));
    }
}

fn rate_of(prev: u64, cur: u64, interval_s: f64) -> f64 {
    if cur < prev {
        return 0.0;
    }
    (cur - prev) as f64 / interval_s
}

#[derive(Debug, Default)]
pub struct DiskTable {
    records: Vec<DiskRecord>,
    index: HashMap<DeviceName, usize>,
}

impl DiskTable {
    pub fn new() -> Self {
        DiskTable::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiskRecord> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DiskRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn get_or_create(&mut self, name: &str, now: i64) -> &mut DiskRecord {
        if let Some(&i) = self.index.get(name) {
            return &mut self.records[i];
        }
        let i = self.records.len();
        self.index.insert(name.to_owned(), i);
        self.records.push(DiskRecord::new(name.to_owned(), now));
        &mut self.records[i]
    }

    pub fn mark_all_stale(&mut self) {
        for r in &mut self.records {
            r.updated_this_scan = false;
        }
    }

    pub fn sweep_stale(&mut self) {
        let stale: Vec<DeviceName> = self
            .records
            .iter()
            .filter(|r| !r.updated_this_scan)
            .map(|r| r.name.clone())
            .collect();
        for name in stale {
            if let Some(i) = self.index.remove(&name) {
                self.records.swap_remove(i);
                if i < self.records.len() {
                    let moved = self.records[i].name.clone();
                    self.index.insert(moved, i);
                }
            }
        }
    }

    /// Insertion-sorted snapshot of device names, ordered by descending
    /// `percent_busy` — the disk equivalent of the process table's
    /// non-tree sort. Disks have no tree mode.
    pub fn sorted_names(&self) -> Vec<DeviceName> {
        let mut names: Vec<DeviceName> = self.records.iter().map(|r| r.name.clone()).collect();
        names.sort_by(|a, b| {
            let ra = self.get(a).unwrap();
            let rb = self.get(b).unwrap();
            rb.percent_busy.partial_cmp(&ra.percent_busy).unwrap_or(std::cmp::Ordering::Equal)
        });
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_then_update_rates() {
        let mut t = DiskTable::new();
        {
            let d = t.get_or_create("sda", 0);
            d.read_ops = 100;
            d.updated_this_scan = true;
            d.update_rates(1.0);
        }
        {
            let d = t.get_or_create("sda", 0);
            d.read_ops = 150;
            d.update_rates(1.0);
        }
        assert_eq!(t.get("sda").unwrap().read_ops_rate, 50.0);
    }

    #[test]
    fn sweep_stale_evicts_unseen_devices() {
        let mut t = DiskTable::new();
        t.get_or_create("sda", 0).updated_this_scan = true;
        t.get_or_create("sdb", 0);
        t.sweep_stale();
        assert_eq!(t.len(), 1);
        assert!(t.get("sda").is_some());
        assert!(t.get("sdb").is_none());
    }

    #[test]
    fn counter_reset_clamps_rate_to_zero() {
        let mut t = DiskTable::new();
        {
            let d = t.get_or_create("sda", 0);
            d.read_ops = 1000;
            d.update_rates(1.0);
        }
        let d = t.get_or_create("sda", 0);
        d.read_ops = 10;
        d.update_rates(1.0);
        assert_eq!(d.read_ops_rate, 0.0);
    }
}
