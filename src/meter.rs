//! Header meter contract. Deliberately stops at the contract: the actual
//! bar/graph/LED rendering math is out of scope.

use crate::platform::MeterClass;
use crate::settings::MeterMode;

/// One value a meter displays, with the label the renderer should use
/// (e.g. "Mem" or a per-core index).
#[derive(Debug, Clone)]
pub struct MeterReading {
    pub label: String,
    pub value: f64,
    pub max: f64,
}

/// A single header slot: a class of data plus how to render it. The
/// actual drawing (bars/graphs/LEDs) belongs to `ui.rs`; this only says
/// what a meter of this class reports.
pub trait Meter {
    fn class(&self) -> MeterClass;
    fn mode(&self) -> MeterMode;
    fn readings(&self) -> Vec<MeterReading>;
    fn caption(&self) -> String;
}

pub struct MeterSet {
    pub left: Vec<Box<dyn Meter>>,
    pub right: Vec<Box<dyn Meter>>,
}

impl MeterSet {
    pub fn new() -> Self {
        MeterSet {
            left: Vec::new(),
            right: Vec::new(),
        }
    }
}

impl Default for MeterSet {
    fn default() -> Self {
        Self::new()
    }
}

/// A meter computed once per scan from a snapshot of values; the only
/// concrete `Meter` in the crate, since every meter is ultimately "a
/// label plus some readings taken right now".
pub struct SnapshotMeter {
    class: MeterClass,
    mode: MeterMode,
    caption: String,
    readings: Vec<MeterReading>,
}

impl SnapshotMeter {
    pub fn new(class: MeterClass, mode: MeterMode, caption: impl Into<String>, readings: Vec<MeterReading>) -> Self {
        SnapshotMeter {
            class,
            mode,
            caption: caption.into(),
            readings,
        }
    }
}

impl Meter for SnapshotMeter {
    fn class(&self) -> MeterClass {
        self.class
    }
    fn mode(&self) -> MeterMode {
        self.mode
    }
    fn readings(&self) -> Vec<MeterReading> {
        self.readings.clone()
    }
    fn caption(&self) -> String {
        self.caption.clone()
    }
}

/// Default header slot assignment: left column gets CPU, memory, swap;
/// right column gets the secondary CPU slot, tasks, load average,
/// uptime. A single-CPU machine collapses both CPU slots into one
/// `AllCpus` meter instead of a Left/Right split.
pub fn default_layout(cpu_count: u32) -> (Vec<MeterClass>, Vec<MeterClass>) {
    if cpu_count <= 1 {
        (
            vec![MeterClass::AllCpus, MeterClass::Memory, MeterClass::Swap],
            vec![MeterClass::Tasks, MeterClass::LoadAverage, MeterClass::Uptime],
        )
    } else {
        (
            vec![MeterClass::LeftCpus, MeterClass::Memory, MeterClass::Swap],
            vec![
                MeterClass::RightCpus,
                MeterClass::Tasks,
                MeterClass::LoadAverage,
                MeterClass::Uptime,
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMeter;
    impl Meter for FakeMeter {
        fn class(&self) -> MeterClass {
            MeterClass::Memory
        }
        fn mode(&self) -> MeterMode {
            MeterMode::Bar
        }
        fn readings(&self) -> Vec<MeterReading> {
            vec![MeterReading {
                label: "Mem".to_owned(),
                value: 512.0,
                max: 1024.0,
            }]
        }
        fn caption(&self) -> String {
            "Mem".to_owned()
        }
    }

    #[test]
    fn meter_set_holds_trait_objects_per_side() {
        let mut set = MeterSet::new();
        set.left.push(Box::new(FakeMeter));
        assert_eq!(set.left.len(), 1);
        assert_eq!(set.left[0].readings()[0].value, 512.0);
    }

    #[test]
    fn single_cpu_collapses_to_all_cpus_meter() {
        let (left, right) = default_layout(1);
        assert_eq!(left, vec![MeterClass::AllCpus, MeterClass::Memory, MeterClass::Swap]);
        assert_eq!(right, vec![MeterClass::Tasks, MeterClass::LoadAverage, MeterClass::Uptime]);
    }

    #[test]
    fn multi_cpu_splits_left_and_right() {
        let (left, right) = default_layout(8);
        assert!(left.contains(&MeterClass::LeftCpus));
        assert!(right.contains(&MeterClass::RightCpus));
        assert!(right.contains(&MeterClass::Tasks));
        assert!(right.contains(&MeterClass::LoadAverage));
        assert!(right.contains(&MeterClass::Uptime));
    }
}
