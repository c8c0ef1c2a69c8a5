//! Field identifiers for process table columns.
//!
//! Numeric values follow the platform-independent field enumeration so that
//! legacy `sort_key` offsets stored in htoprc (`stored + 1`) land on the
//! right field without a translation table.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FieldId {
    Pid = 1,
    Comm = 2,
    State = 3,
    Ppid = 4,
    Pgrp = 5,
    Session = 6,
    Tty = 7,
    Tpgid = 8,
    MinFlt = 10,
    MajFlt = 12,
    Priority = 18,
    Nice = 19,
    StartTime = 21,
    Processor = 38,
    MSize = 39,
    MResident = 40,
    MShare = 41,
    MTrs = 42,
    MDrs = 43,
    MLrs = 44,
    MDt = 45,
    EffectiveUid = 46,
    PercentCpu = 47,
    PercentMem = 48,
    EffectiveUser = 49,
    Time = 50,
    Nlwp = 51,
    Tgid = 52,
    RealUid = 53,
    RealUser = 54,
    IoPriority = 55,
    IoRate = 56,
    IoReadRate = 57,
    IoWriteRate = 58,
    Oom = 59,
    Cmdline = 99,
}

impl FieldId {
    pub fn from_u32(v: u32) -> Option<Self> {
        use FieldId::*;
        Some(match v {
            1 => Pid,
            2 => Comm,
            3 => State,
            4 => Ppid,
            5 => Pgrp,
            6 => Session,
            7 => Tty,
            8 => Tpgid,
            10 => MinFlt,
            12 => MajFlt,
            18 => Priority,
            19 => Nice,
            21 => StartTime,
            38 => Processor,
            39 => MSize,
            40 => MResident,
            41 => MShare,
            42 => MTrs,
            43 => MDrs,
            44 => MLrs,
            45 => MDt,
            46 => EffectiveUid,
            47 => PercentCpu,
            48 => PercentMem,
            49 => EffectiveUser,
            50 => Time,
            51 => Nlwp,
            52 => Tgid,
            53 => RealUid,
            54 => RealUser,
            55 => IoPriority,
            56 => IoRate,
            57 => IoReadRate,
            58 => IoWriteRate,
            59 => Oom,
            99 => Cmdline,
            _ => return None,
        })
    }

    /// Column header label, as printed in the panel header row.
    pub fn header_label(self) -> &'static str {
        use FieldId::*;
        match self {
            Pid => "PID",
            Comm => "Command",
            State => "S",
            Ppid => "PPID",
            Pgrp => "PGRP",
            Session => "SID",
            Tty => "TTY",
            Tpgid => "TPGID",
            MinFlt => "MINFLT",
            MajFlt => "MAJFLT",
            Priority => "PRI",
            Nice => "NI",
            StartTime => "START",
            Processor => "CPU",
            MSize => "VIRT",
            MResident => "RES",
            MShare => "SHR",
            MTrs => "CODE",
            MDrs => "DATA",
            MLrs => "LIB",
            MDt => "DIRTY",
            EffectiveUid => "UID",
            PercentCpu => "CPU%",
            PercentMem => "MEM%",
            EffectiveUser => "USER",
            Time => "TIME+",
            Nlwp => "NLWP",
            Tgid => "TGID",
            RealUid => "RUID",
            RealUser => "RUSER",
            IoPriority => "IO",
            IoRate => "IO_RATE",
            IoReadRate => "RD",
            IoWriteRate => "WR",
            Oom => "OOM",
            Cmdline => "Command",
        }
    }

    /// Legacy htoprc `sort_key` offset (stored value = field id - 1).
    pub fn from_legacy_offset(offset: i64) -> Option<Self> {
        Self::from_u32(u32::try_from(offset + 1).ok()?)
    }

    pub fn to_legacy_offset(self) -> u32 {
        self as u32 - 1
    }
}

/// Zero-terminated default field list, mirroring the platform's
/// `default_fields()` convention.
pub const DEFAULT_FIELDS: &[FieldId] = &[
    FieldId::Pid,
    FieldId::EffectiveUser,
    FieldId::Priority,
    FieldId::Nice,
    FieldId::MSize,
    FieldId::MResident,
    FieldId::MShare,
    FieldId::State,
    FieldId::PercentCpu,
    FieldId::PercentMem,
    FieldId::Time,
    FieldId::Comm,
];
