//! Command-line surface, parsed with `clap`'s derive API.

use crate::fields::FieldId;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rtop", version, about = "Interactive process viewer")]
pub struct Cli {
    /// Disable color (monochrome scheme).
    #[arg(short = 'C', long = "no-color")]
    pub no_color: bool,

    /// Update interval in tenths of a second, clamped to [1, 100].
    #[arg(short = 'd', long = "delay")]
    pub delay: Option<u32>,

    /// Sort by COLUMN at startup; pass "help" to list columns.
    #[arg(short = 's', long = "sort-key")]
    pub sort_key: Option<String>,

    /// Start in tree view.
    #[arg(short = 't', long = "tree")]
    pub tree: bool,

    /// Show only processes owned by NAME.
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Show only the given comma-separated PIDs.
    #[arg(short = 'p', long = "pid", value_delimiter = ',')]
    pub pid: Option<Vec<i32>>,

    /// Treat -d's value as an explicit user override (persisted).
    #[arg(long = "explicit-delay")]
    pub explicit_delay: bool,
}

#[derive(Debug)]
pub enum CliError {
    /// Usage error: exit code -1, message to stderr.
    Usage(String),
    /// `-s help` was given: the column list to print, then exit 0.
    ListColumns,
}

/// Recognized `-s/--sort-key` spellings, matched case-insensitively
/// against each field's header label.
fn field_by_name(name: &str) -> Option<FieldId> {
    let lower = name.to_lowercase();
    [
        FieldId::Pid,
        FieldId::Comm,
        FieldId::State,
        FieldId::Ppid,
        FieldId::Pgrp,
        FieldId::Session,
        FieldId::Tty,
        FieldId::Tpgid,
        FieldId::MinFlt,
        FieldId::MajFlt,
        FieldId::Priority,
        FieldId::Nice,
        FieldId::StartTime,
        FieldId::Processor,
        FieldId::MSize,
        FieldId::MResident,
        FieldId::EffectiveUid,
        FieldId::PercentCpu,
        FieldId::PercentMem,
        FieldId::EffectiveUser,
        FieldId::Time,
        FieldId::Nlwp,
        FieldId::Tgid,
        FieldId::RealUid,
        FieldId::RealUser,
        FieldId::IoPriority,
        FieldId::IoRate,
        FieldId::IoReadRate,
        FieldId::IoWriteRate,
        FieldId::Cmdline,
    ]
    .into_iter()
    .find(|f| f.header_label().to_lowercase() == lower)
}

/// A parsed CLI request, distilled into the values `app.rs` needs to seed
/// `Settings` and the initial filter.
pub struct StartupOptions {
    pub no_color: bool,
    pub delay: Option<u32>,
    pub sort_key: Option<FieldId>,
    pub tree: bool,
    pub user: Option<String>,
    pub pid_whitelist: Option<Vec<i32>>,
    pub explicit_delay: bool,
}

pub fn resolve(cli: Cli) -> Result<StartupOptions, CliError> {
    let sort_key = match cli.sort_key.as_deref() {
        None => None,
        Some(s) if s.eq_ignore_ascii_case("help") => return Err(CliError::ListColumns),
        Some(s) => match field_by_name(s) {
            Some(f) => Some(f),
            None => return Err(CliError::Usage(format!("unknown sort column '{s}'"))),
        },
    };
    if let Some(d) = cli.delay {
        if d == 0 {
            return Err(CliError::Usage("delay must be at least 1 (0.1s)".to_owned()));
        }
    }
    Ok(StartupOptions {
        no_color: cli.no_color,
        delay: cli.delay.map(|d| d.clamp(1, 100)),
        sort_key,
        tree: cli.tree,
        user: cli.user,
        pid_whitelist: cli.pid,
        explicit_delay: cli.explicit_delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_resolves_case_insensitively() {
        let cli = Cli {
            no_color: false,
            delay: None,
            sort_key: Some("mem%".to_owned()),
            tree: false,
            user: None,
            pid: None,
            explicit_delay: false,
        };
        let opts = resolve(cli).unwrap();
        assert_eq!(opts.sort_key, Some(FieldId::PercentMem));
    }

    #[test]
    fn sort_key_help_requests_column_listing() {
        let cli = Cli {
            no_color: false,
            delay: None,
            sort_key: Some("help".to_owned()),
            tree: false,
            user: None,
            pid: None,
            explicit_delay: false,
        };
        assert!(matches!(resolve(cli), Err(CliError::ListColumns)));
    }

    #[test]
    fn unknown_sort_key_is_a_usage_error() {
        let cli = Cli {
            no_color: false,
            delay: None,
            sort_key: Some("bogus".to_owned()),
            tree: false,
            user: None,
            pid: None,
            explicit_delay: false,
        };
        assert!(matches!(resolve(cli), Err(CliError::Usage(_))));
    }

    #[test]
    fn delay_clamped_to_valid_range() {
        let cli = Cli {
            no_color: false,
            delay: Some(500),
            sort_key: None,
            tree: false,
            user: None,
            pid: None,
            explicit_delay: false,
        };
        let opts = resolve(cli).unwrap();
        assert_eq!(opts.delay, Some(100));
    }

    #[test]
    fn pid_list_splits_on_commas() {
        let cli = Cli {
            no_color: false,
            delay: None,
            sort_key: None,
            tree: false,
            user: None,
            pid: Some(vec![10, 20, 30]),
            explicit_delay: false,
        };
        let opts = resolve(cli).unwrap();
        assert_eq!(opts.pid_whitelist, Some(vec![10, 20, 30]));
    }
}
