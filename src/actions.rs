//! Key bindings: a key code maps to an `Action`, applying it against the
//! running state returns a `Reaction` bitmask the main loop interprets.

use crate::fields::FieldId;
use crate::process_table::ProcessTable;
use crate::settings::Settings;

/// Bitmask a handler returns to tell the main loop what changed.
/// Bit-combined with `|`; `RECALCULATE` implies `REFRESH`,
/// `UPDATE_PANELHDR` implies `REFRESH`, matching the reference's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction(u32);

impl Reaction {
    pub const OK: Reaction = Reaction(0);
    pub const REFRESH: Reaction = Reaction(1 << 0);
    pub const RECALCULATE: Reaction = Reaction(Reaction::REFRESH.0 | (1 << 1));
    pub const SAVE_SETTINGS: Reaction = Reaction(1 << 2);
    pub const KEEP_FOLLOWING: Reaction = Reaction(1 << 3);
    pub const QUIT: Reaction = Reaction(1 << 4);
    pub const REDRAW_BAR: Reaction = Reaction(1 << 5);
    pub const UPDATE_PANELHDR: Reaction = Reaction(Reaction::REFRESH.0 | (1 << 6));

    pub fn contains(self, other: Reaction) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Reaction {
    type Output = Reaction;
    fn bitor(self, rhs: Reaction) -> Reaction {
        Reaction(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Reaction {
    fn bitor_assign(&mut self, rhs: Reaction) {
        self.0 |= rhs.0;
    }
}

/// Terminal-agnostic key shape; `app.rs` maps crossterm `KeyEvent`s into
/// this before consulting the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Char(char),
    Function(u8),
    Ctrl(char),
    Esc,
    Space,
    Backspace,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SortByMem,
    SortByCpu,
    SortByTime,
    ToggleTreeView,
    ToggleHideThreads,
    ToggleHideKernel,
    IncSearch,
    IncFilter,
    NextMatch,
    PrevMatch,
    RenicePlus,
    ReniceMinus,
    InvertSort,
    ExpandCollapseOrPickSortColumn,
    SignalPicker,
    AffinityPicker,
    OpenFilesScreen,
    TraceScreen,
    EnvScreen,
    ArgScreen,
    KernelStackScreen,
    Setup,
    ToggleTag,
    TagWithChildren,
    UntagAll,
    Follow,
    Redraw,
    Help,
    Quit,
    IncrementalPidSearch,
}

/// Looks up the canonical binding for `key`, honoring `vi_mode` only in
/// that digit keys mean "repeat count" there instead of "PID search".
pub fn binding_for(key: KeyKind, vi_mode: bool) -> Option<Action> {
    use Action::*;
    Some(match key {
        KeyKind::Char('M') => SortByMem,
        KeyKind::Char('P') => SortByCpu,
        KeyKind::Char('T') => SortByTime,
        KeyKind::Char('t') | KeyKind::Function(5) => ToggleTreeView,
        KeyKind::Char('H') => ToggleHideThreads,
        KeyKind::Char('K') => ToggleHideKernel,
        KeyKind::Char('/') | KeyKind::Function(3) => IncSearch,
        KeyKind::Char('\\') | KeyKind::Function(4) => IncFilter,
        KeyKind::Char('n') => NextMatch,
        KeyKind::Char('N') => PrevMatch,
        KeyKind::Function(7) | KeyKind::Char(']') => RenicePlus,
        KeyKind::Function(8) | KeyKind::Char('[') => ReniceMinus,
        KeyKind::Char('I') => InvertSort,
        KeyKind::Function(6) => ExpandCollapseOrPickSortColumn,
        KeyKind::Function(9) | KeyKind::Char('k') => SignalPicker,
        KeyKind::Char('a') => AffinityPicker,
        KeyKind::Char('l') | KeyKind::Char('o') => OpenFilesScreen,
        KeyKind::Char('s') => TraceScreen,
        KeyKind::Char('e') => EnvScreen,
        KeyKind::Char('A') => ArgScreen,
        KeyKind::Char('x') => KernelStackScreen,
        KeyKind::Function(2) | KeyKind::Char('S') => Setup,
        KeyKind::Space => ToggleTag,
        KeyKind::Char('c') => TagWithChildren,
        KeyKind::Char('U') => UntagAll,
        KeyKind::Char('F') => Follow,
        KeyKind::Ctrl('L') => Redraw,
        KeyKind::Function(1) | KeyKind::Char('h') | KeyKind::Char('?') => Help,
        KeyKind::Char('q') | KeyKind::Function(10) => Quit,
        KeyKind::Char(c) if c.is_ascii_digit() && !vi_mode => IncrementalPidSearch,
        _ => return None,
    })
}

/// Mechanical actions that only touch `Settings`/`ProcessTable` (no
/// Panel/Header/InfoScreen involved) are applied here; the rest are
/// handled by the caller since they switch screens.
pub fn apply(action: Action, settings: &mut Settings, table: &mut ProcessTable) -> Reaction {
    use Action::*;
    let reaction = match action {
        SortByMem => {
            settings.sort_key = FieldId::PercentMem;
            Reaction::REFRESH | Reaction::SAVE_SETTINGS | Reaction::UPDATE_PANELHDR | Reaction::KEEP_FOLLOWING
        }
        SortByCpu => {
            settings.sort_key = FieldId::PercentCpu;
            Reaction::REFRESH | Reaction::SAVE_SETTINGS | Reaction::UPDATE_PANELHDR | Reaction::KEEP_FOLLOWING
        }
        SortByTime => {
            settings.sort_key = FieldId::Time;
            Reaction::REFRESH | Reaction::SAVE_SETTINGS | Reaction::UPDATE_PANELHDR | Reaction::KEEP_FOLLOWING
        }
        ToggleTreeView => {
            settings.tree_view = !settings.tree_view;
            settings.changed = true;
            Reaction::RECALCULATE
                | Reaction::SAVE_SETTINGS
                | Reaction::KEEP_FOLLOWING
                | Reaction::REDRAW_BAR
                | Reaction::UPDATE_PANELHDR
        }
        ToggleHideThreads => {
            settings.hide_thread_processes = !settings.hide_thread_processes;
            settings.changed = true;
            Reaction::RECALCULATE | Reaction::SAVE_SETTINGS
        }
        ToggleHideKernel => {
            settings.hide_kernel_processes = !settings.hide_kernel_processes;
            settings.changed = true;
            Reaction::RECALCULATE | Reaction::SAVE_SETTINGS
        }
        IncSearch | IncFilter => Reaction::REFRESH | Reaction::KEEP_FOLLOWING,
        NextMatch | PrevMatch => Reaction::REFRESH | Reaction::KEEP_FOLLOWING,
        InvertSort => {
            settings.sort_direction = -settings.sort_direction;
            settings.changed = true;
            Reaction::REFRESH | Reaction::SAVE_SETTINGS
        }
        ToggleTag => {
            if let Some(pid) = table.following.or_else(|| table.iter().next().map(|r| r.pid)) {
                if let Some(r) = table.get_by_pid_mut(pid) {
                    r.tagged = !r.tagged;
                }
            }
            Reaction::OK
        }
        TagWithChildren => {
            if let Some(pid) = table.following {
                table.tag_with_children(pid);
            }
            Reaction::OK
        }
        UntagAll => {
            table.tag_all(false);
            Reaction::REFRESH
        }
        ExpandCollapseOrPickSortColumn => {
            // Tree view: collapse/expand the followed process's children.
            // Flat view's "pick sort column" half has no modal-picker
            // counterpart in this crate (see DESIGN.md); the key is a
            // no-op there.
            if settings.tree_view {
                if let Some(pid) = table.following.or_else(|| table.iter().next().map(|r| r.pid)) {
                    if let Some(r) = table.get_by_pid_mut(pid) {
                        r.show_children = !r.show_children;
                    }
                }
                Reaction::RECALCULATE
            } else {
                Reaction::REFRESH | Reaction::REDRAW_BAR
            }
        }
        Follow => Reaction::KEEP_FOLLOWING,
        Redraw => Reaction::REFRESH | Reaction::REDRAW_BAR,
        Quit => Reaction::QUIT,
        // Screen-switching and repeat-scaled actions (renice, pickers,
        // info screens, help, PID search) are dispatched by the caller,
        // which owns the Panel/Header/InfoScreen/PlatformSource state
        // this module does not have access to.
        RenicePlus | ReniceMinus | SignalPicker | AffinityPicker | OpenFilesScreen | TraceScreen
        | EnvScreen | ArgScreen | KernelStackScreen | Setup | Help | IncrementalPidSearch => {
            Reaction::REFRESH | Reaction::REDRAW_BAR
        }
    };
    reaction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRecord;

    #[test]
    fn binding_maps_canonical_keys() {
        assert_eq!(binding_for(KeyKind::Char('M'), false), Some(Action::SortByMem));
        assert_eq!(binding_for(KeyKind::Function(5), false), Some(Action::ToggleTreeView));
        assert_eq!(binding_for(KeyKind::Char('q'), false), Some(Action::Quit));
    }

    #[test]
    fn digit_is_pid_search_outside_vi_mode() {
        assert_eq!(binding_for(KeyKind::Char('5'), false), Some(Action::IncrementalPidSearch));
        assert_eq!(binding_for(KeyKind::Char('5'), true), None);
    }

    #[test]
    fn reaction_bitor_combines_and_contains_checks_subsets() {
        let r = Reaction::REFRESH | Reaction::SAVE_SETTINGS;
        assert!(r.contains(Reaction::REFRESH));
        assert!(r.contains(Reaction::SAVE_SETTINGS));
        assert!(!r.contains(Reaction::QUIT));
    }

    #[test]
    fn recalculate_implies_refresh() {
        assert!(Reaction::RECALCULATE.contains(Reaction::REFRESH));
    }

    #[test]
    fn toggle_tree_view_flips_setting_and_marks_changed() {
        let mut settings = Settings::default();
        let mut table = ProcessTable::new();
        let before = settings.tree_view;
        let reaction = apply(Action::ToggleTreeView, &mut settings, &mut table);
        assert_ne!(settings.tree_view, before);
        assert!(settings.changed);
        assert!(reaction.contains(Reaction::RECALCULATE));
    }

    #[test]
    fn expand_collapse_flips_show_children_in_tree_view() {
        let mut settings = Settings::default();
        settings.tree_view = true;
        let mut table = ProcessTable::new();
        table.add(ProcessRecord::new(42, 0.0));
        table.following = Some(42);
        apply(Action::ExpandCollapseOrPickSortColumn, &mut settings, &mut table);
        assert!(!table.get_by_pid(42).unwrap().show_children);
        apply(Action::ExpandCollapseOrPickSortColumn, &mut settings, &mut table);
        assert!(table.get_by_pid(42).unwrap().show_children);
    }

    #[test]
    fn toggle_tag_flips_following_process() {
        let mut settings = Settings::default();
        let mut table = ProcessTable::new();
        table.add(ProcessRecord::new(42, 0.0));
        table.following = Some(42);
        apply(Action::ToggleTag, &mut settings, &mut table);
        assert!(table.get_by_pid(42).unwrap().tagged);
    }
}
