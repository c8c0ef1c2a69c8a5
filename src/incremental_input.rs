//! Modal incremental search/filter editor (`IncSet`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncMode {
    Search,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncOutcome {
    /// The key was consumed.
    Handled,
    /// Enter confirmed the buffer.
    Confirmed,
    /// Esc restored the previous buffer and deactivated.
    Cancelled,
    /// Not an editing key; caller should handle it normally.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncKey {
    Printable(char),
    Backspace,
    Enter,
    Esc,
}

/// A single mode's buffer plus the value it had before this activation,
/// restored on Esc.
#[derive(Debug, Clone, Default)]
struct Buffer {
    text: String,
    saved: String,
}

#[derive(Debug, Default)]
pub struct IncSet {
    active: Option<IncMode>,
    search: Buffer,
    filter: Buffer,
    /// Set false by `next`/`prev` when no row matches; read by the UI to
    /// paint the search bar in a failure color.
    pub found: bool,
}

impl IncSet {
    pub fn new() -> Self {
        IncSet::default()
    }

    pub fn active(&self) -> Option<IncMode> {
        self.active
    }

    pub fn activate(&mut self, mode: IncMode) {
        let buf = self.buffer_mut(mode);
        buf.saved = buf.text.clone();
        self.active = Some(mode);
        self.found = true;
    }

    fn buffer_mut(&mut self, mode: IncMode) -> &mut Buffer {
        match mode {
            IncMode::Search => &mut self.search,
            IncMode::Filter => &mut self.filter,
        }
    }

    /// The substring currently narrowing the Panel, or `""` if unset.
    pub fn filter(&self) -> &str {
        &self.filter.text
    }

    pub fn search_query(&self) -> &str {
        &self.search.text
    }

    /// Handles one key while a mode is active. Returns `Ignored` if no
    /// mode is active.
    pub fn handle_key(&mut self, key: IncKey) -> IncOutcome {
        let Some(mode) = self.active else {
            return IncOutcome::Ignored;
        };
        match key {
            IncKey::Printable(ch) => {
                self.buffer_mut(mode).text.push(ch);
                IncOutcome::Handled
            }
            IncKey::Backspace => {
                self.buffer_mut(mode).text.pop();
                IncOutcome::Handled
            }
            IncKey::Enter => {
                self.active = None;
                if mode == IncMode::Search {
                    // Search leaves the last query in place but does not
                    // keep narrowing the Panel; nothing else to do.
                }
                IncOutcome::Confirmed
            }
            IncKey::Esc => {
                let saved = self.buffer_mut(mode).saved.clone();
                self.buffer_mut(mode).text = saved;
                self.active = None;
                IncOutcome::Cancelled
            }
        }
    }

    /// Advances `from` to the next visible row (via `label_of`) whose
    /// label contains the search buffer case-insensitively, wrapping
    /// once. Returns `None` (and sets `found = false`) if nothing
    /// matches or the buffer is empty.
    pub fn next<T>(&mut self, items: &[T], from: usize, label_of: impl Fn(&T) -> &str) -> Option<usize> {
        self.seek(items, from, 1, label_of)
    }

    pub fn prev<T>(&mut self, items: &[T], from: usize, label_of: impl Fn(&T) -> &str) -> Option<usize> {
        self.seek(items, from, -1, label_of)
    }

    fn seek<T>(
        &mut self,
        items: &[T],
        from: usize,
        step: isize,
        label_of: impl Fn(&T) -> &str,
    ) -> Option<usize> {
        let needle = self.search.text.to_ascii_lowercase();
        if needle.is_empty() || items.is_empty() {
            self.found = false;
            return None;
        }
        let len = items.len() as isize;
        let mut i = from as isize;
        for _ in 0..len {
            i = (i + step).rem_euclid(len);
            if label_of(&items[i as usize]).to_ascii_lowercase().contains(&needle) {
                self.found = true;
                return Some(i as usize);
            }
        }
        self.found = false;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_then_type_builds_buffer() {
        let mut s = IncSet::new();
        s.activate(IncMode::Search);
        s.handle_key(IncKey::Printable('a'));
        s.handle_key(IncKey::Printable('b'));
        assert_eq!(s.search_query(), "ab");
    }

    #[test]
    fn esc_restores_previous_buffer() {
        let mut s = IncSet::new();
        s.activate(IncMode::Filter);
        s.handle_key(IncKey::Printable('x'));
        let outcome = s.handle_key(IncKey::Esc);
        assert_eq!(outcome, IncOutcome::Cancelled);
        assert_eq!(s.filter(), "");
        assert!(s.active().is_none());
    }

    #[test]
    fn enter_confirms_and_deactivates() {
        let mut s = IncSet::new();
        s.activate(IncMode::Filter);
        s.handle_key(IncKey::Printable('x'));
        let outcome = s.handle_key(IncKey::Enter);
        assert_eq!(outcome, IncOutcome::Confirmed);
        assert_eq!(s.filter(), "x");
        assert!(s.active().is_none());
    }

    #[test]
    fn next_wraps_once_and_reports_found() {
        let mut s = IncSet::new();
        s.activate(IncMode::Search);
        s.handle_key(IncKey::Printable('b'));
        let items = vec!["alpha", "bravo", "charlie"];
        let idx = s.next(&items, 0, |x: &&str| *x);
        assert_eq!(idx, Some(1));
        assert!(s.found);
    }

    #[test]
    fn next_reports_not_found_when_no_match() {
        let mut s = IncSet::new();
        s.activate(IncMode::Search);
        s.handle_key(IncKey::Printable('z'));
        let items = vec!["alpha", "bravo"];
        let idx = s.next(&items, 0, |x: &&str| *x);
        assert_eq!(idx, None);
        assert!(!s.found);
    }
}
