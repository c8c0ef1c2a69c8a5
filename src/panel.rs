//! Scrollable, selectable row list. Rendering happens in `ui.rs`; this
//! module owns the selection/scroll/type-ahead state machine so it stays
//! testable without a terminal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKey {
    Down,
    Up,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    WheelUp,
    WheelDown,
    Caret,
    Dollar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingResult {
    Handled,
    BreakLoop,
    Ignored,
}

/// What `ui.rs` needs to paint after a state change: everything, or just
/// the rows whose selection highlight moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintPlan {
    Full,
    Incremental { old_selected: usize, new_selected: usize },
}

pub struct Panel<T> {
    items: Vec<T>,
    selected: usize,
    old_selected: usize,
    pub scroll_v: usize,
    pub scroll_h: usize,
    needs_redraw: bool,
    selected_len: usize,
    type_buffer: String,
    pub header: Option<String>,
    scroll_h_amount: usize,
    wheel_amount: usize,
    /// Height from the last `sync_viewport`, used by PageUp/PageDown.
    last_height: std::cell::Cell<usize>,
}

impl<T> Panel<T> {
    pub fn new() -> Self {
        Panel {
            items: Vec::new(),
            selected: 0,
            old_selected: 0,
            scroll_v: 0,
            scroll_h: 0,
            needs_redraw: true,
            selected_len: 0,
            type_buffer: String::new(),
            header: None,
            scroll_h_amount: 5,
            wheel_amount: 3,
            last_height: std::cell::Cell::new(0),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    /// Replaces the row set, clamping selection/scroll into range and
    /// marking a full repaint.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.clamp_selection();
        self.needs_redraw = true;
    }

    fn clamp_selection(&mut self) {
        if self.items.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.items.len() {
            self.selected = self.items.len() - 1;
        }
    }

    /// Re-seeks the selection to `pid`, for the `follow` binding, using
    /// `key_of` to compare rows by identity.
    pub fn follow<K: PartialEq>(&mut self, key: K, key_of: impl Fn(&T) -> K) {
        if let Some(i) = self.items.iter().position(|item| key_of(item) == key) {
            self.selected = i;
        }
    }

    pub fn on_key(&mut self, key: PanelKey, repeat: i32) -> bool {
        let size = self.items.len() as i32;
        let repeat = repeat.max(1);
        match key {
            PanelKey::Down => self.selected = (self.selected as i32 + repeat).max(0) as usize,
            PanelKey::Up => {
                self.selected = (self.selected as i32 - repeat).max(0) as usize;
            }
            PanelKey::Left => {
                if self.scroll_h > 0 {
                    self.scroll_h = self.scroll_h.saturating_sub(self.scroll_h_amount);
                    self.needs_redraw = true;
                }
            }
            PanelKey::Right => {
                self.scroll_h += self.scroll_h_amount;
                self.needs_redraw = true;
            }
            PanelKey::PageUp => {
                let page = self.viewport_height().max(1) as i32 - 1;
                self.selected = (self.selected as i32 - page).max(0) as usize;
                self.needs_redraw = true;
            }
            PanelKey::PageDown => {
                let page = self.viewport_height().max(1) as i32 - 1;
                self.selected = (self.selected as i32 + page).max(0) as usize;
                self.needs_redraw = true;
            }
            PanelKey::Home => self.selected = 0,
            PanelKey::End => self.selected = (size - 1).max(0) as usize,
            PanelKey::WheelUp => {
                self.selected = (self.selected as i32 - self.wheel_amount as i32).max(0) as usize;
                self.needs_redraw = true;
            }
            PanelKey::WheelDown => {
                self.selected = (self.selected as i32 + self.wheel_amount as i32).max(0) as usize;
                self.needs_redraw = true;
            }
            PanelKey::Caret => {
                self.scroll_h = 0;
                self.needs_redraw = true;
            }
            PanelKey::Dollar => {
                let w = self.viewport_width();
                self.scroll_h = self
                    .selected_len
                    .saturating_sub(w)
                    .div_ceil(self.scroll_h_amount.max(1))
                    * self.scroll_h_amount.max(1);
                self.needs_redraw = true;
            }
        }
        if size == 0 {
            self.selected = 0;
        } else if self.selected as i32 >= size {
            self.selected = (size - 1) as usize;
        }
        true
    }

    /// `Backspace`/printable/Enter/Esc are handled by the caller; this is
    /// only the alnum-prefix-match step. `label_of` extracts the text
    /// matched against (leading spaces skipped, matching the reference's
    /// left-trim before `strncasecmp`).
    pub fn select_by_typing(&mut self, ch: char, label_of: impl Fn(&T) -> &str) -> TypingResult {
        if ch.is_ascii_alphanumeric() {
            if self.type_buffer.len() < 99 {
                self.type_buffer.push(ch);
            }
            for _try in 0..2 {
                let needle = self.type_buffer.to_ascii_lowercase();
                if let Some(i) = self.items.iter().position(|item| {
                    label_of(item).trim_start().to_ascii_lowercase().starts_with(&needle)
                }) {
                    self.set_selected(i);
                    return TypingResult::Handled;
                }
                self.type_buffer.clear();
                self.type_buffer.push(ch);
            }
            return TypingResult::Handled;
        }
        self.type_buffer.clear();
        TypingResult::Ignored
    }

    pub fn set_selected(&mut self, i: usize) {
        let size = self.items.len();
        self.selected = if size == 0 {
            0
        } else {
            i.min(size - 1)
        };
    }

    /// Called once per frame before painting: clamps scroll into range
    /// and ensures the selection is within the viewport.
    pub fn sync_viewport(&mut self, height: usize) {
        let size = self.items.len();
        if self.scroll_v >= size {
            self.scroll_v = size.saturating_sub(1);
            self.needs_redraw = true;
        }
        if self.selected < self.scroll_v {
            self.scroll_v = self.selected;
            self.needs_redraw = true;
        } else if height > 0 && self.selected >= self.scroll_v + height {
            self.scroll_v = self.selected + 1 - height;
            self.needs_redraw = true;
        }
        self.last_height.set(height);
    }

    fn viewport_height(&self) -> usize {
        self.last_height.get()
    }

    fn viewport_width(&self) -> usize {
        80
    }

    pub fn visible_range(&self, height: usize) -> std::ops::Range<usize> {
        let first = self.scroll_v;
        let upto = (first + height).min(self.items.len());
        first..upto
    }

    pub fn repaint_plan(&mut self) -> RepaintPlan {
        let plan = if self.needs_redraw {
            RepaintPlan::Full
        } else {
            RepaintPlan::Incremental {
                old_selected: self.old_selected,
                new_selected: self.selected,
            }
        };
        self.needs_redraw = false;
        self.old_selected = self.selected;
        plan
    }

    pub fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    pub fn set_selected_len(&mut self, len: usize) {
        self.selected_len = len;
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.items.swap(self.selected, self.selected - 1);
            self.selected -= 1;
            self.needs_redraw = true;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.items.swap(self.selected, self.selected + 1);
            self.selected += 1;
            self.needs_redraw = true;
        }
    }

    pub fn move_to_top(&mut self) {
        if !self.items.is_empty() {
            let item = self.items.remove(self.selected);
            self.items.insert(0, item);
            self.selected = 0;
            self.needs_redraw = true;
        }
    }

    pub fn move_to_bottom(&mut self) {
        if !self.items.is_empty() {
            let item = self.items.remove(self.selected);
            self.selected = self.items.len();
            self.items.push(item);
            self.needs_redraw = true;
        }
    }
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_of(n: usize) -> Panel<i32> {
        let mut p = Panel::new();
        p.set_items((0..n as i32).collect());
        p
    }

    #[test]
    fn down_up_moves_selection_by_repeat() {
        let mut p = panel_of(10);
        p.on_key(PanelKey::Down, 3);
        assert_eq!(p.selected_index(), 3);
        p.on_key(PanelKey::Up, 1);
        assert_eq!(p.selected_index(), 2);
    }

    #[test]
    fn home_end_jump_to_bounds() {
        let mut p = panel_of(5);
        p.on_key(PanelKey::End, 1);
        assert_eq!(p.selected_index(), 4);
        p.on_key(PanelKey::Home, 1);
        assert_eq!(p.selected_index(), 0);
    }

    #[test]
    fn selection_clamps_when_items_shrink() {
        let mut p = panel_of(10);
        p.on_key(PanelKey::Down, 8);
        assert_eq!(p.selected_index(), 8);
        p.set_items((0..3).collect());
        assert_eq!(p.selected_index(), 2);
    }

    #[test]
    fn select_by_typing_matches_prefix_then_restarts_word() {
        let mut p: Panel<&str> = Panel::new();
        p.set_items(vec!["apple", "banana", "cherry"]);
        let label_of = |s: &&str| *s;
        assert_eq!(p.select_by_typing('b', label_of), TypingResult::Handled);
        assert_eq!(p.selected_index(), 1);
        assert_eq!(p.select_by_typing('z', label_of), TypingResult::Handled);
    }

    #[test]
    fn repaint_plan_reports_full_then_incremental() {
        let mut p = panel_of(5);
        assert_eq!(p.repaint_plan(), RepaintPlan::Full);
        p.on_key(PanelKey::Down, 1);
        match p.repaint_plan() {
            RepaintPlan::Incremental { old_selected, new_selected } => {
                assert_eq!(old_selected, 0);
                assert_eq!(new_selected, 1);
            }
            RepaintPlan::Full => panic!("expected incremental plan"),
        }
    }

    #[test]
    fn sync_viewport_scrolls_to_keep_selection_visible() {
        let mut p = panel_of(20);
        p.on_key(PanelKey::End, 1);
        p.sync_viewport(5);
        assert_eq!(p.scroll_v, 15);
    }

    #[test]
    fn move_to_top_relocates_selected_item() {
        let mut p = panel_of(5);
        p.on_key(PanelKey::Down, 3);
        p.move_to_top();
        assert_eq!(p.selected_index(), 0);
        assert_eq!(p.items()[0], 3);
    }

    #[test]
    fn follow_reseeks_selection_by_key() {
        let mut p = panel_of(5);
        p.follow(3, |&x| x);
        assert_eq!(p.selected_index(), 3);
    }
}

