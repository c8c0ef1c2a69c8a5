//! Bottom ten-slot key-hint strip.

pub const SLOT_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct FunctionBar {
    /// `(label, key_code)` per slot; an empty label means the slot is
    /// blank for this screen.
    slots: [(String, i32); SLOT_COUNT],
}

impl FunctionBar {
    pub fn new(labels: [&str; SLOT_COUNT], keys: [i32; SLOT_COUNT]) -> Self {
        let mut slots: [(String, i32); SLOT_COUNT] = Default::default();
        for i in 0..SLOT_COUNT {
            slots[i] = (labels[i].to_owned(), keys[i]);
        }
        FunctionBar { slots }
    }

    pub fn blank() -> Self {
        FunctionBar {
            slots: Default::default(),
        }
    }

    pub fn label(&self, slot: usize) -> &str {
        &self.slots[slot].0
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(label, _)| label.as_str())
    }

    /// Maps a click column to the slot's key code, given each slot is
    /// `width` columns wide. Returns `None` for a click past the last
    /// non-blank slot.
    pub fn synthesize_event(&self, column: usize, width: usize) -> Option<i32> {
        if width == 0 {
            return None;
        }
        let slot = column / width;
        self.slots.get(slot).and_then(|(label, key)| {
            if label.is_empty() {
                None
            } else {
                Some(*key)
            }
        })
    }
}

impl Default for FunctionBar {
    fn default() -> Self {
        Self::blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_event_maps_column_to_slot_key() {
        let labels = ["Help", "Setup", "Search", "Filter", "Tree", "SortBy", "Nice-", "Nice+", "Kill", "Quit"];
        let keys = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let bar = FunctionBar::new(labels, keys);
        assert_eq!(bar.synthesize_event(0, 8), Some(1));
        assert_eq!(bar.synthesize_event(9, 8), Some(2));
        assert_eq!(bar.synthesize_event(79, 8), Some(10));
    }

    #[test]
    fn blank_slot_synthesizes_no_event() {
        let mut labels = [""; SLOT_COUNT];
        labels[0] = "Help";
        let bar = FunctionBar::new(labels, [1; SLOT_COUNT]);
        assert_eq!(bar.synthesize_event(8, 8), None);
    }
}
