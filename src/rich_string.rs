//! Styled-character line model, the unit rendered by `Panel` and
//! `ProcessRecord::write_field`.

/// Keeps redraw cost proportional to the visible area rather than to
/// whatever a runaway command line could produce.
pub const MAX_LEN: usize = 350;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorPair {
    Default,
    Normal,
    Running,
    Sleeping,
    DiskIoOrKernel,
    Zombie,
    BaseName,
    Megabytes,
    LargeNumber,
    Shadow,
    HighPriority,
    LowPriority,
    ProcessTag,
    ProcessTree,
    FailedSearch,
    FunctionKey,
    FunctionBar,
    PanelHeaderFocus,
    PanelHeaderUnfocus,
    PanelSelectionFocus,
    PanelSelectionUnfocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub color: ColorPair,
    pub bold: bool,
}

impl Cell {
    fn new(ch: char, color: ColorPair, bold: bool) -> Self {
        // Non-printable bytes render as '?', matching RichString_writeFrom.
        let ch = if ch.is_control() { '?' } else { ch };
        Cell { ch, color, bold }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RichString {
    cells: Vec<Cell>,
}

impl RichString {
    pub fn new() -> Self {
        RichString { cells: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Appends `data` in `color`, truncating so the line never exceeds
    /// [`MAX_LEN`].
    pub fn append(&mut self, color: ColorPair, data: &str) {
        self.append_bold(color, data, false);
    }

    pub fn append_bold(&mut self, color: ColorPair, data: &str, bold: bool) {
        for ch in data.chars() {
            if self.cells.len() >= MAX_LEN {
                break;
            }
            self.cells.push(Cell::new(ch, color, bold));
        }
    }

    /// Overwrites the color (and boldness) of cells in `[start, finish]`
    /// inclusive, clamped to the current length.
    pub fn set_attrn(&mut self, color: ColorPair, start: usize, finish: usize) {
        if self.cells.is_empty() {
            return;
        }
        let finish = finish.min(self.cells.len() - 1);
        for cell in &mut self.cells[start..=finish] {
            cell.color = color;
        }
    }

    pub fn set_attr(&mut self, color: ColorPair) {
        if !self.cells.is_empty() {
            let last = self.cells.len() - 1;
            self.set_attrn(color, 0, last);
        }
    }

    pub fn find_char(&self, c: char, start: usize) -> Option<usize> {
        self.cells[start.min(self.cells.len())..]
            .iter()
            .position(|cell| cell.ch == c)
            .map(|i| i + start)
    }

    pub fn to_plain_string(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_truncates_at_max_len() {
        let mut rs = RichString::new();
        rs.append(ColorPair::Default, &"x".repeat(MAX_LEN + 50));
        assert_eq!(rs.len(), MAX_LEN);
    }

    #[test]
    fn control_chars_become_question_marks() {
        let mut rs = RichString::new();
        rs.append(ColorPair::Default, "a\tb");
        assert_eq!(rs.to_plain_string(), "a?b");
    }

    #[test]
    fn find_char_respects_start_offset() {
        let mut rs = RichString::new();
        rs.append(ColorPair::Default, "abcabc");
        assert_eq!(rs.find_char('b', 0), Some(1));
        assert_eq!(rs.find_char('b', 2), Some(4));
        assert_eq!(rs.find_char('z', 0), None);
    }

    #[test]
    fn set_attrn_colors_range() {
        let mut rs = RichString::new();
        rs.append(ColorPair::Default, "abcd");
        rs.set_attrn(ColorPair::BaseName, 1, 2);
        let colors: Vec<_> = rs.cells().iter().map(|c| c.color).collect();
        assert_eq!(
            colors,
            vec![
                ColorPair::Default,
                ColorPair::BaseName,
                ColorPair::BaseName,
                ColorPair::Default,
            ]
        );
    }
}
