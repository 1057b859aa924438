//! The ring-shaped memory tape and its data pointer.

/// Number of cells on every tape.
pub const TAPE_LEN: usize = 30_000;

/// Errors raised when a tape is assembled from untrusted parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TapeError {
    #[error("tape must have exactly {TAPE_LEN} cells, got {len}")]
    WrongLength { len: usize },

    #[error("cursor {cursor} is outside the tape (0..{TAPE_LEN})")]
    CursorOutOfRange { cursor: usize },
}

/// A fixed 30,000-cell tape of bytes plus the data pointer into it.
///
/// Both the pointer and the cell values wrap: moving right from the last cell
/// lands on cell 0, moving left from cell 0 lands on the last cell, and cell
/// arithmetic is modulo 256.
#[derive(Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Box<[u8]>,
    cursor: usize,
}

impl Tape {
    /// A zeroed tape with the pointer on cell 0.
    pub fn new() -> Self {
        Self {
            cells: vec![0; TAPE_LEN].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Assemble a tape from a full cell array and a pointer position.
    pub fn from_parts(cells: Vec<u8>, cursor: usize) -> Result<Self, TapeError> {
        if cells.len() != TAPE_LEN {
            return Err(TapeError::WrongLength { len: cells.len() });
        }
        if cursor >= TAPE_LEN {
            return Err(TapeError::CursorOutOfRange { cursor });
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
            cursor,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Value under the data pointer.
    #[inline]
    pub fn current(&self) -> u8 {
        self.cells[self.cursor]
    }

    #[inline]
    pub fn set_current(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    #[inline]
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1) % TAPE_LEN;
    }

    #[inline]
    pub fn move_left(&mut self) {
        self.cursor = (self.cursor + TAPE_LEN - 1) % TAPE_LEN;
    }

    #[inline]
    pub fn increment(&mut self) {
        self.cells[self.cursor] = self.cells[self.cursor].wrapping_add(1);
    }

    #[inline]
    pub fn decrement(&mut self) {
        self.cells[self.cursor] = self.cells[self.cursor].wrapping_sub(1);
    }

    /// Indices and values of every nonzero cell, in index order.
    pub fn nonzero_cells(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(i, &v)| (i, v))
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

// Printing 30,000 cells is useless; summarize instead.
impl std::fmt::Debug for Tape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tape")
            .field("cursor", &self.cursor)
            .field("current", &self.current())
            .field("nonzero", &self.nonzero_cells().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tape_is_zeroed() {
        let tape = Tape::new();
        assert_eq!(tape.cells().len(), TAPE_LEN);
        assert_eq!(tape.cursor(), 0);
        assert!(tape.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn pointer_wraps_in_both_directions() {
        let mut tape = Tape::new();
        tape.move_left();
        assert_eq!(tape.cursor(), TAPE_LEN - 1);
        tape.move_right();
        assert_eq!(tape.cursor(), 0);
    }

    #[test]
    fn cells_wrap_modulo_256() {
        let mut tape = Tape::new();
        tape.decrement();
        assert_eq!(tape.current(), 255);
        tape.increment();
        assert_eq!(tape.current(), 0);
    }

    #[test]
    fn from_parts_rejects_bad_input() {
        assert_eq!(
            Tape::from_parts(vec![0; 10], 0),
            Err(TapeError::WrongLength { len: 10 })
        );
        assert_eq!(
            Tape::from_parts(vec![0; TAPE_LEN], TAPE_LEN),
            Err(TapeError::CursorOutOfRange { cursor: TAPE_LEN })
        );
    }

    #[test]
    fn nonzero_cells_lists_only_set_cells() {
        let mut tape = Tape::new();
        tape.increment();
        tape.move_right();
        tape.move_right();
        tape.decrement();
        let got: Vec<_> = tape.nonzero_cells().collect();
        assert_eq!(got, vec![(0, 1), (2, 255)]);
    }
}
