//! On-disk tape snapshots used by `bf run --state`.
//!
//! Only nonzero cells are stored:
//!
//! ```toml
//! cursor = 1
//! cells = [[0, 3], [1, 72]]
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tape::{Tape, TapeError, TAPE_LEN};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid snapshot: {0}")]
    InvalidTape(#[from] TapeError),

    #[error("invalid snapshot: cell index {index} is outside the tape")]
    CellOutOfRange { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cursor: usize,
    #[serde(default)]
    pub cells: Vec<(usize, u8)>,
}

impl Snapshot {
    pub fn capture(tape: &Tape) -> Self {
        Self {
            cursor: tape.cursor(),
            cells: tape.nonzero_cells().collect(),
        }
    }

    pub fn into_tape(self) -> Result<Tape, SnapshotError> {
        let mut cells = vec![0u8; TAPE_LEN];
        for (index, value) in self.cells {
            let slot = cells
                .get_mut(index)
                .ok_or(SnapshotError::CellOutOfRange { index })?;
            *slot = value;
        }
        Ok(Tape::from_parts(cells, self.cursor)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, SnapshotError> {
        Ok(toml::to_string(self)?)
    }
}

/// Load a tape from `path`. Returns `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<Tape>, SnapshotError> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Snapshot::from_toml(&text)?.into_tape().map(Some)
}

pub fn save(path: &Path, tape: &Tape) -> Result<(), SnapshotError> {
    let text = Snapshot::capture(tape).to_toml()?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execute;

    #[test]
    fn save_then_load_preserves_cells_and_cursor() {
        let out = execute("+++>++++++++[>+<-]>", "", Tape::new()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        save(&path, &out.tape).unwrap();
        let loaded = load(&path).unwrap().expect("snapshot exists");
        assert_eq!(loaded, out.tape);
        assert_eq!(loaded.cursor(), 2);
        assert_eq!(&loaded.cells()[..3], &[3, 0, 8]);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.toml")).unwrap().is_none());
    }

    #[test]
    fn parses_handwritten_snapshot() {
        let snap = Snapshot::from_toml("cursor = 4\ncells = [[4, 65]]\n").unwrap();
        let tape = snap.into_tape().unwrap();
        assert_eq!(tape.current(), 65);
    }

    #[test]
    fn rejects_cursor_past_the_end() {
        let snap = Snapshot::from_toml("cursor = 30000\n").unwrap();
        assert!(matches!(
            snap.into_tape(),
            Err(SnapshotError::InvalidTape(TapeError::CursorOutOfRange { cursor: 30000 }))
        ));
    }

    #[test]
    fn rejects_cell_past_the_end() {
        let snap = Snapshot::from_toml("cursor = 0\ncells = [[30000, 1]]\n").unwrap();
        assert!(matches!(
            snap.into_tape(),
            Err(SnapshotError::CellOutOfRange { index: 30000 })
        ));
    }

    #[test]
    fn rejects_cell_value_over_255() {
        assert!(matches!(
            Snapshot::from_toml("cursor = 0\ncells = [[0, 256]]\n"),
            Err(SnapshotError::Parse(_))
        ));
    }
}
