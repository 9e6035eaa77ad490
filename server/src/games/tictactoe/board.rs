use common::proto;

use super::types::{Cell, Mark, cell_to_proto};

/// Row-major `size * size` grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Length of the run needed to win on this board.
    pub fn win_length(&self) -> usize {
        if self.size >= 5 { 5 } else { 3 }
    }

    pub fn is_valid_move(&self, index: usize) -> bool {
        matches!(self.get(index), Some(None))
    }

    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), String> {
        match self.get(index) {
            None => Err(format!("Cell {} is out of bounds", index)),
            Some(Some(_)) => Err(format!("Cell {} is already marked", index)),
            Some(None) => {
                self.cells[index] = Some(mark);
                Ok(())
            }
        }
    }

    pub(crate) fn set(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn to_proto(&self) -> proto::BoardState {
        proto::BoardState {
            size: self.size as u32,
            cells: self.cells.iter().map(|&cell| cell_to_proto(cell)).collect(),
        }
    }

    /// Builds a board from rows of `X`, `O` and `.` characters.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let size = rows.len();
        let cells = rows
            .iter()
            .flat_map(|row| {
                assert_eq!(row.len(), size, "row {:?} has wrong width", row);
                row.chars().map(|c| match c {
                    'X' => Some(Mark::X),
                    'O' => Some(Mark::O),
                    _ => None,
                })
            })
            .collect();
        Self { size, cells }
    }
}
