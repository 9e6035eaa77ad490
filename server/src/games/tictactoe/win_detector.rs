use super::board::Board;
use super::types::WinResult;

/// Scans every window of `win_length` cells: rows, then columns, then
/// down-right diagonals, then down-left diagonals. The first complete window
/// wins.
pub fn check_win(board: &Board) -> Option<WinResult> {
    let size = board.size();
    let win_length = board.win_length();
    if size < win_length {
        return None;
    }
    let last_start = size - win_length;

    for row in 0..size {
        for col in 0..=last_start {
            if let Some(win) = check_line(board, row * size + col, 1, win_length) {
                return Some(win);
            }
        }
    }

    for col in 0..size {
        for row in 0..=last_start {
            if let Some(win) = check_line(board, row * size + col, size, win_length) {
                return Some(win);
            }
        }
    }

    for row in 0..=last_start {
        for col in 0..=last_start {
            if let Some(win) = check_line(board, row * size + col, size + 1, win_length) {
                return Some(win);
            }
        }
    }

    for row in 0..=last_start {
        for col in (win_length - 1)..size {
            if let Some(win) = check_line(board, row * size + col, size - 1, win_length) {
                return Some(win);
            }
        }
    }

    None
}

fn check_line(board: &Board, start: usize, step: usize, win_length: usize) -> Option<WinResult> {
    let cells = board.cells();
    let mark = cells[start]?;
    let line: Vec<usize> = (0..win_length).map(|i| start + i * step).collect();
    if line.iter().all(|&index| cells[index] == Some(mark)) {
        Some(WinResult { mark, line })
    } else {
        None
    }
}
