use common::{ClientId, proto};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn to_proto(self) -> i32 {
        match self {
            Mark::X => proto::Mark::X as i32,
            Mark::O => proto::Mark::O as i32,
        }
    }
}

/// `None` is an empty cell.
pub type Cell = Option<Mark>;

pub fn cell_to_proto(cell: Cell) -> i32 {
    cell.map_or(proto::Mark::Empty as i32, Mark::to_proto)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Unknown or unspecified values fall back to `Medium`.
    pub fn from_proto(value: i32) -> Self {
        match proto::Difficulty::try_from(value) {
            Ok(proto::Difficulty::Easy) => Difficulty::Easy,
            Ok(proto::Difficulty::Hard) => Difficulty::Hard,
            Ok(proto::Difficulty::Medium | proto::Difficulty::Unspecified) | Err(_) => {
                Difficulty::Medium
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameKind {
    SinglePlayer,
    Multiplayer,
}

impl GameKind {
    pub fn to_proto(self) -> i32 {
        match self {
            GameKind::SinglePlayer => proto::GameKind::SinglePlayer as i32,
            GameKind::Multiplayer => proto::GameKind::Multiplayer as i32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEndReason {
    Normal,
    Timeout,
    OpponentLeft,
}

impl GameEndReason {
    pub fn to_proto(self) -> i32 {
        match self {
            GameEndReason::Normal => proto::GameEndReason::Normal as i32,
            GameEndReason::Timeout => proto::GameEndReason::Timeout as i32,
            GameEndReason::OpponentLeft => proto::GameEndReason::OpponentLeft as i32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinResult {
    pub mark: Mark,
    pub line: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Won(Mark),
    Draw,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub result: GameResult,
    pub reason: GameEndReason,
    pub winning_line: Option<Vec<usize>>,
}

impl Outcome {
    pub fn win(win: WinResult) -> Self {
        Self {
            result: GameResult::Won(win.mark),
            reason: GameEndReason::Normal,
            winning_line: Some(win.line),
        }
    }

    pub fn draw() -> Self {
        Self {
            result: GameResult::Draw,
            reason: GameEndReason::Normal,
            winning_line: None,
        }
    }

    pub fn forfeit(loser: Mark, reason: GameEndReason) -> Self {
        Self {
            result: GameResult::Won(loser.opponent()),
            reason,
            winning_line: None,
        }
    }

    pub fn winner(&self) -> Option<Mark> {
        match self.result {
            GameResult::Won(mark) => Some(mark),
            GameResult::Draw => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Participant {
    Human(ClientId),
    Bot,
}

impl Participant {
    pub fn client_id(&self) -> Option<&ClientId> {
        match self {
            Participant::Human(client_id) => Some(client_id),
            Participant::Bot => None,
        }
    }
}

/// One value per mark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByMark<T> {
    pub x: T,
    pub o: T,
}

impl<T> ByMark<T> {
    pub fn new(x: T, o: T) -> Self {
        Self { x, o }
    }

    pub fn get(&self, mark: Mark) -> &T {
        match mark {
            Mark::X => &self.x,
            Mark::O => &self.o,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.x, &mut self.o);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mark, &T)> {
        [(Mark::X, &self.x), (Mark::O, &self.o)].into_iter()
    }
}

impl<T: PartialEq> ByMark<T> {
    pub fn mark_of(&self, value: &T) -> Option<Mark> {
        self.iter().find(|(_, v)| *v == value).map(|(mark, _)| mark)
    }
}
