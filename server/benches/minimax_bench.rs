use criterion::{Criterion, criterion_group, criterion_main};
use tictactoe_server::games::SessionRng;
use tictactoe_server::games::tictactoe::{
    BotInput, Board, Difficulty, Mark, calculate_minimax_move, calculate_move, check_win,
};

fn board_with_moves(size: usize, moves: &[(usize, Mark)]) -> Board {
    let mut board = Board::new(size);
    for &(index, mark) in moves {
        board.place(index, mark).unwrap();
    }
    board
}

fn bench_minimax_3x3_after_opening(c: &mut Criterion) {
    let board = board_with_moves(3, &[(0, Mark::X)]);
    c.bench_function("minimax_3x3_full_depth_after_corner", |b| {
        b.iter(|| calculate_minimax_move(board.clone()));
    });
}

fn bench_minimax_6x6_midgame(c: &mut Criterion) {
    let board = board_with_moves(
        6,
        &[
            (14, Mark::X),
            (15, Mark::O),
            (20, Mark::X),
            (21, Mark::O),
            (8, Mark::X),
            (27, Mark::O),
        ],
    );
    c.bench_function("minimax_6x6_depth_4_midgame", |b| {
        b.iter(|| calculate_minimax_move(board.clone()));
    });
}

fn bench_hard_bot_full_game_3x3(c: &mut Criterion) {
    c.bench_function("hard_bot_self_play_3x3", |b| {
        b.iter(|| {
            let mut board = Board::new(3);
            let mut rng = SessionRng::new(7);
            let mut mark = Mark::X;
            while let Some(index) = calculate_move(BotInput::new(&board, Difficulty::Hard), &mut rng) {
                board.place(index, mark).unwrap();
                if check_win(&board).is_some() {
                    break;
                }
                mark = mark.opponent();
            }
            board
        });
    });
}

criterion_group!(
    benches,
    bench_minimax_3x3_after_opening,
    bench_minimax_6x6_midgame,
    bench_hard_bot_full_game_3x3
);
criterion_main!(benches);
