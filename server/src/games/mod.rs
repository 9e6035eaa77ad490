mod broadcaster;
mod session_rng;
pub mod tictactoe;

pub use broadcaster::GameEventSink;
pub use session_rng::SessionRng;
