//! Mutation helpers for the [`Game`] aggregate.
//!
//! A `Game` arrives whole inside a history snapshot and is then kept
//! current by per-board end events and, eventually, one aggregate end
//! event (a winning line found across the board grid itself).

use gridcast_protocol::{BoardId, Game, Outcome};

/// In-place transitions for a hydrated [`Game`].
pub trait GameExt {
    /// Records the outcome of one board inside this game.
    ///
    /// Returns `true` if a board with that identity was found. Idempotent:
    /// replaying the same end rewrites the same fields.
    fn end_board(
        &mut self,
        board: BoardId,
        outcome: Outcome,
        winning_line: Option<[usize; 3]>,
    ) -> bool;

    /// Records the aggregate outcome: the game as a whole is over.
    ///
    /// `winning_line` holds board indices, not cell indices.
    fn finish(
        &mut self,
        outcome: Outcome,
        winning_line: Option<Vec<usize>>,
        winner_username: Option<String>,
    );

    /// Whether the aggregate outcome has been decided.
    fn is_finished(&self) -> bool;

    /// The ids of all boards in this game already known to be ended.
    ///
    /// Callers use this to suppress outbound moves (and late client-side
    /// updates) against boards whose end has already been announced.
    fn ended_boards(&self) -> Vec<BoardId>;
}

impl GameExt for Game {
    fn end_board(
        &mut self,
        board: BoardId,
        outcome: Outcome,
        winning_line: Option<[usize; 3]>,
    ) -> bool {
        match self.boards.iter_mut().find(|entry| entry.id == board) {
            Some(entry) => {
                entry.winner = Some(outcome);
                entry.winning_line = winning_line;
                true
            }
            None => false,
        }
    }

    fn finish(
        &mut self,
        outcome: Outcome,
        winning_line: Option<Vec<usize>>,
        winner_username: Option<String>,
    ) {
        self.winner = Some(outcome);
        self.winning_line = winning_line;
        self.winner_username = winner_username;
    }

    fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    fn ended_boards(&self) -> Vec<BoardId> {
        self.boards
            .iter()
            .filter(|entry| entry.is_finished())
            .map(|entry| entry.id)
            .collect()
    }
}
