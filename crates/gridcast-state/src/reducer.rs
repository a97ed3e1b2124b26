//! The boards reducer: one inbound action, one new slot map.

use std::collections::BTreeMap;

use gridcast_protocol::{Board, BoardId, Cell, Game, Outcome, Piece};

use crate::SlotAllocator;

/// A bounded mapping from display slot index to the board occupying it.
///
/// Consumers must treat every map returned by [`reduce`] as immutable;
/// each transition produces a structurally distinct value, so a pointer
/// or version comparison is enough for change detection.
pub type SlotMap = BTreeMap<usize, Board>;

/// One state-transition request against the slot map.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardsAction {
    /// Replace the whole map from a history snapshot: one slot per board,
    /// indexed by the board's position in `game.boards`. The allocator is
    /// not consulted.
    Initialize { game: Game },
    /// A new board started; allocate it a slot, evicting any occupant.
    Create { board: BoardId, capacity: usize },
    /// One square changed on the board with this identity.
    UpdateSquare {
        board: BoardId,
        position: usize,
        piece: Piece,
    },
    /// Full-position variant of an update.
    Snapshot {
        board: BoardId,
        positions: [Cell; 9],
    },
    /// The board with this identity reached its outcome.
    EndBoard {
        board: BoardId,
        outcome: Outcome,
        winning_line: Option<[usize; 3]>,
    },
    /// Drop everything (fresh connection epoch).
    Reset,
}

/// Produces the next slot map from the current one and a single action.
///
/// Total by construction: an update or end for an identity no longer in
/// the map (already evicted by slot reuse, or never seen) is a no-op,
/// never an error and never a new entry. Lookup for updates and ends is
/// always by board identity, never by slot index, so a stale event cannot
/// corrupt a slot's newer occupant.
pub fn reduce(
    boards: &SlotMap,
    allocator: &mut SlotAllocator,
    action: BoardsAction,
) -> SlotMap {
    match action {
        BoardsAction::Initialize { game } => game
            .boards
            .into_iter()
            .enumerate()
            .collect(),

        BoardsAction::Create { board, capacity } => {
            let mut next = boards.clone();
            let slot = allocator.next_slot(capacity);
            if let Some(evicted) = next.insert(slot, Board::new(board)) {
                tracing::trace!(%board, slot, evicted = %evicted.id, "slot reused");
            }
            next
        }

        BoardsAction::UpdateSquare {
            board,
            position,
            piece,
        } => with_board(boards, board, |entry| {
            if position < entry.positions.len() {
                entry.positions[position] = Some(piece);
            }
            // An update arriving after a premature end marker means the
            // end was wrong. Clear it rather than show a finished board
            // still changing.
            entry.winner = None;
            entry.winning_line = None;
        }),

        BoardsAction::Snapshot { board, positions } => {
            with_board(boards, board, |entry| {
                entry.positions = positions;
                entry.winner = None;
                entry.winning_line = None;
            })
        }

        BoardsAction::EndBoard {
            board,
            outcome,
            winning_line,
        } => with_board(boards, board, |entry| {
            entry.winner = Some(outcome);
            entry.winning_line = winning_line;
        }),

        BoardsAction::Reset => SlotMap::new(),
    }
}

/// Clones the map and applies `mutate` to the board with the given
/// identity, if any slot currently holds it.
fn with_board(
    boards: &SlotMap,
    id: BoardId,
    mutate: impl FnOnce(&mut Board),
) -> SlotMap {
    let mut next = boards.clone();
    match next.values_mut().find(|entry| entry.id == id) {
        Some(entry) => mutate(entry),
        None => {
            // Benign race: the board was evicted (or never created).
            tracing::trace!(board = %id, "dropping action for unknown board");
        }
    }
    next
}

// =========================================================================
// Tests
// =========================================================================
