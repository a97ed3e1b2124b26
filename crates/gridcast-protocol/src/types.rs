//! Domain types for the Gridcast wire protocol.
//!
//! Everything here either travels on the wire directly (history snapshots
//! serialize [`Board`] and [`Game`] as JSON objects) or is the decoded,
//! typed form of a positional frame ([`ServerEvent`], [`ClientCommand`]).
//!
//! Wire numbering is shared by both codecs: a cell is `0` (empty), `1` (X)
//! or `2` (O); an outcome is `0` (draw), `1` (X won) or `2` (O won).

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-assigned identity of one board. Stable for the lifetime of that
/// game and never reused while any client still references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub u32);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B-{}", self.0)
    }
}

/// Identity of a game aggregate (a group of boards sharing one meta-outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u32);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pieces, cells, outcomes
// ---------------------------------------------------------------------------

/// One of the two playable pieces. Wire values: X = 1, O = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    X,
    O,
}

impl Piece {
    /// The piece that moves after this one.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Parses a wire value (`1` or `2`).
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::X),
            2 => Some(Self::O),
            _ => None,
        }
    }

    /// The wire value of this piece.
    pub fn to_wire(self) -> u8 {
        match self {
            Self::X => 1,
            Self::O => 2,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

impl Serialize for Piece {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Self::from_wire(value)
            .ok_or_else(|| D::Error::custom(format!("invalid piece value {value}")))
    }
}

/// One square on a board: empty or holding a piece.
pub type Cell = Option<Piece>;

fn cell_from_wire(value: u64) -> Option<Cell> {
    match value {
        0 => Some(None),
        other => Piece::from_wire(other).map(Some),
    }
}

fn cell_to_wire(cell: Cell) -> u8 {
    cell.map_or(0, Piece::to_wire)
}

/// The decided result of a board or a game. Wire values: draw = 0,
/// X won = 1, O won = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Draw,
    Won(Piece),
}

impl Outcome {
    /// Parses a wire value (`0`, `1` or `2`).
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Draw),
            other => Piece::from_wire(other).map(Self::Won),
        }
    }

    /// The wire value of this outcome.
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Draw => 0,
            Self::Won(piece) => piece.to_wire(),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Self::from_wire(value)
            .ok_or_else(|| D::Error::custom(format!("invalid outcome value {value}")))
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One 3×3 grid instance.
///
/// Once `winner` is set the board is complete: `positions` and
/// `winning_line` must not change again. The reducer's defensive clear on
/// square updates is the single sanctioned exception, guarding against an
/// end frame that arrived before its final update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Server-assigned identity.
    pub id: BoardId,
    /// The nine cells in row-major order.
    #[serde(with = "cells")]
    pub positions: [Cell; 9],
    /// Unset while in progress; set exactly once when the board ends.
    #[serde(default)]
    pub winner: Option<Outcome>,
    /// The three cell indices of the winning triple. Unset unless
    /// `winner` is `Won(_)`; an empty array on the wire means unset.
    #[serde(default, with = "winning_line")]
    pub winning_line: Option<[usize; 3]>,
}

impl Board {
    /// A fresh, all-empty board with no outcome.
    pub fn new(id: BoardId) -> Self {
        Self {
            id,
            positions: [None; 9],
            winner: None,
            winning_line: None,
        }
    }

    /// Whether this board has a decided outcome.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }
}

/// Serde adapter: cells travel as plain integers (`0 | 1 | 2`), not as
/// JSON nulls.
mod cells {
    use super::{cell_from_wire, cell_to_wire, Cell};
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        positions: &[Cell; 9],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(9))?;
        for cell in positions {
            seq.serialize_element(&cell_to_wire(*cell))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[Cell; 9], D::Error> {
        let raw = Vec::<u64>::deserialize(deserializer)?;
        if raw.len() != 9 {
            return Err(D::Error::custom(format!(
                "expected 9 cells, got {}",
                raw.len()
            )));
        }
        let mut positions = [None; 9];
        for (slot, value) in positions.iter_mut().zip(raw) {
            *slot = cell_from_wire(value)
                .ok_or_else(|| D::Error::custom(format!("invalid cell value {value}")))?;
        }
        Ok(positions)
    }
}

/// Serde adapter: the service sends `null` or `[]` for "no winning line"
/// and a 3-element array otherwise.
mod winning_line {
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        line: &Option<[usize; 3]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match line {
            Some(indices) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                for index in indices {
                    seq.serialize_element(index)?;
                }
                seq.end()
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[usize; 3]>, D::Error> {
        match Option::<Vec<usize>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) if raw.len() == 3 => Ok(Some([raw[0], raw[1], raw[2]])),
            Some(raw) => Err(D::Error::custom(format!(
                "winning line must have 3 indices, got {}",
                raw.len()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Game aggregate
// ---------------------------------------------------------------------------

/// A group of boards sharing one meta-outcome.
///
/// Created from a server-sent history snapshot; mutated in place by
/// per-board end events and one final aggregate end event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub boards: Vec<Board>,
    /// The meta-outcome, decided when a winning line is found across
    /// the board grid itself.
    #[serde(default)]
    pub winner: Option<Outcome>,
    /// Board indices (not cell indices) forming the meta winning line.
    #[serde(default)]
    pub winning_line: Option<Vec<usize>>,
    /// Which piece moves next.
    pub next_piece: Piece,
    #[serde(default)]
    pub winner_username: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoded server push
// ---------------------------------------------------------------------------

/// One decoded server-pushed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new board started; it arrives all-empty.
    BoardCreated { board: BoardId },
    /// One square of a board changed.
    BoardUpdated {
        board: BoardId,
        position: usize,
        piece: Piece,
    },
    /// Full-position variant of an update: the entire cell array.
    BoardSnapshot {
        board: BoardId,
        positions: [Cell; 9],
    },
    /// A board reached its outcome. `winning_line` is `None` for a draw.
    BoardEnded {
        board: BoardId,
        outcome: Outcome,
        winning_line: Option<[usize; 3]>,
    },
    /// The whole game reached its outcome (an end frame with a null board
    /// id). `winning_line` holds board indices, not cell indices.
    GameEnded {
        outcome: Outcome,
        winning_line: Option<Vec<usize>>,
    },
    /// The number of connected viewers changed.
    ViewerCount { count: u64 },
    /// Hydration snapshot of past and current games.
    History { games: Vec<Game> },
    /// Acknowledgement of a username registration request.
    Ack { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Client-originated messages
// ---------------------------------------------------------------------------

/// One client-originated message. Fire-and-forget except for
/// [`RequestUsername`](Self::RequestUsername), which is answered by a
/// [`ServerEvent::Ack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Submit a move on one square of one board.
    Move {
        game: GameId,
        board: BoardId,
        square: usize,
        piece: Piece,
    },
    /// Register a display name for this connection.
    RequestUsername { username: String },
    /// Send an emote by slug.
    Emote { slug: String },
}

// =========================================================================
// Tests
// =========================================================================
