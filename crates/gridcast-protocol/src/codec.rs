//! Codec strategies for the two deployed wire shapes.
//!
//! The service has shipped with two otherwise-equivalent encodings:
//!
//! - [`PackedCodec`] — positional msgpack. A frame is a bare integer or an
//!   array of fields; the event type is inferred from the shape.
//! - [`TaggedCodec`] — tagged JSON. A frame is a `[tag, payload]` pair with
//!   a single-letter string tag.
//!
//! Exactly one strategy is active per deployment, selected at construction.
//! The transport and the reducer are agnostic to which one is in use: both
//! strategies classify through a common [`serde_json::Value`] representation
//! and produce the same [`ServerEvent`]s, so the shape rules live in one
//! place and stay total.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{Cell, Piece};
use crate::{BoardId, ClientCommand, Game, Outcome, ProtocolError, ServerEvent};

/// Sentinel first field marking a viewer-count frame in the positional shape.
const VIEWER_COUNT_SENTINEL: i64 = -1;

/// A codec that decodes server frames and encodes client commands.
///
/// Server push is decode-only; [`encode`](Self::encode) exists for
/// client-originated messages. A decode error refers to the single frame
/// only and must never tear down the connection.
pub trait WireCodec: Send + Sync + 'static {
    /// Decodes one raw frame into a typed event.
    ///
    /// # Errors
    /// Returns `ProtocolError` if the bytes are not valid for this
    /// strategy's format, or parse but match no known frame shape.
    fn decode(&self, data: &[u8]) -> Result<ServerEvent, ProtocolError>;

    /// Encodes one client command into a raw frame.
    ///
    /// # Errors
    /// Returns `ProtocolError` if serialization fails.
    fn encode(&self, command: &ClientCommand) -> Result<Vec<u8>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// PackedCodec — positional msgpack
// ---------------------------------------------------------------------------

/// Positional msgpack codec.
///
/// Server frames, classified structurally:
///
/// ```text
/// 7                    board 7 created
/// [-1, 1523]           viewer count is 1523
/// [7, 4, 1]            board 7, square 4 is now X
/// [7, [0,0,1,...]]     board 7, full cell array
/// [7, 1, [0, 4, 8]]    board 7 ended, X won on 0-4-8
/// [7, 0, []]           board 7 ended in a draw
/// [nil, 1, [0, 1, 2]]  the whole game ended, X won boards 0-1-2
/// [{...}, {...}]       history snapshot (array of game objects)
/// {code, message}      username-registration ack
/// ```
///
/// Client frames are opcode-led arrays: `[0, game, board, square, piece]`
/// for a move, `[1, username]`, `[2, slug]`.
#[cfg(feature = "packed")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedCodec;

#[cfg(feature = "packed")]
impl WireCodec for PackedCodec {
    fn decode(&self, data: &[u8]) -> Result<ServerEvent, ProtocolError> {
        let value: Value = rmp_serde::from_slice(data)?;
        classify_positional(value)
    }

    fn encode(&self, command: &ClientCommand) -> Result<Vec<u8>, ProtocolError> {
        let value = match command {
            ClientCommand::Move {
                game,
                board,
                square,
                piece,
            } => serde_json::json!([0, game.0, board.0, square, piece.to_wire()]),
            ClientCommand::RequestUsername { username } => {
                serde_json::json!([1, username])
            }
            ClientCommand::Emote { slug } => serde_json::json!([2, slug]),
        };
        Ok(rmp_serde::to_vec(&value)?)
    }
}

// ---------------------------------------------------------------------------
// TaggedCodec — tagged JSON
// ---------------------------------------------------------------------------

/// Tagged JSON codec.
///
/// Server frames are `[tag, payload]` pairs:
///
/// ```text
/// ["c", 7]                 board 7 created
/// ["u", [7, 4, 1]]         board 7, square 4 is now X
/// ["u", [7, [0,0,1,...]]]  board 7, full cell array
/// ["e", [7, 1, [0,4,8]]]   board 7 ended, X won on 0-4-8
/// ["e", [null, 1, [0,1,2]]]  the whole game ended, X won boards 0-1-2
/// ["v", 1523]              viewer count is 1523
/// ["h", [{...}, ...]]      history snapshot
/// ["a", {code, message}]   username-registration ack
/// ```
///
/// Client frames: `["m", [game, board, square, piece]]`, `["n", username]`,
/// `["x", slug]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedCodec;

impl WireCodec for TaggedCodec {
    fn decode(&self, data: &[u8]) -> Result<ServerEvent, ProtocolError> {
        let value: Value = serde_json::from_slice(data)?;
        let Value::Array(parts) = value else {
            return Err(ProtocolError::Malformed(
                "tagged frame must be an array".into(),
            ));
        };
        let mut parts = parts.into_iter();
        let (Some(Value::String(tag)), Some(payload), None) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProtocolError::Malformed(
                "tagged frame must be [tag, payload]".into(),
            ));
        };

        match tag.as_str() {
            "c" => Ok(ServerEvent::BoardCreated {
                board: board_id(&payload)?,
            }),
            "u" => classify_update(payload),
            "e" => classify_end(payload),
            "v" => Ok(ServerEvent::ViewerCount {
                count: unsigned(&payload, "viewer count")?,
            }),
            "h" => classify_history(payload),
            "a" => classify_ack(payload),
            other => Err(ProtocolError::Malformed(format!("unknown tag {other:?}"))),
        }
    }

    fn encode(&self, command: &ClientCommand) -> Result<Vec<u8>, ProtocolError> {
        let value = match command {
            ClientCommand::Move {
                game,
                board,
                square,
                piece,
            } => serde_json::json!(["m", [game.0, board.0, *square as u32, piece.to_wire() as u32]]),
            ClientCommand::RequestUsername { username } => {
                serde_json::json!(["n", username])
            }
            ClientCommand::Emote { slug } => serde_json::json!(["x", slug]),
        };
        Ok(serde_json::to_vec(&value)?)
    }
}

// ---------------------------------------------------------------------------
// Shared structural classification
// ---------------------------------------------------------------------------

/// Classifies a positional frame by shape alone.
fn classify_positional(value: Value) -> Result<ServerEvent, ProtocolError> {
    match value {
        Value::Number(_) => Ok(ServerEvent::BoardCreated {
            board: board_id(&value)?,
        }),
        Value::Object(_) => classify_ack(value),
        Value::Array(parts) => {
            if parts.first().is_some_and(Value::is_object) {
                return classify_history(Value::Array(parts));
            }
            if parts.first().and_then(Value::as_i64) == Some(VIEWER_COUNT_SENTINEL) {
                let count = parts
                    .get(1)
                    .ok_or_else(|| {
                        ProtocolError::Malformed("viewer-count frame missing count".into())
                    })
                    .and_then(|part| unsigned(part, "viewer count"))?;
                return Ok(ServerEvent::ViewerCount { count });
            }
            match parts.len() {
                // An array third field marks an end frame; a scalar third
                // field (or no third field) is an update.
                3 if parts[2].is_array() => classify_end(Value::Array(parts)),
                2 | 3 => classify_update(Value::Array(parts)),
                arity => Err(ProtocolError::Malformed(format!(
                    "positional frame has arity {arity}"
                ))),
            }
        }
        other => Err(ProtocolError::Malformed(format!(
            "unclassifiable frame: {other}"
        ))),
    }
}

/// Classifies an update payload: `[id, position, piece]` or the
/// full-position variant `[id, [c0..c8]]`.
fn classify_update(payload: Value) -> Result<ServerEvent, ProtocolError> {
    let Value::Array(parts) = payload else {
        return Err(ProtocolError::Malformed(
            "update payload must be an array".into(),
        ));
    };
    match parts.as_slice() {
        [id, cells @ Value::Array(_)] => Ok(ServerEvent::BoardSnapshot {
            board: board_id(id)?,
            positions: cell_array(cells)?,
        }),
        [id, position, piece] => {
            let position = square_index(position)?;
            let piece = Piece::from_wire(unsigned(piece, "piece")?).ok_or_else(|| {
                ProtocolError::Malformed(format!("invalid piece in update: {piece}"))
            })?;
            Ok(ServerEvent::BoardUpdated {
                board: board_id(id)?,
                position,
                piece,
            })
        }
        _ => Err(ProtocolError::Malformed(
            "update payload must be [id, position, piece] or [id, cells]".into(),
        )),
    }
}

/// Classifies an end payload: `[id, winner, line]` where `line` is a
/// 3-element array or empty for a draw. A null id means the whole game
/// ended, not a single board.
fn classify_end(payload: Value) -> Result<ServerEvent, ProtocolError> {
    let Value::Array(parts) = payload else {
        return Err(ProtocolError::Malformed(
            "end payload must be an array".into(),
        ));
    };
    let [id, winner, line] = parts.as_slice() else {
        return Err(ProtocolError::Malformed(
            "end payload must be [id, winner, line]".into(),
        ));
    };
    let outcome = Outcome::from_wire(unsigned(winner, "winner")?)
        .ok_or_else(|| ProtocolError::Malformed(format!("invalid winner value: {winner}")))?;
    let winning_line = line_indices(line)?;
    if id.is_null() {
        return Ok(ServerEvent::GameEnded {
            outcome,
            winning_line: winning_line.map(|indices| indices.to_vec()),
        });
    }
    Ok(ServerEvent::BoardEnded {
        board: board_id(id)?,
        outcome,
        winning_line,
    })
}

fn classify_history(payload: Value) -> Result<ServerEvent, ProtocolError> {
    let games = Vec::<Game>::deserialize(payload)?;
    Ok(ServerEvent::History { games })
}

fn classify_ack(payload: Value) -> Result<ServerEvent, ProtocolError> {
    #[derive(Deserialize)]
    struct Ack {
        code: u16,
        message: String,
    }
    let ack = Ack::deserialize(payload)?;
    Ok(ServerEvent::Ack {
        code: ack.code,
        message: ack.message,
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn unsigned(value: &Value, field: &str) -> Result<u64, ProtocolError> {
    value
        .as_u64()
        .ok_or_else(|| ProtocolError::Malformed(format!("{field} must be a non-negative integer")))
}

fn board_id(value: &Value) -> Result<BoardId, ProtocolError> {
    let raw = unsigned(value, "board id")?;
    u32::try_from(raw)
        .map(BoardId)
        .map_err(|_| ProtocolError::Malformed(format!("board id out of range: {raw}")))
}

fn square_index(value: &Value) -> Result<usize, ProtocolError> {
    let raw = unsigned(value, "square index")?;
    if raw < 9 {
        Ok(raw as usize)
    } else {
        Err(ProtocolError::Malformed(format!(
            "square index out of range: {raw}"
        )))
    }
}

fn cell_array(value: &Value) -> Result<[Cell; 9], ProtocolError> {
    let Value::Array(raw) = value else {
        return Err(ProtocolError::Malformed("cells must be an array".into()));
    };
    if raw.len() != 9 {
        return Err(ProtocolError::Malformed(format!(
            "expected 9 cells, got {}",
            raw.len()
        )));
    }
    let mut positions = [None; 9];
    for (slot, part) in positions.iter_mut().zip(raw) {
        let wire = unsigned(part, "cell")?;
        *slot = match wire {
            0 => None,
            other => Some(Piece::from_wire(other).ok_or_else(|| {
                ProtocolError::Malformed(format!("invalid cell value {other}"))
            })?),
        };
    }
    Ok(positions)
}

fn line_indices(value: &Value) -> Result<Option<[usize; 3]>, ProtocolError> {
    let Value::Array(raw) = value else {
        return Err(ProtocolError::Malformed(
            "winning line must be an array".into(),
        ));
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let indices: Vec<usize> = raw
        .iter()
        .map(square_index)
        .collect::<Result<_, _>>()?;
    let [a, b, c] = indices.as_slice() else {
        return Err(ProtocolError::Malformed(format!(
            "winning line must have 3 indices, got {}",
            indices.len()
        )));
    };
    Ok(Some([*a, *b, *c]))
}

// =========================================================================
// Tests
// =========================================================================
