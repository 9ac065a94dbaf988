//! Game snapshot types consumed by the prover.
//!
//! A [`GameSnapshot`] is the minimal position data the proving pipeline needs:
//! the compact board encoding, the last move played, a monotonically increasing
//! move counter, the side to move, and a status tag. The core treats snapshots
//! as read-only input owned by the caller.

use serde::{Deserialize, Serialize};

use crate::error::ProverError;

/// A square on the board, encoded rank-major as `rank * 8 + file` in `0..64`.
///
/// The prover program receives squares as raw indices via the `FROM_SQUARE` and
/// `TO_SQUARE` environment variables; this newtype keeps the index validated
/// from construction onward.
///
/// # Examples
///
/// ```
/// use gambit_prover::Square;
///
/// let e2 = Square::from_algebraic("e2").unwrap();
/// assert_eq!(e2.index(), 12);
/// assert_eq!(e2.to_algebraic(), "e2");
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Square(u8);

impl Square {
    /// Number of squares on the board.
    pub const COUNT: u8 = 64;

    /// Creates a square from a raw rank-major index.
    ///
    /// Returns `None` if the index is out of bounds.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Parses algebraic notation like `"e2"` into a square.
    #[must_use]
    pub fn from_algebraic(notation: &str) -> Option<Self> {
        let bytes = notation.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].checked_sub(b'a')?;
        let rank = bytes[1].checked_sub(b'1')?;
        if file >= 8 || rank >= 8 {
            return None;
        }
        Some(Self(rank * 8 + file))
    }

    /// The raw rank-major index in `0..64`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The rank (row) in `0..8`, rank 0 being the white back rank.
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// The file (column) in `0..8`, file 0 being the a-file.
    #[inline]
    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Renders the square in algebraic notation.
    #[must_use]
    pub fn to_algebraic(self) -> String {
        let file = char::from(b'a' + self.file());
        let rank = char::from(b'1' + self.rank());
        format!("{}{}", file, rank)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

/// The side to move.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// White to move.
    White,
    /// Black to move.
    Black,
}

/// Status of the game the snapshot was taken from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Game in progress.
    Active,
    /// Side to move is in check.
    Check,
    /// Game over by checkmate.
    Checkmate,
    /// Game over by draw.
    Draw,
}

/// The last move played: origin, destination, and an optional captured-piece
/// tag (for example `"p"` for a captured pawn).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveDescriptor {
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Captured piece tag, if the move was a capture.
    pub captured: Option<String>,
}

/// The projection of a snapshot that the guest program actually consumes:
/// raw square indices plus the move counter.
///
/// Passed to the external prover via the `FROM_SQUARE`, `TO_SQUARE` and
/// `MOVE_NUMBER` environment variables, and committed back out as public
/// outputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitInput {
    /// Origin square index, `0..64`.
    pub from_square: u8,
    /// Destination square index, `0..64`.
    pub to_square: u8,
    /// One-based move counter.
    pub move_number: u32,
}

impl CircuitInput {
    /// The validity predicate the guest program enforces: both squares in
    /// bounds, distinct, and a positive move number.
    #[must_use]
    pub const fn is_valid_move(&self) -> bool {
        self.from_square < Square::COUNT
            && self.to_square < Square::COUNT
            && self.from_square != self.to_square
            && self.move_number > 0
    }

    /// The additive checksum the guest program commits:
    /// `from + to + move_number`.
    #[must_use]
    pub const fn checksum(&self) -> u32 {
        self.from_square as u32 + self.to_square as u32 + self.move_number
    }
}

/// The minimal game-position data the prover consumes.
///
/// Owned by the caller and read-only to the core. The `move_number` is expected
/// to be positive and non-decreasing across snapshots of the same session; the
/// core validates positivity and leaves session-level monotonicity to the
/// caller's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Compact board position encoding (FEN or similar).
    pub fen: String,
    /// The move this proof attests to.
    pub last_move: MoveDescriptor,
    /// One-based move counter.
    pub move_number: u32,
    /// Side to move after the last move.
    pub side_to_move: Side,
    /// Game status after the last move.
    pub status: GameStatus,
}

impl GameSnapshot {
    /// Checks the structural invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ProverError::InvalidSnapshot`] if the move number is zero or
    /// the origin and destination squares coincide.
    pub fn validate(&self) -> Result<(), ProverError> {
        if self.move_number == 0 {
            return Err(ProverError::InvalidSnapshot {
                info: "move number must be positive".to_owned(),
            });
        }
        if self.last_move.from == self.last_move.to {
            return Err(ProverError::InvalidSnapshot {
                info: format!(
                    "origin and destination squares are both {}",
                    self.last_move.from
                ),
            });
        }
        Ok(())
    }

    /// Projects the snapshot onto the fields the guest program consumes.
    #[must_use]
    pub fn circuit_input(&self) -> CircuitInput {
        CircuitInput {
            from_square: self.last_move.from.index(),
            to_square: self.last_move.to.index(),
            move_number: self.move_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(from: &str, to: &str, move_number: u32) -> GameSnapshot {
        GameSnapshot {
            fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_owned(),
            last_move: MoveDescriptor {
                from: Square::from_algebraic(from).unwrap(),
                to: Square::from_algebraic(to).unwrap(),
                captured: None,
            },
            move_number,
            side_to_move: Side::Black,
            status: GameStatus::Active,
        }
    }

    #[test]
    fn square_roundtrip_all_64() {
        for index in 0..64 {
            let sq = Square::new(index).unwrap();
            assert_eq!(Square::from_algebraic(&sq.to_algebraic()), Some(sq));
        }
    }

    #[test]
    fn square_rejects_out_of_bounds() {
        assert!(Square::new(64).is_none());
        assert!(Square::from_algebraic("i1").is_none());
        assert!(Square::from_algebraic("a9").is_none());
        assert!(Square::from_algebraic("e22").is_none());
        assert!(Square::from_algebraic("").is_none());
    }

    #[test]
    fn rank_major_encoding() {
        // e2: file e = 4, rank 2 = 1, index = 1*8+4 = 12
        assert_eq!(Square::from_algebraic("e2").unwrap().index(), 12);
        // e4: 3*8+4 = 28
        assert_eq!(Square::from_algebraic("e4").unwrap().index(), 28);
        assert_eq!(Square::from_algebraic("a1").unwrap().index(), 0);
        assert_eq!(Square::from_algebraic("h8").unwrap().index(), 63);
    }

    #[test]
    fn validate_accepts_normal_move() {
        assert!(snapshot("e2", "e4", 1).validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_move_number() {
        let err = snapshot("e2", "e4", 0).validate().unwrap_err();
        assert!(matches!(err, ProverError::InvalidSnapshot { .. }));
    }

    #[test]
    fn validate_rejects_null_move() {
        let err = snapshot("e2", "e2", 1).validate().unwrap_err();
        assert!(matches!(err, ProverError::InvalidSnapshot { .. }));
    }

    #[test]
    fn circuit_input_projection() {
        let input = snapshot("e2", "e4", 3).circuit_input();
        assert_eq!(input.from_square, 12);
        assert_eq!(input.to_square, 28);
        assert_eq!(input.move_number, 3);
        assert!(input.is_valid_move());
        assert_eq!(input.checksum(), 12 + 28 + 3);
    }

    #[test]
    fn circuit_input_validity_predicate() {
        let valid = CircuitInput {
            from_square: 12,
            to_square: 28,
            move_number: 1,
        };
        assert!(valid.is_valid_move());

        let same_square = CircuitInput {
            from_square: 12,
            to_square: 12,
            move_number: 1,
        };
        assert!(!same_square.is_valid_move());

        let zero_move = CircuitInput {
            from_square: 12,
            to_square: 28,
            move_number: 0,
        };
        assert!(!zero_move.is_valid_move());
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snap = snapshot("g1", "f3", 2);
        let json = serde_json::to_string(&snap).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
