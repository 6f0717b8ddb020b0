use std::{fmt, ops::Index};

use serde::{Deserialize, Serialize};

use crate::piece::PieceKind;

/// A target placement: final rotation and resting cell of the current piece.
///
/// On both wire protocols a strategy travels as three bytes in the order
/// `rotation, row, column`. The same triple is encoded into the discrete
/// action space as `rotation * 200 + row * 10 + column`, so rotation spans
/// 4 values, row 20, and column 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Strategy {
    pub rotation: u8,
    pub row: u8,
    pub column: u8,
}

impl Strategy {
    /// Size of the flat action space (4 rotations x 20 rows x 10 columns).
    pub const ACTION_SPACE: usize = 800;

    /// The oracle's "no valid move" sentinel.
    pub const NULL: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(rotation: u8, row: u8, column: u8) -> Self {
        Self {
            rotation,
            row,
            column,
        }
    }

    /// Decodes a flat action index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::ACTION_SPACE`.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn from_action(index: usize) -> Self {
        assert!(index < Self::ACTION_SPACE);
        Self {
            rotation: (index / 200) as u8,
            row: (index / 10 % 20) as u8,
            column: (index % 10) as u8,
        }
    }

    /// Returns the flat action index of this placement.
    #[must_use]
    pub fn action(self) -> usize {
        usize::from(self.rotation) * 200 + usize::from(self.row) * 10 + usize::from(self.column)
    }

    /// Wire encoding: `rotation, row, column`.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.rotation, self.row, self.column]
    }

    /// Wire decoding, accepting the bytes verbatim.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    /// Whether this is the oracle's no-move sentinel.
    #[must_use]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{:2},{})", self.rotation, self.row, self.column)
    }
}

/// One strategy per possible next-piece identity, indexed by wire piece id.
///
/// Used when the optimal placement of the current piece depends on which
/// piece arrives next. Always exactly [`PieceKind::LEN`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdjacencyTable([Strategy; PieceKind::LEN]);

impl AdjacencyTable {
    #[must_use]
    pub const fn new(strategies: [Strategy; PieceKind::LEN]) -> Self {
        Self(strategies)
    }

    /// The entry the oracle ranks first (its recommendation for the current
    /// piece irrespective of the next one).
    #[must_use]
    pub const fn top(&self) -> Strategy {
        self.0[0]
    }

    #[must_use]
    pub const fn as_array(&self) -> [Strategy; PieceKind::LEN] {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Strategy> + '_ {
        self.0.iter().copied()
    }
}

impl Index<PieceKind> for AdjacencyTable {
    type Output = Strategy;

    fn index(&self, piece: PieceKind) -> &Strategy {
        &self.0[piece.as_u8() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for index in 0..Strategy::ACTION_SPACE {
            assert_eq!(Strategy::from_action(index).action(), index);
        }
    }

    #[test]
    fn test_action_decomposition() {
        // 2 * 200 + 13 * 10 + 7
        assert_eq!(Strategy::from_action(537), Strategy::new(2, 13, 7));
        assert_eq!(Strategy::from_action(0), Strategy::NULL);
        assert_eq!(Strategy::from_action(799), Strategy::new(3, 19, 9));
    }

    #[test]
    #[should_panic(expected = "index < Self::ACTION_SPACE")]
    fn test_action_out_of_range_panics() {
        let _ = Strategy::from_action(800);
    }

    #[test]
    fn test_wire_bytes_round_trip() {
        let strategy = Strategy::new(1, 17, 4);
        assert_eq!(Strategy::from_bytes(strategy.to_bytes()), strategy);
        // Raw oracle bytes are accepted verbatim, even out of range.
        assert_eq!(
            Strategy::from_bytes([9, 200, 100]),
            Strategy::new(9, 200, 100)
        );
    }

    #[test]
    fn test_null_sentinel() {
        assert!(Strategy::NULL.is_null());
        assert!(!Strategy::new(0, 0, 1).is_null());
    }

    #[test]
    fn test_table_indexing() {
        let table = AdjacencyTable::new([
            Strategy::new(0, 18, 0),
            Strategy::new(1, 18, 1),
            Strategy::new(2, 18, 2),
            Strategy::new(3, 18, 3),
            Strategy::new(0, 18, 4),
            Strategy::new(1, 18, 5),
            Strategy::new(2, 18, 6),
        ]);
        assert_eq!(table.top(), Strategy::new(0, 18, 0));
        assert_eq!(table[PieceKind::T], Strategy::new(0, 18, 0));
        assert_eq!(table[PieceKind::I], Strategy::new(2, 18, 6));
        assert_eq!(table.iter().count(), PieceKind::LEN);
    }

    #[test]
    fn test_serde_round_trip() {
        let strategy = Strategy::new(3, 2, 9);
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(serde_json::from_str::<Strategy>(&json).unwrap(), strategy);
    }
}
