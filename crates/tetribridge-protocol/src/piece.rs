use serde::{Deserialize, Serialize};

/// Enum representing the type of piece, in wire id order.
///
/// The emulator, the oracle, and the action-space encoding all identify
/// pieces by the ids `0..=6` in the order `T J Z O S L I`. Adjacency tables
/// are indexed by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// T-piece.
    T = 0,
    /// J-piece.
    J = 1,
    /// Z-piece.
    Z = 2,
    /// O-piece.
    O = 3,
    /// S-piece.
    S = 4,
    /// L-piece.
    L = 5,
    /// I-piece.
    I = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    /// All piece kinds in wire id order.
    pub const ALL: [Self; Self::LEN] = [
        PieceKind::T,
        PieceKind::J,
        PieceKind::Z,
        PieceKind::O,
        PieceKind::S,
        PieceKind::L,
        PieceKind::I,
    ];

    /// Parses a wire piece id.
    #[must_use]
    pub const fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(PieceKind::T),
            1 => Some(PieceKind::J),
            2 => Some(PieceKind::Z),
            3 => Some(PieceKind::O),
            4 => Some(PieceKind::S),
            5 => Some(PieceKind::L),
            6 => Some(PieceKind::I),
            _ => None,
        }
    }

    /// Returns the wire id of this piece kind.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the single character representation of this piece kind.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::T => 'T',
            PieceKind::J => 'J',
            PieceKind::Z => 'Z',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::L => 'L',
            PieceKind::I => 'I',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_id_round_trip() {
        for id in 0..7 {
            let kind = PieceKind::from_u8(id).unwrap();
            assert_eq!(kind.as_u8(), id);
        }
        assert_eq!(PieceKind::from_u8(7), None);
        assert_eq!(PieceKind::from_u8(0xFF), None);
    }

    #[test]
    fn test_id_order_is_tjzosli() {
        let chars: String = PieceKind::ALL.iter().map(|k| k.as_char()).collect();
        assert_eq!(chars, "TJZOSLI");
    }
}
