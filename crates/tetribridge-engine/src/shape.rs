use tetribridge_protocol::PieceKind;

/// Cell offsets of a piece relative to its anchor, as `(row, column)`
/// deltas.
pub(crate) type Cells = [(i8, i8); 4];

/// Number of distinct orientations per piece kind, in wire id order
/// (T J Z O S L I).
pub(crate) const DISTINCT_ROTATIONS: [u8; PieceKind::LEN] = [4, 4, 2, 1, 2, 4, 2];

/// Cell offsets for the given piece and rotation id.
///
/// Rotation ids wrap over the distinct orientation count, so symmetric
/// pieces accept any id in `0..4`.
pub(crate) fn cells(kind: PieceKind, rotation: u8) -> Cells {
    let distinct = DISTINCT_ROTATIONS[kind.as_u8() as usize];
    SHAPES[kind.as_u8() as usize][(rotation % distinct) as usize]
}

/// Clockwise presses needed to reach `rotation` from spawn: one per step,
/// except a single counter-clockwise press for the last orientation of
/// four-state pieces.
pub(crate) fn rotation_presses(kind: PieceKind, rotation: u8) -> (u8, bool) {
    let distinct = DISTINCT_ROTATIONS[kind.as_u8() as usize];
    let steps = rotation % distinct;
    if distinct == 4 && steps == 3 {
        (1, true)
    } else {
        (steps, false)
    }
}

/// Rotates a shape 90 degrees clockwise around its anchor.
const fn rotate_cw(cells: Cells) -> Cells {
    let mut rotated = [(0_i8, 0_i8); 4];
    let mut i = 0;
    while i < 4 {
        let (row, column) = cells[i];
        rotated[i] = (column, -row);
        i += 1;
    }
    rotated
}

/// Generates all four orientations of a spawn shape.
const fn shape_rotations(spawn: Cells) -> [Cells; 4] {
    let mut rotations = [spawn; 4];
    let mut i = 1;
    while i < 4 {
        rotations[i] = rotate_cw(rotations[i - 1]);
        i += 1;
    }
    rotations
}

const SHAPES: [[Cells; 4]; PieceKind::LEN] = [
    // T
    shape_rotations([(0, -1), (0, 0), (0, 1), (1, 0)]),
    // J
    shape_rotations([(0, -1), (0, 0), (0, 1), (1, 1)]),
    // Z
    shape_rotations([(0, -1), (0, 0), (1, 0), (1, 1)]),
    // O
    shape_rotations([(0, -1), (0, 0), (1, -1), (1, 0)]),
    // S
    shape_rotations([(0, 0), (0, 1), (1, -1), (1, 0)]),
    // L
    shape_rotations([(0, -1), (0, 0), (0, 1), (1, -1)]),
    // I
    shape_rotations([(0, -2), (0, -1), (0, 0), (0, 1)]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells_with_anchor() {
        for kind in PieceKind::ALL {
            for rotation in 0..4 {
                let shape = cells(kind, rotation);
                assert_eq!(shape.len(), 4);
                assert!(shape.contains(&(0, 0)), "{kind:?} r{rotation} lost anchor");
            }
        }
    }

    #[test]
    fn test_four_clockwise_rotations_are_identity() {
        let spawn = SHAPES[0][0];
        let back = rotate_cw(rotate_cw(rotate_cw(rotate_cw(spawn))));
        assert_eq!(back, spawn);
    }

    #[test]
    fn test_symmetric_pieces_wrap() {
        assert_eq!(cells(PieceKind::Z, 0), cells(PieceKind::Z, 2));
        assert_eq!(cells(PieceKind::O, 1), cells(PieceKind::O, 0));
        assert_eq!(cells(PieceKind::I, 3), cells(PieceKind::I, 1));
        assert_ne!(cells(PieceKind::T, 1), cells(PieceKind::T, 3));
    }

    #[test]
    fn test_rotation_presses() {
        assert_eq!(rotation_presses(PieceKind::T, 0), (0, false));
        assert_eq!(rotation_presses(PieceKind::T, 2), (2, false));
        // The last orientation of a four-state piece is one press the
        // other way.
        assert_eq!(rotation_presses(PieceKind::T, 3), (1, true));
        assert_eq!(rotation_presses(PieceKind::Z, 3), (1, false));
        assert_eq!(rotation_presses(PieceKind::O, 3), (0, false));
    }
}
