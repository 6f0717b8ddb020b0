use arrayvec::ArrayVec;

use tetribridge_agent::{GameEngine, Observation};
use tetribridge_protocol::{AdjacencyTable, Buttons, InputSequence, PieceKind, Strategy};

use crate::{
    board::{BOARD_HEIGHT, BOARD_WIDTH, Board},
    shape,
};

/// Column a piece's anchor spawns in.
pub const SPAWN_COLUMN: u8 = 5;

/// Frames of input the emulator has already committed to when a premoved
/// piece's completion arrives. Input past this window can still be
/// adjusted once the next piece is revealed.
pub const ADJ_DELAY_FRAMES: usize = 18;

/// Length of the observation feature vector: board cells, current and
/// next one-hot identities, and the scaled line count.
pub const FEATURE_LEN: usize = BOARD_WIDTH * BOARD_HEIGHT + 2 * PieceKind::LEN + 1;

/// Line cap of the fixed-goal ruleset, used to scale the line feature.
const LINE_SCALE: f32 = 430.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PremoveState {
    /// No speculative motion in progress.
    Idle,
    /// `adjacency_premove` was issued; the next applied placement is the
    /// intermediate position, not a lock.
    Armed,
    /// The current piece is committed to its premove prefix and awaits the
    /// completing placement.
    InFlight,
}

/// Owned game-state replica: board, line count, piece queue, and the
/// premove bookkeeping required by the session's speculation protocol.
#[derive(Debug, Clone)]
pub struct Replica {
    board: Board,
    lines: u32,
    current: PieceKind,
    next: Option<PieceKind>,
    over: bool,
    premove: PremoveState,
}

impl Default for Replica {
    fn default() -> Self {
        Self::new()
    }
}

impl Replica {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            board: Board::EMPTY,
            lines: 0,
            current: PieceKind::T,
            next: None,
            over: false,
            premove: PremoveState::Idle,
        }
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Synthesizes the input stream realizing `strategy` for `kind`.
    ///
    /// Rotation presses and horizontal taps are issued together, one
    /// action per alternate frame (a release frame between presses), then
    /// the stream is padded with neutral frames to cover the drop: gravity
    /// is approximated as one row per frame.
    fn synthesize(kind: PieceKind, strategy: Strategy) -> InputSequence {
        let (presses, counter) = shape::rotation_presses(kind, strategy.rotation);
        let rotate = if counter { Buttons::B } else { Buttons::A };
        let delta = i16::from(strategy.column) - i16::from(SPAWN_COLUMN);
        let tap = if delta < 0 {
            Buttons::LEFT
        } else {
            Buttons::RIGHT
        };
        let taps = usize::from(delta.unsigned_abs());
        let presses = usize::from(presses);

        let actions = taps.max(presses);
        let mut frames: Vec<Buttons> = Vec::new();
        for k in 0..actions {
            let mut buttons = Buttons::NONE;
            if k < presses {
                buttons = buttons | rotate;
            }
            if k < taps {
                buttons = buttons | tap;
            }
            frames.push(buttons);
            if k + 1 < actions {
                frames.push(Buttons::NONE);
            }
        }
        let drop_frames = usize::from(strategy.row) + 1;
        while frames.len() < drop_frames {
            frames.push(Buttons::NONE);
        }
        frames.into()
    }

    /// The intermediate position reached after playing `prefix`, as a
    /// placement triple.
    ///
    /// This is bookkeeping for the premove protocol, not a resting cell:
    /// the replica records it without locking anything.
    fn premove_position(prefix: &InputSequence) -> Strategy {
        let mut rotation: u8 = 0;
        let mut column = i16::from(SPAWN_COLUMN);
        for buttons in prefix.frames() {
            if buttons.contains(Buttons::A) {
                rotation = (rotation + 1) % 4;
            }
            if buttons.contains(Buttons::B) {
                rotation = (rotation + 3) % 4;
            }
            if buttons.contains(Buttons::LEFT) {
                column -= 1;
            }
            if buttons.contains(Buttons::RIGHT) {
                column += 1;
            }
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let column = column.clamp(0, 9) as u8;
        #[expect(clippy::cast_possible_truncation)]
        let row = prefix.len().min(BOARD_HEIGHT - 1) as u8;
        Strategy::new(rotation, row, column)
    }

    fn observation_with_next(&self, next: Option<PieceKind>) -> Observation {
        let mut features = Vec::with_capacity(FEATURE_LEN);
        features.extend(
            self.board
                .cells()
                .map(|occupied| if occupied { 1.0 } else { 0.0 }),
        );
        for kind in PieceKind::ALL {
            features.push(if kind == self.current { 1.0 } else { 0.0 });
        }
        for kind in PieceKind::ALL {
            features.push(if next == Some(kind) { 1.0 } else { 0.0 });
        }
        #[expect(clippy::cast_precision_loss)]
        features.push(self.lines as f32 / LINE_SCALE);
        features
    }

    /// Locks the current piece at `strategy`, clears lines, and promotes
    /// the piece queue. Overlap or out-of-bounds cells top the game out.
    fn lock(&mut self, strategy: Strategy) {
        let shape = shape::cells(self.current, strategy.rotation);
        let mut cells: ArrayVec<(usize, usize), 4> = ArrayVec::new();
        for (delta_row, delta_column) in shape {
            let row = i16::from(strategy.row) + i16::from(delta_row);
            let column = i16::from(strategy.column) + i16::from(delta_column);
            let (Ok(row), Ok(column)) = (usize::try_from(row), usize::try_from(column)) else {
                self.over = true;
                return;
            };
            if row >= BOARD_HEIGHT || column >= BOARD_WIDTH || self.board.is_occupied(row, column)
            {
                self.over = true;
                return;
            }
            cells.push((row, column));
        }
        for (row, column) in cells {
            self.board.occupy(row, column);
        }
        self.lines += u32::try_from(self.board.clear_full_rows()).unwrap_or(0);
        if let Some(next) = self.next.take() {
            self.current = next;
        }
    }
}

impl GameEngine for Replica {
    fn reset(&mut self, current: PieceKind, next: PieceKind) {
        *self = Self::new();
        self.current = current;
        self.next = Some(next);
    }

    fn lines(&self) -> u32 {
        self.lines
    }

    fn current_piece(&self) -> PieceKind {
        self.current
    }

    fn next_piece(&self) -> Option<PieceKind> {
        self.next
    }

    fn set_next_piece(&mut self, piece: PieceKind) {
        self.next = Some(piece);
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn board_bytes(&self) -> Vec<u8> {
        self.board.pack_bytes().to_vec()
    }

    fn observation(&self) -> Observation {
        self.observation_with_next(self.next)
    }

    fn adjacency_observations(&self, _strategy: Strategy) -> Vec<Observation> {
        // The premove prefix never mutates the locked board, so
        // conditioning on a committed premove reduces to fixing the next
        // identity.
        PieceKind::ALL
            .iter()
            .map(|&kind| self.observation_with_next(Some(kind)))
            .collect()
    }

    fn is_adjacency_free(&self, strategy: Strategy) -> bool {
        // Input that fits inside the premove window leaves nothing to
        // adjust once the next piece is revealed.
        Self::synthesize(self.current, strategy).len() <= ADJ_DELAY_FRAMES
    }

    fn sequence(&self, strategy: Strategy) -> InputSequence {
        Self::synthesize(self.current, strategy)
    }

    fn adjacency_premove(&mut self, table: &AdjacencyTable) -> (Strategy, InputSequence) {
        let sequences: ArrayVec<InputSequence, { PieceKind::LEN }> = table
            .iter()
            .map(|strategy| Self::synthesize(self.current, strategy))
            .collect();
        let shared = common_prefix_len(&sequences).min(ADJ_DELAY_FRAMES);
        let prefix: InputSequence = sequences[0].frames()[..shared].to_vec().into();
        let premove = Self::premove_position(&prefix);
        self.premove = PremoveState::Armed;
        (premove, prefix)
    }

    fn finish_adjacency_sequence(
        &self,
        prefix: &InputSequence,
        _premove: Strategy,
        target: Strategy,
    ) -> InputSequence {
        // For table-derived targets the full sequence shares the premove
        // prefix by construction; grafting keeps the prefix-extension
        // contract even for foreign targets.
        let full = Self::synthesize(self.current, target);
        let mut sequence = prefix.clone();
        for buttons in full.suffix_from(prefix.len()).frames() {
            sequence.push(*buttons);
        }
        sequence
    }

    fn apply_placement(&mut self, strategy: Strategy) {
        if self.over {
            return;
        }
        match self.premove {
            PremoveState::Armed => {
                self.premove = PremoveState::InFlight;
                return;
            }
            PremoveState::InFlight | PremoveState::Idle => {
                self.premove = PremoveState::Idle;
            }
        }
        self.lock(strategy);
    }
}

/// Length of the longest frame prefix shared by every sequence.
fn common_prefix_len(sequences: &[InputSequence]) -> usize {
    let Some(first) = sequences.first() else {
        return 0;
    };
    let mut shared = sequences
        .iter()
        .map(InputSequence::len)
        .min()
        .unwrap_or(0);
    for sequence in &sequences[1..] {
        for (i, (a, b)) in first
            .frames()
            .iter()
            .zip(sequence.frames())
            .enumerate()
            .take(shared)
        {
            if a != b {
                shared = i;
                break;
            }
        }
    }
    shared
}
