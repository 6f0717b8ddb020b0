use tetribridge_protocol::{AdjacencyTable, InputSequence, PieceKind, Strategy};

use crate::estimator::Observation;

/// The board/placement simulation and input-sequence synthesizer, consumed
/// as a trusted black box.
///
/// Each session exclusively owns one instance as its game-state replica;
/// implementations need no interior synchronization.
///
/// # Premove protocol
///
/// A placement returned by [`adjacency_premove`](Self::adjacency_premove)
/// is an *intermediate* position: applying it commits the current piece to
/// the common motion prefix without locking it. The engine must accept the
/// subsequent [`apply_placement`](Self::apply_placement) of a table entry
/// as the completion of that same piece.
pub trait GameEngine {
    /// Reinitializes the replica for a new game with the first two piece
    /// identities.
    fn reset(&mut self, current: PieceKind, next: PieceKind);

    /// Total lines cleared so far in this game.
    fn lines(&self) -> u32;

    /// The piece currently falling (or premoving).
    fn current_piece(&self) -> PieceKind;

    /// The upcoming piece, when its identity has been revealed.
    fn next_piece(&self) -> Option<PieceKind>;

    /// Records the identity revealed by a confirmation message.
    fn set_next_piece(&mut self, piece: PieceKind);

    /// Whether the game has reached a terminal board state.
    fn is_over(&self) -> bool;

    /// Raw board bytes, forwarded verbatim in oracle queries.
    fn board_bytes(&self) -> Vec<u8>;

    /// Feature vector for the current state, for the policy estimator.
    fn observation(&self) -> Observation;

    /// Feature vectors for the 7 states reached by committing the premove
    /// of `strategy` and assuming each possible next-piece identity in wire
    /// id order.
    fn adjacency_observations(&self, strategy: Strategy) -> Vec<Observation>;

    /// Whether `strategy` can be committed now with nothing left to adjust
    /// once the next piece is revealed.
    fn is_adjacency_free(&self, strategy: Strategy) -> bool;

    /// Full button sequence realizing `strategy` for the current piece.
    fn sequence(&self, strategy: Strategy) -> InputSequence;

    /// Intermediate placement and already-determined button prefix shared
    /// by every entry of `table`.
    fn adjacency_premove(&mut self, table: &AdjacencyTable) -> (Strategy, InputSequence);

    /// Completes a premoved piece: the full sequence reaching `target`
    /// through `premove`. The result always extends `prefix` exactly.
    fn finish_adjacency_sequence(
        &self,
        prefix: &InputSequence,
        premove: Strategy,
        target: Strategy,
    ) -> InputSequence;

    /// Applies a placement to the replica (intermediate or final, per the
    /// premove protocol above).
    fn apply_placement(&mut self, strategy: Strategy);
}
