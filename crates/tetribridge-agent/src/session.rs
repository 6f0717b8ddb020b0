use std::io::{Read, Write};

use tetribridge_protocol::{
    AdjacencyTable, EmulatorMessage, InputSequence, PieceKind, Strategy,
};

use crate::{
    engine::GameEngine,
    selector::{Decision, DecisionReport, DecisionSelector, SelectError},
};

/// An output produced by a session transition.
///
/// The session performs no I/O itself: the connection loop frames
/// [`Effect::Sequence`] values onto the emulator link and renders the rest
/// for the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// An input sequence to frame and send (possibly empty).
    Sequence(InputSequence),
    /// Summary of a decision, one per consulted source.
    Report(DecisionReport),
    /// The emulator reported a placement that differs from the one this
    /// session applied. Non-fatal: the session drains from here on.
    Mismatch {
        reported: Strategy,
        expected: Option<Strategy>,
    },
}

/// Why a session stopped playing while keeping its connection alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    /// The game-state replica reached a terminal board state.
    GameOver,
    /// A confirmation contradicted the session's own record.
    ProtocolViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No game announced yet on this connection.
    AwaitingReset,
    /// Playing: a pending decision awaits each confirmation.
    Active,
    /// Terminal: every further confirmation gets one empty sequence and
    /// mutates nothing.
    Draining(DrainReason),
}

/// The at-most-one decision awaiting the next confirmation.
#[derive(Debug, Clone)]
enum Pending {
    None,
    /// Fully committed placement; the emulator already holds its complete
    /// sequence.
    Direct(Strategy),
    /// Speculative premove: the final placement depends on the next piece.
    Adjacent {
        premove: Strategy,
        prefix: InputSequence,
        table: AdjacencyTable,
    },
}

/// One emulator connection's state machine.
///
/// Owns the game-state replica exclusively; shares the estimator and the
/// oracle connection through the injected [`DecisionSelector`]. Each
/// decoded message becomes a single [`handle`](Self::handle) transition
/// returning the effects to perform, which keeps the whole lifecycle
/// testable without sockets.
pub struct Session<'a, E, S> {
    engine: E,
    selector: DecisionSelector<'a, S>,
    phase: Phase,
    pending: Pending,
    prev_placement: Option<Strategy>,
}

impl<'a, E: GameEngine, S: Read + Write> Session<'a, E, S> {
    pub fn new(engine: E, selector: DecisionSelector<'a, S>) -> Self {
        Self {
            engine,
            selector,
            phase: Phase::AwaitingReset,
            pending: Pending::None,
            prev_placement: None,
        }
    }

    /// Whether the session is in a terminal drain state.
    #[must_use]
    pub const fn is_draining(&self) -> bool {
        matches!(self.phase, Phase::Draining(_))
    }

    /// Applies one inbound message and returns the effects to perform, in
    /// order.
    ///
    /// An error is fatal for this session only (an oracle query died
    /// mid-flight); the caller ends the connection.
    pub fn handle(&mut self, message: &EmulatorMessage) -> Result<Vec<Effect>, SelectError> {
        let mut effects = Vec::new();
        match *message {
            EmulatorMessage::NewGame { current, next } => {
                self.engine.reset(current, next);
                self.phase = Phase::Active;
                self.pending = Pending::None;
                self.prev_placement = None;
                self.first_piece(next, &mut effects)?;
                self.premove(&mut effects)?;
            }
            EmulatorMessage::Placement { placement, next } => {
                self.confirm(placement, next, &mut effects)?;
            }
        }
        Ok(effects)
    }

    /// Places the very first piece of a game.
    ///
    /// Both piece identities are known at reset, so an adjacency decision
    /// resolves immediately: the premove is committed and the table entry
    /// for the known next piece completes it in the same breath. The
    /// emulator has received nothing for this piece yet, so the completed
    /// sequence is sent whole.
    fn first_piece(
        &mut self,
        next: PieceKind,
        effects: &mut Vec<Effect>,
    ) -> Result<(), SelectError> {
        let (decision, reports) = self.selector.select(&self.engine)?;
        effects.extend(reports.into_iter().map(Effect::Report));
        match decision {
            Decision::Single(strategy) => {
                let sequence = self.engine.sequence(strategy);
                self.engine.apply_placement(strategy);
                self.prev_placement = Some(strategy);
                effects.push(Effect::Sequence(sequence));
                effects.push(Effect::Sequence(InputSequence::new()));
            }
            Decision::Adjacent(table) => {
                let (premove, prefix) = self.engine.adjacency_premove(&table);
                self.engine.apply_placement(premove);
                let target = table[next];
                let sequence = self
                    .engine
                    .finish_adjacency_sequence(&prefix, premove, target);
                self.engine.apply_placement(target);
                self.prev_placement = Some(target);
                effects.push(Effect::Sequence(sequence));
            }
        }
        Ok(())
    }

    /// Speculates on the next placement before the piece after it is
    /// revealed, hiding decision latency behind the emulator's playback of
    /// the previous sequence.
    fn premove(&mut self, effects: &mut Vec<Effect>) -> Result<(), SelectError> {
        if self.engine.is_over() {
            self.phase = Phase::Draining(DrainReason::GameOver);
            self.pending = Pending::None;
            effects.push(Effect::Sequence(InputSequence::new()));
            return Ok(());
        }
        let (decision, reports) = self.selector.select(&self.engine)?;
        effects.extend(reports.into_iter().map(Effect::Report));
        match decision {
            Decision::Single(strategy) => {
                // The full sequence plus the empty terminator go out now;
                // the placement itself is applied once confirmed.
                self.pending = Pending::Direct(strategy);
                effects.push(Effect::Sequence(self.engine.sequence(strategy)));
                effects.push(Effect::Sequence(InputSequence::new()));
            }
            Decision::Adjacent(table) => {
                let (premove, prefix) = self.engine.adjacency_premove(&table);
                self.engine.apply_placement(premove);
                if self.engine.is_over() {
                    // The premove itself topped out; the prefix still goes
                    // out, the confirmation will be drained.
                    self.phase = Phase::Draining(DrainReason::GameOver);
                }
                effects.push(Effect::Sequence(prefix.clone()));
                self.pending = Pending::Adjacent {
                    premove,
                    prefix,
                    table,
                };
            }
        }
        Ok(())
    }

    fn confirm(
        &mut self,
        reported: Strategy,
        next: PieceKind,
        effects: &mut Vec<Effect>,
    ) -> Result<(), SelectError> {
        match self.phase {
            Phase::Draining(_) => {
                effects.push(Effect::Sequence(InputSequence::new()));
                return Ok(());
            }
            Phase::AwaitingReset | Phase::Active => {}
        }
        if self.phase == Phase::AwaitingReset || self.prev_placement != Some(reported) {
            effects.push(Effect::Mismatch {
                reported,
                expected: self.prev_placement,
            });
            effects.push(Effect::Sequence(InputSequence::new()));
            self.phase = Phase::Draining(DrainReason::ProtocolViolation);
            self.pending = Pending::None;
            return Ok(());
        }
        self.engine.set_next_piece(next);
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Direct(strategy) => {
                self.engine.apply_placement(strategy);
                self.prev_placement = Some(strategy);
            }
            Pending::Adjacent {
                premove,
                prefix,
                table,
            } => {
                let target = table[next];
                let sequence = self
                    .engine
                    .finish_adjacency_sequence(&prefix, premove, target);
                effects.push(Effect::Sequence(sequence.suffix_from(prefix.len())));
                self.engine.apply_placement(target);
                self.prev_placement = Some(target);
            }
            Pending::None => unreachable!("an active session always has a pending decision"),
        }
        self.premove(effects)
    }
}
