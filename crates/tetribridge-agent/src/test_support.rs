//! In-memory doubles for the consumed interfaces, shared by the selector
//! and session tests.

use std::{
    io::{self, Cursor, Read, Write},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use tetribridge_protocol::{
    AdjacencyTable, Buttons, InputSequence, PieceKind, Strategy,
    oracle::{OracleResponse, RESPONSE_LEN},
};

use crate::{
    engine::GameEngine,
    estimator::{Observation, PolicyEstimator, PolicyOutput},
    oracle::OracleClient,
};

/// Replica double with scripted answers and call recording.
#[derive(Debug)]
pub struct MockEngine {
    lines: u32,
    current: PieceKind,
    next: Option<PieceKind>,
    adjacency_free: bool,
    /// The engine reports game over once this many placements were applied.
    over_after: usize,
    applied: Vec<Strategy>,
    revealed: Vec<PieceKind>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            lines: 0,
            current: PieceKind::T,
            next: None,
            adjacency_free: true,
            over_after: usize::MAX,
            applied: Vec::new(),
            revealed: Vec::new(),
        }
    }

    pub fn adjacency_free(mut self, free: bool) -> Self {
        self.adjacency_free = free;
        self
    }

    pub fn with_lines(mut self, lines: u32) -> Self {
        self.lines = lines;
        self
    }

    pub fn over_after(mut self, placements: usize) -> Self {
        self.over_after = placements;
        self
    }

    pub fn applied(&self) -> usize {
        self.applied.len()
    }

    pub fn revealed(&self) -> Vec<PieceKind> {
        self.revealed.clone()
    }

    /// The fixed prefix every adjacency premove reports.
    pub fn premove_prefix(&self) -> InputSequence {
        vec![Buttons::A, Buttons::LEFT].into()
    }

    /// What `finish_adjacency_sequence` yields for `target`.
    pub fn finish_for(&self, target: Strategy) -> InputSequence {
        let mut sequence = self.premove_prefix();
        sequence.push(Buttons::from_bits(target.column));
        sequence.push(Buttons::NONE);
        sequence
    }
}

impl GameEngine for MockEngine {
    fn reset(&mut self, current: PieceKind, next: PieceKind) {
        self.current = current;
        self.next = Some(next);
        self.applied.clear();
        self.revealed.clear();
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
        self.revealed.push(piece);
    }

    fn is_over(&self) -> bool {
        self.applied.len() >= self.over_after
    }

    fn board_bytes(&self) -> Vec<u8> {
        vec![0xAB, 0xCD]
    }

    fn observation(&self) -> Observation {
        vec![self.lines as f32]
    }

    fn adjacency_observations(&self, _strategy: Strategy) -> Vec<Observation> {
        (0..PieceKind::LEN).map(|i| vec![i as f32]).collect()
    }

    fn is_adjacency_free(&self, _strategy: Strategy) -> bool {
        self.adjacency_free
    }

    fn sequence(&self, strategy: Strategy) -> InputSequence {
        let mut frames: Vec<Buttons> = Vec::new();
        frames.extend((0..strategy.rotation).map(|_| Buttons::A));
        frames.extend((0..strategy.column).map(|_| Buttons::RIGHT));
        frames.push(Buttons::NONE);
        frames.into()
    }

    fn adjacency_premove(&mut self, _table: &AdjacencyTable) -> (Strategy, InputSequence) {
        (Strategy::new(0, 1, 5), self.premove_prefix())
    }

    fn finish_adjacency_sequence(
        &self,
        prefix: &InputSequence,
        _premove: Strategy,
        target: Strategy,
    ) -> InputSequence {
        let mut sequence = prefix.clone();
        sequence.push(Buttons::from_bits(target.column));
        sequence.push(Buttons::NONE);
        sequence
    }

    fn apply_placement(&mut self, strategy: Strategy) {
        self.applied.push(strategy);
    }
}

/// Estimator double returning scripted arg-max placements.
pub struct ScriptedEstimator {
    best: Strategy,
    value: f32,
    batch_best: [Strategy; PieceKind::LEN],
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    batched_states: AtomicUsize,
}

impl ScriptedEstimator {
    /// Always prefers `best` with the given value estimate.
    pub fn single(best: Strategy, value: f32) -> Self {
        Self::with_table(best, [best; PieceKind::LEN])
            .valued(value)
    }

    /// Prefers `best` on single evaluations and `table[i]` for the i-th
    /// state of a batch.
    pub fn with_table(best: Strategy, table: [Strategy; PieceKind::LEN]) -> Self {
        Self {
            best,
            value: 0.0,
            batch_best: table,
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            batched_states: AtomicUsize::new(0),
        }
    }

    fn valued(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::Relaxed)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }

    pub fn batched_states(&self) -> usize {
        self.batched_states.load(Ordering::Relaxed)
    }

    fn output_for(&self, strategy: Strategy) -> PolicyOutput {
        let mut scores = vec![0.0; Strategy::ACTION_SPACE];
        scores[strategy.action()] = 1.0;
        PolicyOutput {
            scores,
            value: self.value,
        }
    }
}

impl PolicyEstimator for ScriptedEstimator {
    fn evaluate(&self, _observation: &[f32]) -> PolicyOutput {
        self.single_calls.fetch_add(1, Ordering::Relaxed);
        self.output_for(self.best)
    }

    fn evaluate_batch(&self, observations: &[Observation]) -> Vec<PolicyOutput> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        self.batched_states
            .fetch_add(observations.len(), Ordering::Relaxed);
        observations
            .iter()
            .enumerate()
            .map(|(i, _)| self.output_for(self.batch_best[i % PieceKind::LEN]))
            .collect()
    }
}

/// Bidirectional stream double for the oracle link: serves scripted
/// responses and counts queries.
#[derive(Debug)]
pub struct ScriptedOracleStream {
    responses: Cursor<Vec<u8>>,
    queries: usize,
}

impl ScriptedOracleStream {
    pub fn queries(&self) -> usize {
        self.queries
    }
}

impl Read for ScriptedOracleStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.responses.read(buf)
    }
}

impl Write for ScriptedOracleStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.queries += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An oracle response whose top entry is `top`; the remaining table slots
/// shift the row so every entry stays distinct.
pub fn oracle_response(top: Strategy, level: u8) -> OracleResponse {
    let strategies = std::array::from_fn(|i| {
        if i == 0 {
            top
        } else {
            Strategy::new(top.rotation, top.row.wrapping_add(i as u8), top.column)
        }
    });
    OracleResponse {
        strategies: AdjacencyTable::new(strategies),
        level,
    }
}

/// A shared oracle client scripted to serve the given responses in order.
pub fn oracle_fixture(
    responses: Vec<OracleResponse>,
) -> Mutex<OracleClient<ScriptedOracleStream>> {
    let mut bytes = Vec::with_capacity(responses.len() * RESPONSE_LEN);
    for response in responses {
        for strategy in response.strategies.iter() {
            bytes.extend_from_slice(&strategy.to_bytes());
        }
        bytes.push(response.level);
    }
    Mutex::new(OracleClient::new(ScriptedOracleStream {
        responses: Cursor::new(bytes),
        queries: 0,
    }))
}
