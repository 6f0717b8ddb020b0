use std::{array, fmt, io::Read, io::Write, sync::Mutex};

use tetribridge_protocol::{AdjacencyTable, PieceKind, Strategy, oracle::OracleResponse};

use crate::{
    engine::GameEngine,
    estimator::{PolicyEstimator, PolicyOutput},
    oracle::{OracleClient, OracleError},
};

/// The oracle is never consulted at or past this line count.
pub const ORACLE_LINE_LIMIT: u32 = 310;
/// Oracle responses below this search depth are rejected outright.
pub const MIN_TRUST_LEVEL: u8 = 6;
/// Past [`DEEP_TRUST_LINES`], this deeper search level is required instead.
pub const DEEP_TRUST_LEVEL: u8 = 12;
/// Line count from which only deep oracle searches are trusted.
pub const DEEP_TRUST_LINES: u32 = 230;

/// A chosen course of action for the current piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Decision {
    /// Commit to this placement now; the next piece's identity is
    /// irrelevant.
    Single(Strategy),
    /// The best placement depends on the next piece: one target per
    /// possible identity.
    Adjacent(AdjacencyTable),
}

/// Failure to produce a decision.
///
/// Every selector branch otherwise yields a usable decision: "no oracle"
/// and "oracle rejected" both fall back to the policy path, which cannot
/// fail.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SelectError {
    #[display("oracle query failed: {_0}")]
    Oracle(OracleError),
}

impl From<OracleError> for SelectError {
    fn from(error: OracleError) -> Self {
        SelectError::Oracle(error)
    }
}

/// Which source produced a decision, with its quality metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionSource {
    /// Exact lookahead, with the oracle's self-reported search depth.
    Oracle { level: u8 },
    /// Learned estimator, with the value estimate per next-piece identity.
    Policy { values: [f32; PieceKind::LEN] },
}

/// Operator-facing summary of one decision: the per-next-piece placements
/// and the source they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionReport {
    strategies: [Strategy; PieceKind::LEN],
    source: DecisionSource,
}

impl DecisionReport {
    fn from_oracle(response: &OracleResponse) -> Self {
        Self {
            strategies: response.strategies.as_array(),
            source: DecisionSource::Oracle {
                level: response.level,
            },
        }
    }

    fn from_policy_single(strategy: Strategy, value: f32) -> Self {
        Self {
            strategies: [strategy; PieceKind::LEN],
            source: DecisionSource::Policy {
                values: [value; PieceKind::LEN],
            },
        }
    }

    fn from_policy_table(
        strategies: [Strategy; PieceKind::LEN],
        values: [f32; PieceKind::LEN],
    ) -> Self {
        Self {
            strategies,
            source: DecisionSource::Policy { values },
        }
    }

    #[must_use]
    pub const fn source(&self) -> &DecisionSource {
        &self.source
    }

    #[must_use]
    pub const fn strategies(&self) -> &[Strategy; PieceKind::LEN] {
        &self.strategies
    }
}

impl fmt::Display for DecisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            DecisionSource::Oracle { .. } => writeln!(f, "Tablebase")?,
            DecisionSource::Policy { .. } => writeln!(f, "Neural net")?,
        }
        writeln!(f, "Placements")?;
        for (kind, strategy) in PieceKind::ALL.iter().zip(self.strategies) {
            write!(f, "{} {strategy}", kind.as_char())?;
            if let DecisionSource::Policy { values } = self.source {
                write!(f, " val {:6.3}", values[kind.as_u8() as usize])?;
            }
            writeln!(f)?;
        }
        if let DecisionSource::Oracle { level } = self.source {
            writeln!(f, "confidence {level}")?;
        }
        Ok(())
    }
}

/// Fuses policy-network output with oracle responses into a single chosen
/// strategy or adjacency table.
///
/// The estimator is shared read-only across sessions; the oracle client is
/// shared behind a mutex held for each full round trip (the oracle wire
/// protocol has no correlation id).
pub struct DecisionSelector<'a, S> {
    estimator: &'a dyn PolicyEstimator,
    oracle: Option<&'a Mutex<OracleClient<S>>>,
}

impl<'a, S: Read + Write> DecisionSelector<'a, S> {
    pub const fn new(
        estimator: &'a dyn PolicyEstimator,
        oracle: Option<&'a Mutex<OracleClient<S>>>,
    ) -> Self {
        Self { estimator, oracle }
    }

    /// Chooses a strategy for the engine's current state.
    ///
    /// The oracle, when configured and still in its trusted line range, is
    /// consulted first; a null recommendation or an insufficient search
    /// depth falls through to the policy path deterministically. One
    /// report per consulted source is returned for the operator.
    pub fn select<E: GameEngine>(
        &self,
        engine: &E,
    ) -> Result<(Decision, Vec<DecisionReport>), SelectError> {
        let mut reports = Vec::new();
        if engine.lines() < ORACLE_LINE_LIMIT
            && let Some(oracle) = self.oracle
        {
            let response = {
                // A panic mid-round-trip leaves the shared stream
                // desynchronized, so a poisoned lock means the connection
                // is unusable.
                let mut client = oracle.lock().map_err(|_| OracleError::ConnectionLost)?;
                client.query(&engine.board_bytes(), engine.current_piece(), engine.lines())?
            };
            reports.push(DecisionReport::from_oracle(&response));
            if let Some(decision) = oracle_decision(engine, &response) {
                return Ok((decision, reports));
            }
        }
        let (decision, report) = self.policy_decision(engine);
        reports.push(report);
        Ok((decision, reports))
    }

    fn policy_decision<E: GameEngine>(&self, engine: &E) -> (Decision, DecisionReport) {
        let output = self.estimator.evaluate(&engine.observation());
        let strategy = output.best_strategy();
        if engine.is_adjacency_free(strategy) {
            let report = DecisionReport::from_policy_single(strategy, output.value);
            return (Decision::Single(strategy), report);
        }
        let outputs = self
            .estimator
            .evaluate_batch(&engine.adjacency_observations(strategy));
        assert_eq!(
            outputs.len(),
            PieceKind::LEN,
            "estimator must return one output per adjacency state"
        );
        let strategies = array::from_fn(|i| outputs[i].best_strategy());
        let values = array::from_fn(|i| outputs[i].value);
        let table = AdjacencyTable::new(strategies);
        (
            Decision::Adjacent(table),
            DecisionReport::from_policy_table(strategies, values),
        )
    }
}

/// Applies the trust gate to an oracle response.
///
/// Trust decreases as the line count rises or the oracle's own search
/// depth drops: a null top entry or `level < 6` is never trusted, and from
/// 230 lines a depth below 12 is no longer enough.
fn oracle_decision<E: GameEngine>(engine: &E, response: &OracleResponse) -> Option<Decision> {
    let top = response.strategies.top();
    let rejected = top.is_null()
        || response.level < MIN_TRUST_LEVEL
        || (response.level < DEEP_TRUST_LEVEL && engine.lines() >= DEEP_TRUST_LINES);
    if rejected {
        return None;
    }
    if engine.is_adjacency_free(top) {
        Some(Decision::Single(top))
    } else {
        Some(Decision::Adjacent(response.strategies))
    }
}
