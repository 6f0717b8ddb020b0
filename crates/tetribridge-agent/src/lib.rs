//! Decision-selection engine and per-connection session protocol.
//!
//! This crate is the core of the bridge. For every physical piece placement
//! the emulator requests, it decides the target placement, synthesizes the
//! response frames, and drives the premove/confirm handshake:
//!
//! - [`DecisionSelector`] fuses the policy estimator's output with the
//!   optional lookahead oracle under explicit fallback rules.
//! - [`Session`] owns one connection's game-state replica and lifecycle:
//!   reset handling, premove issuance, confirmation verification, mismatch
//!   detection, and terminal draining.
//! - [`OracleClient`] performs the blocking query/response round trip over
//!   the shared oracle socket.
//!
//! The two external collaborators are consumed through traits and injected
//! into constructors: [`PolicyEstimator`] (the learned model, shared
//! read-only across sessions) and [`GameEngine`] (the board replica and
//! input-sequence synthesizer, exclusively owned per session). The session
//! itself performs no I/O; it turns decoded messages into [`Effect`] values
//! and leaves writing, printing, and threading to the caller.

pub use self::{engine::*, estimator::*, oracle::*, selector::*, session::*};

pub mod engine;
pub mod estimator;
pub mod oracle;
pub mod selector;
pub mod session;

#[cfg(test)]
mod test_support;
