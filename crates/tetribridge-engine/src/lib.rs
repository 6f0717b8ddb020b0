//! Reference game-state replica and input-sequence synthesizer.
//!
//! The bridge core consumes the board simulation as a trusted black box
//! behind the [`tetribridge_agent::GameEngine`] trait; this crate is the
//! concrete implementation the binary runs with. It tracks a 10x20 well,
//! applies confirmed placements with line clearing, packs the board for
//! oracle queries, extracts observation features for the estimator, and
//! synthesizes controller-input sequences.
//!
//! The kinematics are deliberately simpler than the emulator's exact frame
//! timing: taps alternate with neutral frames at a fixed rate and gravity
//! is approximated as one row per frame. The premove window
//! ([`ADJ_DELAY_FRAMES`]) gates which placements still admit a next-piece
//! dependent adjustment.

pub use self::{board::*, replica::*};

mod board;
mod replica;
mod shape;
