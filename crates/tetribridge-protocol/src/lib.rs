//! Wire-level data model and framing codec for the emulator bridge.
//!
//! Two independent binary protocols meet in this crate:
//!
//! - the **emulator link**, which carries game events inbound
//!   ([`EmulatorMessage`]) and controller-input sequences outbound
//!   ([`write_sequence`]), and
//! - the **oracle link**, a fixed-format query/response exchange with the
//!   external lookahead service ([`oracle`]).
//!
//! Everything here is pure: functions encode to and decode from bytes (or a
//! [`std::io::Read`]) and never decide retry, teardown, or threading policy.
//! Connection-level behavior lives in `tetribridge-agent`.
//!
//! # Emulator link framing
//!
//! | Tag    | Payload                                   | Meaning              |
//! |--------|-------------------------------------------|----------------------|
//! | `0xFF` | current piece id, next piece id           | new game starts      |
//! | `0xFD` | rotation, row, column, next piece id      | placement confirmed  |
//! | `0xFE` | length, `length` button-bitmask bytes     | input sequence (out) |
//!
//! An empty input sequence is still framed as `0xFE 0x01 0x00` — one
//! explicit no-op frame, never a zero-length payload.

pub use self::{emulator::*, input::*, piece::*, strategy::*};

pub mod emulator;
pub mod input;
pub mod oracle;
pub mod piece;
pub mod strategy;
