//! Framing for the emulator link.
//!
//! Inbound messages are read with [`read_message`], which blocks until the
//! exact byte count of the frame has arrived. Outbound input sequences are
//! framed by [`encode_sequence`] / [`write_sequence`].

use std::io::{self, Read, Write};

use crate::{input::InputSequence, piece::PieceKind, strategy::Strategy};

/// Tag byte announcing a new game (payload: current id, next id).
pub const TAG_NEW_GAME: u8 = 0xFF;
/// Tag byte confirming a placement (payload: strategy triple, next id).
pub const TAG_PLACEMENT: u8 = 0xFD;
/// Tag byte of an outbound input-sequence frame.
pub const TAG_SEQUENCE: u8 = 0xFE;

/// A decoded inbound emulator message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorMessage {
    /// A new game starts with the given first two piece identities.
    NewGame {
        current: PieceKind,
        next: PieceKind,
    },
    /// The emulator finished executing a placement and reveals the identity
    /// of the piece after the one now falling.
    Placement {
        placement: Strategy,
        next: PieceKind,
    },
}

/// Framing-layer failure on either link.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FrameError {
    /// The peer closed the connection (a zero-length read mid-frame).
    #[display("peer closed the connection")]
    PeerClosed,
    /// The leading byte of an inbound frame is not a known tag.
    #[display("unknown frame tag {_0:#04x}")]
    UnknownTag(#[error(not(source))] u8),
    /// A piece id byte outside `0..=6`.
    #[display("invalid piece id {_0}")]
    InvalidPiece(#[error(not(source))] u8),
    /// An outbound sequence does not fit the one-byte length field.
    #[display("input sequence of {_0} frames exceeds the wire limit")]
    SequenceTooLong(#[error(not(source))] usize),
    /// Any other transport failure.
    #[display("transport error: {_0}")]
    Io(io::Error),
}

fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::PeerClosed),
        Err(e) => Err(FrameError::Io(e)),
    }
}

fn piece(id: u8) -> Result<PieceKind, FrameError> {
    PieceKind::from_u8(id).ok_or(FrameError::InvalidPiece(id))
}

/// Reads one inbound frame, blocking until it is complete.
///
/// A connection closed before or inside a frame surfaces as
/// [`FrameError::PeerClosed`]; the caller treats that as normal
/// end-of-session control flow.
pub fn read_message<R: Read>(reader: &mut R) -> Result<EmulatorMessage, FrameError> {
    let mut tag = [0_u8; 1];
    read_exact_or_closed(reader, &mut tag)?;
    match tag[0] {
        TAG_NEW_GAME => {
            let mut payload = [0_u8; 2];
            read_exact_or_closed(reader, &mut payload)?;
            Ok(EmulatorMessage::NewGame {
                current: piece(payload[0])?,
                next: piece(payload[1])?,
            })
        }
        TAG_PLACEMENT => {
            let mut payload = [0_u8; 4];
            read_exact_or_closed(reader, &mut payload)?;
            Ok(EmulatorMessage::Placement {
                placement: Strategy::from_bytes([payload[0], payload[1], payload[2]]),
                next: piece(payload[3])?,
            })
        }
        tag => Err(FrameError::UnknownTag(tag)),
    }
}

/// Encodes an input sequence as an outbound frame.
///
/// The empty sequence is framed as `0xFE 0x01 0x00` — a single no-op input
/// frame. This is a framing rule of the emulator link, not an optimization:
/// a zero-length payload is never produced.
pub fn encode_sequence(sequence: &InputSequence) -> Result<Vec<u8>, FrameError> {
    if sequence.is_empty() {
        return Ok(vec![TAG_SEQUENCE, 0x01, 0x00]);
    }
    let len =
        u8::try_from(sequence.len()).map_err(|_| FrameError::SequenceTooLong(sequence.len()))?;
    let mut frame = Vec::with_capacity(2 + sequence.len());
    frame.push(TAG_SEQUENCE);
    frame.push(len);
    frame.extend(sequence.frames().iter().map(|buttons| buttons.bits()));
    Ok(frame)
}

/// Encodes and writes one sequence frame.
pub fn write_sequence<W: Write>(writer: &mut W, sequence: &InputSequence) -> Result<(), FrameError> {
    let frame = encode_sequence(sequence)?;
    writer.write_all(&frame).map_err(FrameError::Io)
}
