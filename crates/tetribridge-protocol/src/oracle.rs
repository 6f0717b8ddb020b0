//! Fixed-format codec for the oracle link.
//!
//! A query is `0x01` + board bytes (supplied verbatim by the game engine) +
//! current piece id + `lines % 256` + `lines / 256`. A response is exactly
//! [`RESPONSE_LEN`] bytes: seven 3-byte strategy triples followed by one
//! confidence/search-depth byte. Transport concerns (reading exactly that
//! many bytes, locking the shared connection) belong to the oracle client
//! in `tetribridge-agent`.

use arrayvec::ArrayVec;

use crate::{
    piece::PieceKind,
    strategy::{AdjacencyTable, Strategy},
};

/// Leading byte of every oracle query.
pub const QUERY_TAG: u8 = 0x01;
/// Exact byte length of every oracle response.
pub const RESPONSE_LEN: usize = 22;

/// A decoded oracle response: one recommendation per next-piece identity
/// plus the oracle's self-reported search depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleResponse {
    pub strategies: AdjacencyTable,
    pub level: u8,
}

/// Encodes a lookahead query for the given position.
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub fn encode_query(board: &[u8], current: PieceKind, lines: u32) -> Vec<u8> {
    let mut query = Vec::with_capacity(1 + board.len() + 3);
    query.push(QUERY_TAG);
    query.extend_from_slice(board);
    query.push(current.as_u8());
    query.push((lines % 256) as u8);
    query.push((lines / 256) as u8);
    query
}

/// Decodes a full 22-byte oracle response.
///
/// The strategy triples are taken verbatim; the oracle expresses "no valid
/// move" with the [`Strategy::NULL`] sentinel rather than an error.
#[must_use]
pub fn decode_response(bytes: &[u8; RESPONSE_LEN]) -> OracleResponse {
    let strategies: ArrayVec<Strategy, { PieceKind::LEN }> = bytes[..21]
        .chunks_exact(3)
        .map(|triple| Strategy::from_bytes([triple[0], triple[1], triple[2]]))
        .collect();
    OracleResponse {
        strategies: AdjacencyTable::new(
            strategies
                .into_inner()
                .unwrap_or_else(|_| unreachable!("21 bytes yield exactly 7 triples")),
        ),
        level: bytes[21],
    }
}
